//! Tracker data models, one record type per collection.

pub mod approval;
pub mod budget;
pub mod clearance;
pub mod contract;
pub mod issue;
pub mod program;
pub mod project;
pub mod resource;
pub mod risk;
pub mod task;
pub mod user;
pub mod vendor;

use serde::{Deserialize, Serialize};

/// Four-step severity scale shared by risk levels, burnout tiers, task
/// priorities and issue severities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Low, Level::Medium, Level::High, Level::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
            Level::Critical => "critical",
        }
    }
}

/// Lifecycle shared by programs and projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

/// New record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Escalation request shared by risks and issues.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Escalation {
    pub escalated_to: Option<String>,
    pub reason: Option<String>,
}
