//! Work breakdown structure tasks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clearance::Clearance;
use super::Level;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    pub wbs_code: String,
    #[serde(default = "first_level")]
    pub wbs_level: usize,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "medium")]
    pub priority: Level,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_end: Option<NaiveDate>,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub assigned_unit: Option<String>,
    #[serde(default)]
    pub assigned_vendor: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub clearance_level: Clearance,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub acceptance_status: Option<String>,
    #[serde(default)]
    pub accepted_by: Option<String>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closure_notes: Option<String>,
    #[serde(default)]
    pub is_critical_path: bool,
    #[serde(default)]
    pub float_days: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn first_level() -> usize {
    1
}

fn medium() -> Level {
    Level::Medium
}

/// Dot-separated segments, none of them blank.
fn is_wbs_code(code: &str) -> bool {
    code.split('.').all(|segment| !segment.trim().is_empty())
}

/// Depth of a WBS code: "1.2.3" is level 3.
pub fn wbs_level(wbs_code: &str) -> usize {
    wbs_code.split('.').count()
}

impl Record for Task {
    const COLLECTION: CollectionName = CollectionName::Tasks;
    const LABEL: &'static str = "Task";
    const READ_ONLY: &'static [&'static str] = &["wbs_level", "accepted_by", "accepted_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn derive(&mut self) {
        self.wbs_level = wbs_level(&self.wbs_code);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if !is_wbs_code(&self.wbs_code) {
            return Err(TrackerError::Validation(format!(
                "Invalid WBS code: {:?}",
                self.wbs_code
            )));
        }
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation("Task name is required".into()));
        }
        if !(0..=100).contains(&self.progress) {
            return Err(TrackerError::Validation(
                "Task progress must be between 0 and 100".into(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(TrackerError::Validation(
                "Task end_date precedes start_date".into(),
            ));
        }
        if self.estimated_hours < 0.0 || self.actual_hours < 0.0 {
            return Err(TrackerError::Validation("Task hours cannot be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub project_id: String,
    pub parent_task_id: Option<String>,
    pub wbs_code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "medium")]
    pub priority: Level,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub assigned_unit: Option<String>,
    pub assigned_vendor: Option<String>,
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub clearance_level: Clearance,
}

impl Task {
    pub fn new(request: NewTask, now: DateTime<Utc>) -> Self {
        Task {
            id: super::new_id(),
            project_id: request.project_id,
            parent_task_id: request.parent_task_id,
            wbs_level: wbs_level(&request.wbs_code),
            wbs_code: request.wbs_code,
            name: request.name,
            description: request.description,
            status: TaskStatus::Todo,
            priority: request.priority,
            start_date: request.start_date,
            end_date: request.end_date,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            estimated_hours: request.estimated_hours,
            actual_hours: 0.0,
            progress: 0,
            assigned_to: request.assigned_to,
            assigned_unit: request.assigned_unit,
            assigned_vendor: request.assigned_vendor,
            dependencies: Vec::new(),
            tags: Vec::new(),
            classification: None,
            clearance_level: request.clearance_level,
            acceptance_criteria: request.acceptance_criteria,
            acceptance_status: None,
            accepted_by: None,
            accepted_at: None,
            closure_notes: None,
            is_critical_path: false,
            float_days: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an acceptance review. Only an `accepted` outcome completes the
    /// task; anything else sends it back to review.
    pub fn accept(&mut self, review: &AcceptanceReview, actor: &str, now: DateTime<Utc>) {
        let outcome = review.status();
        self.status = if outcome == ACCEPTED {
            TaskStatus::Completed
        } else {
            TaskStatus::Review
        };
        self.acceptance_status = Some(outcome.to_string());
        self.accepted_by = Some(actor.to_string());
        self.accepted_at = Some(now);
        self.closure_notes = Some(review.notes.clone().unwrap_or_default());
    }

    /// Whether the task sits on the critical path of its project.
    pub fn is_critical(&self) -> bool {
        self.is_critical_path || self.float_days == 0.0
    }
}

const ACCEPTED: &str = "accepted";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptanceReview {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl AcceptanceReview {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or(ACCEPTED)
    }
}
