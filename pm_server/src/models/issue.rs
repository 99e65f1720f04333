//! Project issues.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Escalation, Level};
use crate::error::TrackerResult;
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "medium")]
    pub severity: Level,
    #[serde(default)]
    pub status: IssueStatus,
    pub reported_by: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub escalation_level: i64,
    #[serde(default)]
    pub escalated_to: Option<String>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn medium() -> Level {
    Level::Medium
}

impl Record for Issue {
    const COLLECTION: CollectionName = CollectionName::Issues;
    const LABEL: &'static str = "Issue";
    const READ_ONLY: &'static [&'static str] = &["resolved_at", "escalation_level", "reported_by"];

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn check_transition(&mut self, previous: &Self, now: DateTime<Utc>) -> TrackerResult<()> {
        if self.status == IssueStatus::Resolved && previous.status != IssueStatus::Resolved {
            self.resolved_at = Some(now);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIssue {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "medium")]
    pub severity: Level,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl Issue {
    pub fn new(request: NewIssue, reported_by: &str, now: DateTime<Utc>) -> Self {
        Issue {
            id: super::new_id(),
            project_id: request.project_id,
            title: request.title,
            description: request.description,
            category: request.category,
            severity: request.severity,
            status: IssueStatus::Open,
            reported_by: reported_by.to_string(),
            assigned_to: request.assigned_to,
            resolution: None,
            escalation_level: 0,
            escalated_to: None,
            escalation_reason: None,
            due_date: request.due_date,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same semantics as risk escalation.
    pub fn escalate(&mut self, escalation: &Escalation) {
        self.escalation_level += 1;
        self.escalated_to = escalation.escalated_to.clone();
        self.escalation_reason = Some(escalation.reason.clone().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> Issue {
        Issue::new(
            NewIssue {
                project_id: "proj-1".into(),
                title: "Latency".into(),
                description: None,
                category: "Technical".into(),
                severity: Level::High,
                assigned_to: None,
                due_date: None,
            },
            "user-1",
            Utc::now(),
        )
    }

    #[test]
    fn resolved_at_is_stamped_on_entering_resolved_only() {
        let previous = issue();
        let mut next = previous.clone();
        next.status = IssueStatus::Resolved;
        let first = Utc::now();
        next.check_transition(&previous, first).unwrap();
        assert_eq!(next.resolved_at, Some(first));

        // Already resolved: a later edit keeps the original stamp.
        let previous = next.clone();
        let mut again = previous.clone();
        again.resolution = Some("rerouted".into());
        again
            .check_transition(&previous, first + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(again.resolved_at, Some(first));
    }

    #[test]
    fn other_transitions_leave_resolved_at_unset() {
        let previous = issue();
        let mut next = previous.clone();
        next.status = IssueStatus::InProgress;
        next.check_transition(&previous, Utc::now()).unwrap();
        assert!(next.resolved_at.is_none());
    }
}
