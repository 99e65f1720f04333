//! Multi-level approval requests.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

pub const DEFAULT_TOTAL_LEVELS: i64 = 3;
pub const DEFAULT_SLA_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Escalated,
}

impl ApprovalStatus {
    /// Approved and rejected requests accept no further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Escalated => "escalated",
        }
    }
}

/// Kinds of record an approval can be raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Program,
    Project,
    Task,
    Resource,
    Budget,
    Risk,
    Vendor,
    Contract,
    Issue,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(value.as_str().unwrap_or_default())
    }
}

/// The record an approval is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "entity_type")]
    pub kind: EntityKind,
    #[serde(rename = "entity_id")]
    pub id: String,
}

/// One entry of the append-only approval chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChainEntry {
    Approve {
        level: i64,
        actor: String,
        actor_name: String,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        comments: String,
        signature: String,
    },
    Reject {
        level: i64,
        actor: String,
        actor_name: String,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        reason: String,
        signature: String,
    },
    Delegate {
        level: i64,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        reason: String,
    },
    EmergencyOverride {
        level: i64,
        actor: String,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    #[serde(flatten)]
    pub subject: EntityRef,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    pub requested_by: String,
    #[serde(default)]
    pub requested_by_name: Option<String>,
    #[serde(default = "first_level")]
    pub current_level: i64,
    #[serde(default = "default_levels")]
    pub total_levels: i64,
    #[serde(default)]
    pub approvers: Vec<Value>,
    #[serde(default)]
    pub approval_chain: Vec<ChainEntry>,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default = "default_sla")]
    pub sla_hours: i64,
    pub sla_deadline: DateTime<Utc>,
    #[serde(default)]
    pub is_escalated: bool,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub emergency_override_by: Option<String>,
    #[serde(default)]
    pub emergency_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn first_level() -> i64 {
    1
}

fn default_levels() -> i64 {
    DEFAULT_TOTAL_LEVELS
}

fn default_sla() -> i64 {
    DEFAULT_SLA_HOURS
}

impl Record for Approval {
    const COLLECTION: CollectionName = CollectionName::Approvals;
    const LABEL: &'static str = "Approval";
    const READ_ONLY: &'static [&'static str] = &[
        "current_level",
        "approval_chain",
        "status",
        "is_emergency",
        "emergency_override_by",
        "emergency_reason",
        "sla_deadline",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if self.total_levels < 1 {
            return Err(TrackerError::Validation(
                "total_levels must be at least 1".into(),
            ));
        }
        if !(1..=self.total_levels).contains(&self.current_level) {
            return Err(TrackerError::Validation(format!(
                "current_level {} outside 1..={}",
                self.current_level, self.total_levels
            )));
        }
        if self.sla_hours < 0 {
            return Err(TrackerError::Validation("sla_hours cannot be negative".into()));
        }
        Ok(())
    }

    fn check_transition(&mut self, previous: &Self, _now: DateTime<Utc>) -> TrackerResult<()> {
        if previous.status.is_terminal() && self.status != previous.status {
            return Err(TrackerError::Conflict(format!(
                "Approval is already {}",
                previous.status.as_str()
            )));
        }
        if self.current_level < previous.current_level {
            return Err(TrackerError::Validation(
                "Approval level cannot move backwards".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewApproval {
    pub entity_type: String,
    pub entity_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(default = "default_levels")]
    pub total_levels: i64,
    #[serde(default = "default_sla")]
    pub sla_hours: i64,
}

impl EntityRef {
    /// Parse a subject from its wire form.
    pub fn new(kind: &str, id: &str) -> TrackerResult<Self> {
        let kind: EntityKind = serde_json::from_value(Value::String(kind.to_string()))
            .map_err(|_| TrackerError::Validation(format!("Unknown entity type: {kind}")))?;
        if id.trim().is_empty() {
            return Err(TrackerError::Validation("entity_id is required".into()));
        }
        Ok(EntityRef {
            kind,
            id: id.to_string(),
        })
    }
}

impl Approval {
    pub fn new(
        request: NewApproval,
        requested_by: &str,
        requested_by_name: &str,
        now: DateTime<Utc>,
    ) -> TrackerResult<Self> {
        let subject = EntityRef::new(&request.entity_type, &request.entity_id)?;
        let sla_deadline = sla_deadline(now, request.sla_hours)?;
        Ok(Approval {
            id: super::new_id(),
            subject,
            title: request.title,
            description: request.description,
            amount: request.amount,
            requested_by: requested_by.to_string(),
            requested_by_name: Some(requested_by_name.to_string()),
            current_level: first_level(),
            total_levels: request.total_levels,
            approvers: Vec::new(),
            approval_chain: Vec::new(),
            status: ApprovalStatus::Pending,
            sla_hours: request.sla_hours,
            sla_deadline,
            is_escalated: false,
            is_emergency: false,
            emergency_override_by: None,
            emergency_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Still pending and past its SLA deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && self.sla_deadline < now
    }
}

fn sla_deadline(now: DateTime<Utc>, sla_hours: i64) -> TrackerResult<DateTime<Utc>> {
    let out_of_range =
        || TrackerError::Validation(format!("sla_hours out of range: {sla_hours}"));
    if sla_hours < 0 {
        return Err(out_of_range());
    }
    Duration::try_hours(sla_hours)
        .and_then(|sla| now.checked_add_signed(sla))
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: &str, levels: i64) -> NewApproval {
        NewApproval {
            entity_type: kind.into(),
            entity_id: "budget-002".into(),
            title: "Release funds".into(),
            description: None,
            amount: Some(450.0),
            total_levels: levels,
            sla_hours: 48,
        }
    }

    #[test]
    fn subject_is_stored_as_type_and_id() {
        let approval = Approval::new(request("budget", 3), "u1", "Maj. Singh", Utc::now()).unwrap();
        let json = serde_json::to_value(&approval).unwrap();
        assert_eq!(json["entity_type"], "budget");
        assert_eq!(json["entity_id"], "budget-002");
        assert_eq!(json["current_level"], 1);

        let back: Approval = serde_json::from_value(json).unwrap();
        assert_eq!(back.subject.kind, EntityKind::Budget);
    }

    #[test]
    fn unknown_subject_kinds_are_rejected() {
        let err = Approval::new(request("spaceship", 3), "u1", "A", Utc::now()).unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
    }

    #[test]
    fn level_bounds_are_enforced() {
        let approval = Approval::new(request("project", 0), "u1", "A", Utc::now()).unwrap();
        assert!(approval.validate().is_err());
        let mut approval = Approval::new(request("project", 2), "u1", "A", Utc::now()).unwrap();
        approval.current_level = 3;
        assert!(approval.validate().is_err());
    }

    #[test]
    fn deadline_is_creation_plus_sla() {
        let now = Utc::now();
        let approval = Approval::new(request("project", 2), "u1", "A", now).unwrap();
        assert_eq!(approval.sla_deadline, now + Duration::hours(48));
        assert!(!approval.is_overdue(now));
        assert!(approval.is_overdue(now + Duration::hours(49)));
    }

    #[test]
    fn unrepresentable_sla_is_a_validation_error() {
        let now = Utc::now();
        for hours in [-1, i64::MAX, i64::MAX / 3_600] {
            let mut req = request("project", 2);
            req.sla_hours = hours;
            let err = Approval::new(req, "u1", "A", now).unwrap_err();
            assert!(matches!(err, TrackerError::Validation(_)), "sla_hours {hours}");
        }
    }

    #[test]
    fn chain_entries_are_tagged_by_action() {
        let entry = ChainEntry::Delegate {
            level: 1,
            from: "u1".into(),
            to: "u2".into(),
            timestamp: Utc::now(),
            reason: "leave".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "delegate");
        assert_eq!(json["to"], json!("u2"));
    }
}
