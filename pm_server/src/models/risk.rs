//! Project risks scored on a 5x5 probability/impact matrix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Escalation, Level};
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Open,
    Mitigating,
    Monitoring,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "one")]
    pub probability: i64,
    #[serde(default = "one")]
    pub impact: i64,
    #[serde(default = "one")]
    pub risk_score: i64,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub mitigation_plan: Option<String>,
    #[serde(default = "not_started")]
    pub mitigation_status: String,
    #[serde(default)]
    pub mitigation_progress: i64,
    #[serde(default)]
    pub contingency_plan: Option<String>,
    #[serde(default)]
    pub contingency_triggered: bool,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: RiskStatus,
    #[serde(default)]
    pub escalation_level: i64,
    #[serde(default)]
    pub escalated_to: Option<String>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub related_dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn one() -> i64 {
    1
}

fn not_started() -> String {
    "not_started".to_string()
}

pub fn risk_level(score: i64) -> Level {
    match score {
        s if s >= 15 => Level::Critical,
        s if s >= 10 => Level::High,
        s if s >= 5 => Level::Medium,
        _ => Level::Low,
    }
}

fn check_scale(name: &str, value: i64) -> TrackerResult<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(TrackerError::Validation(format!(
            "{name} must be between 1 and 5, got {value}"
        )))
    }
}

impl Record for Risk {
    const COLLECTION: CollectionName = CollectionName::Risks;
    const LABEL: &'static str = "Risk";
    const READ_ONLY: &'static [&'static str] = &["risk_score", "level", "escalation_level"];

    fn id(&self) -> &str {
        &self.id
    }

    fn derive(&mut self) {
        self.risk_score = self.probability.saturating_mul(self.impact);
        self.level = risk_level(self.risk_score);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        check_scale("probability", self.probability)?;
        check_scale("impact", self.impact)?;
        if !(0..=100).contains(&self.mitigation_progress) {
            return Err(TrackerError::Validation(
                "mitigation_progress must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRisk {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "one")]
    pub probability: i64,
    #[serde(default = "one")]
    pub impact: i64,
    pub mitigation_plan: Option<String>,
    pub contingency_plan: Option<String>,
}

impl Risk {
    pub fn new(request: NewRisk, owner_id: &str, now: DateTime<Utc>) -> Self {
        Risk {
            id: super::new_id(),
            project_id: request.project_id,
            title: request.title,
            description: request.description,
            category: request.category,
            probability: request.probability,
            impact: request.impact,
            risk_score: 0,
            level: Level::Low,
            mitigation_plan: request.mitigation_plan,
            mitigation_status: not_started(),
            mitigation_progress: 0,
            contingency_plan: request.contingency_plan,
            contingency_triggered: false,
            owner_id: Some(owner_id.to_string()),
            status: RiskStatus::Open,
            escalation_level: 0,
            escalated_to: None,
            escalation_reason: None,
            related_dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Raise the escalation level by one. Status is left alone.
    pub fn escalate(&mut self, escalation: &Escalation) {
        self.escalation_level += 1;
        self.escalated_to = escalation.escalated_to.clone();
        self.escalation_reason = Some(escalation.reason.clone().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk(probability: i64, impact: i64) -> Risk {
        let mut risk = Risk::new(
            NewRisk {
                project_id: "proj-1".into(),
                title: "Vendor delay".into(),
                description: None,
                category: "Supply Chain".into(),
                probability,
                impact,
                mitigation_plan: None,
                contingency_plan: None,
            },
            "user-1",
            Utc::now(),
        );
        risk.derive();
        risk
    }

    #[test]
    fn score_and_level_follow_the_matrix() {
        let r = risk(4, 4);
        assert_eq!((r.risk_score, r.level), (16, Level::Critical));
        let r = risk(2, 2);
        assert_eq!((r.risk_score, r.level), (4, Level::Low));
        let r = risk(3, 4);
        assert_eq!((r.risk_score, r.level), (12, Level::High));
        let r = risk(1, 5);
        assert_eq!((r.risk_score, r.level), (5, Level::Medium));
    }

    #[test]
    fn out_of_scale_inputs_are_invalid() {
        assert!(risk(0, 3).validate().is_err());
        assert!(risk(3, 6).validate().is_err());
        assert!(risk(5, 5).validate().is_ok());
    }

    #[test]
    fn oversized_factors_saturate_and_fail_validation() {
        let r = risk(i64::MAX, 2);
        assert_eq!(r.risk_score, i64::MAX);
        assert!(r.validate().is_err());
    }

    #[test]
    fn escalation_increments_without_touching_status() {
        let mut r = risk(3, 3);
        r.status = RiskStatus::Mitigating;
        let escalation = Escalation {
            escalated_to: Some("user-admin".into()),
            reason: Some("slipping".into()),
        };
        r.escalate(&escalation);
        r.escalate(&escalation);
        assert_eq!(r.escalation_level, 2);
        assert_eq!(r.status, RiskStatus::Mitigating);
        assert_eq!(r.escalated_to.as_deref(), Some("user-admin"));
    }
}
