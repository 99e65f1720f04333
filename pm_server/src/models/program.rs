//! Programs: the portfolio level above projects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProjectStatus;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub charter: Option<String>,
    #[serde(default)]
    pub mandate: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub budget_total: f64,
    #[serde(default)]
    pub budget_allocated: f64,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "full_health")]
    pub health_score: i64,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub success_kpis: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn full_health() -> i64 {
    100
}

impl Record for Program {
    const COLLECTION: CollectionName = CollectionName::Programs;
    const LABEL: &'static str = "Program";

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(TrackerError::Validation(
                "Program name and code are required".into(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(TrackerError::Validation(
                "Program end_date precedes start_date".into(),
            ));
        }
        if self.budget_total < 0.0 || self.budget_allocated < 0.0 {
            return Err(TrackerError::Validation(
                "Program budgets cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProgram {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub charter: Option<String>,
    pub mandate: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub budget_total: f64,
}

impl Program {
    pub fn new(request: NewProgram, owner_id: &str, now: DateTime<Utc>) -> Self {
        Program {
            id: super::new_id(),
            name: request.name,
            code: request.code,
            description: request.description,
            objectives: request.objectives,
            charter: request.charter,
            mandate: request.mandate,
            start_date: request.start_date,
            end_date: request.end_date,
            budget_total: request.budget_total,
            budget_allocated: 0.0,
            status: ProjectStatus::Planning,
            health_score: full_health(),
            owner_id: Some(owner_id.to_string()),
            success_kpis: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewProgram {
        NewProgram {
            name: "Integrated Air Defence".into(),
            code: "IAD-2024".into(),
            description: None,
            objectives: vec!["Coverage".into()],
            charter: None,
            mandate: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            budget_total: 1_000.0,
        }
    }

    #[test]
    fn new_program_starts_in_planning_owned_by_caller() {
        let program = Program::new(request(), "user-1", Utc::now());
        assert_eq!(program.status, ProjectStatus::Planning);
        assert_eq!(program.owner_id.as_deref(), Some("user-1"));
        assert_eq!(program.health_score, 100);
        assert!(program.validate().is_ok());
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut req = request();
        std::mem::swap(&mut req.start_date, &mut req.end_date);
        let program = Program::new(req, "user-1", Utc::now());
        assert!(matches!(program.validate(), Err(TrackerError::Validation(_))));
    }
}
