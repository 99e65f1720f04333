//! Budget lines and fund releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Pending,
    Approved,
    Released,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: String,
    pub project_id: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    pub description: String,
    pub amount_planned: f64,
    #[serde(default)]
    pub amount_actual: f64,
    #[serde(default)]
    pub amount_forecast: f64,
    #[serde(default)]
    pub amount_released: f64,
    pub fiscal_year: String,
    pub quarter: String,
    #[serde(default)]
    pub status: BudgetStatus,
    #[serde(default)]
    pub approval_id: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_stage: Option<String>,
    #[serde(default)]
    pub variance: f64,
    #[serde(default)]
    pub variance_reason: Option<String>,
    #[serde(default)]
    pub is_overrun: bool,
    /// Set the first time the line overruns and never cleared.
    #[serde(default)]
    pub overrun_alert_sent: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for BudgetEntry {
    const COLLECTION: CollectionName = CollectionName::Budget;
    const LABEL: &'static str = "Budget entry";
    const READ_ONLY: &'static [&'static str] = &[
        "variance",
        "is_overrun",
        "overrun_alert_sent",
        "amount_released",
        "approved_by",
        "approved_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn derive(&mut self) {
        self.variance = self.amount_planned - self.amount_actual;
        self.is_overrun = self.amount_actual > self.amount_planned;
        if self.is_overrun {
            self.overrun_alert_sent = true;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        let amounts = [
            self.amount_planned,
            self.amount_actual,
            self.amount_forecast,
            self.amount_released,
        ];
        if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(TrackerError::Validation(
                "Budget amounts must be non-negative numbers".into(),
            ));
        }
        Ok(())
    }

    fn check_transition(&mut self, previous: &Self, _now: DateTime<Utc>) -> TrackerResult<()> {
        self.overrun_alert_sent |= previous.overrun_alert_sent;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudgetEntry {
    pub project_id: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: String,
    pub amount_planned: f64,
    pub fiscal_year: String,
    pub quarter: String,
    pub release_stage: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundRelease {
    #[serde(default)]
    pub amount: f64,
    pub stage: Option<String>,
}

impl BudgetEntry {
    pub fn new(request: NewBudgetEntry, now: DateTime<Utc>) -> Self {
        BudgetEntry {
            id: super::new_id(),
            project_id: request.project_id,
            category: request.category,
            sub_category: request.sub_category,
            description: request.description,
            amount_planned: request.amount_planned,
            amount_actual: 0.0,
            amount_forecast: 0.0,
            amount_released: 0.0,
            fiscal_year: request.fiscal_year,
            quarter: request.quarter,
            status: BudgetStatus::Pending,
            approval_id: None,
            approved_by: None,
            approved_at: None,
            release_stage: request.release_stage,
            variance: 0.0,
            variance_reason: None,
            is_overrun: false,
            overrun_alert_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn release(&mut self, release: &FundRelease, actor: &str, now: DateTime<Utc>) {
        self.amount_released = release.amount;
        self.status = BudgetStatus::Released;
        self.approved_by = Some(actor.to_string());
        self.approved_at = Some(now);
        self.release_stage = Some(release.stage.clone().unwrap_or_else(|| "initial".into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(planned: f64) -> BudgetEntry {
        BudgetEntry::new(
            NewBudgetEntry {
                project_id: "proj-1".into(),
                category: "CAPEX".into(),
                sub_category: None,
                description: "Radar units".into(),
                amount_planned: planned,
                fiscal_year: "2024".into(),
                quarter: "Q2".into(),
                release_stage: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn variance_and_overrun_follow_actuals() {
        let mut e = entry(1_000.0);
        e.amount_actual = 400.0;
        e.derive();
        assert_eq!(e.variance, 600.0);
        assert!(!e.is_overrun);
        assert!(!e.overrun_alert_sent);

        e.amount_actual = 1_200.0;
        e.derive();
        assert_eq!(e.variance, -200.0);
        assert!(e.is_overrun);
        assert!(e.overrun_alert_sent);
    }

    #[test]
    fn overrun_alert_latches() {
        let mut previous = entry(1_000.0);
        previous.amount_actual = 1_500.0;
        previous.derive();

        let mut next = previous.clone();
        next.amount_actual = 100.0;
        next.overrun_alert_sent = false;
        next.check_transition(&previous, Utc::now()).unwrap();
        next.derive();

        assert!(!next.is_overrun);
        assert!(next.overrun_alert_sent);
    }

    #[test]
    fn release_defaults_to_initial_stage() {
        let mut e = entry(1_000.0);
        e.release(&FundRelease { amount: 250.0, stage: None }, "user-1", Utc::now());
        assert_eq!(e.status, BudgetStatus::Released);
        assert_eq!(e.amount_released, 250.0);
        assert_eq!(e.release_stage.as_deref(), Some("initial"));
        assert_eq!(e.approved_by.as_deref(), Some("user-1"));
    }
}
