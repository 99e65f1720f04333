//! Vendor contracts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Active,
    Suspended,
    Completed,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub vendor_id: String,
    pub project_id: String,
    pub contract_number: String,
    pub title: String,
    pub value: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub milestones: Vec<Value>,
    #[serde(default)]
    pub deliverables: Vec<Value>,
    #[serde(default)]
    pub sla_terms: Vec<Value>,
    #[serde(default)]
    pub penalties: Vec<Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Contract {
    const COLLECTION: CollectionName = CollectionName::Contracts;
    const LABEL: &'static str = "Contract";
    // The vendor's running totals were booked from these at creation.
    const READ_ONLY: &'static [&'static str] = &["vendor_id", "value"];

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(TrackerError::Validation(
                "Contract value must be a non-negative number".into(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(TrackerError::Validation(
                "Contract end_date precedes start_date".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContract {
    pub vendor_id: String,
    pub project_id: String,
    pub contract_number: String,
    pub title: String,
    pub value: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Contract {
    pub fn new(request: NewContract, now: DateTime<Utc>) -> Self {
        Contract {
            id: super::new_id(),
            vendor_id: request.vendor_id,
            project_id: request.project_id,
            contract_number: request.contract_number,
            title: request.title,
            value: request.value,
            start_date: request.start_date,
            end_date: request.end_date,
            status: ContractStatus::Active,
            milestones: Vec::new(),
            deliverables: Vec::new(),
            sla_terms: Vec::new(),
            penalties: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
