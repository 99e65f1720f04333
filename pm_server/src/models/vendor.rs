//! Suppliers, their due diligence and blacklisting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::validate_email;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Blacklisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub code: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub category: String,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub contracts_active: i64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub status: VendorStatus,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub performance_history: Vec<Value>,
    #[serde(default = "pending")]
    pub due_diligence_status: String,
    #[serde(default)]
    pub due_diligence_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub blacklist_reason: Option<String>,
    #[serde(default = "full_compliance")]
    pub sla_compliance: f64,
    #[serde(default)]
    pub penalty_amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn pending() -> String {
    "pending".to_string()
}

fn full_compliance() -> f64 {
    100.0
}

impl Record for Vendor {
    const COLLECTION: CollectionName = CollectionName::Vendors;
    const LABEL: &'static str = "Vendor";
    const READ_ONLY: &'static [&'static str] =
        &["contracts_active", "total_value", "due_diligence_date"];

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        validate_email(&self.contact_email)?;
        if !(0..=100).contains(&self.rating) {
            return Err(TrackerError::Validation(
                "Vendor rating must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }

    fn check_transition(&mut self, previous: &Self, _now: DateTime<Utc>) -> TrackerResult<()> {
        if previous.status == VendorStatus::Blacklisted && self.status != VendorStatus::Blacklisted
        {
            return Err(TrackerError::Validation(format!(
                "Vendor {} is blacklisted and cannot be reinstated",
                previous.code
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVendor {
    pub name: String,
    pub code: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DueDiligence {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Blacklisting {
    pub reason: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Vendor {
    pub fn new(request: NewVendor, now: DateTime<Utc>) -> Self {
        Vendor {
            id: super::new_id(),
            name: request.name,
            code: request.code,
            contact_email: request.contact_email,
            contact_phone: request.contact_phone,
            category: request.category,
            rating: 0,
            contracts_active: 0,
            total_value: 0.0,
            status: VendorStatus::Active,
            risk_flags: Vec::new(),
            performance_history: Vec::new(),
            due_diligence_status: pending(),
            due_diligence_date: None,
            blacklist_reason: None,
            sla_compliance: full_compliance(),
            penalty_amount: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete_due_diligence(&mut self, diligence: &DueDiligence, now: DateTime<Utc>) {
        self.due_diligence_status = diligence
            .status
            .clone()
            .unwrap_or_else(|| "completed".into());
        self.due_diligence_date = Some(now);
    }

    pub fn blacklist(&mut self, blacklisting: &Blacklisting) {
        self.status = VendorStatus::Blacklisted;
        self.blacklist_reason = Some(blacklisting.reason.clone().unwrap_or_default());
        self.risk_flags = blacklisting.flags.clone();
    }
}
