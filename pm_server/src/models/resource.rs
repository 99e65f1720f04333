//! Personnel, equipment and facilities with capacity accounting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clearance::Clearance;
use super::Level;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

/// Utilization ceiling. Allocation may exceed capacity, the reported
/// percentage stops here.
pub const MAX_UTILIZATION: i64 = 150;

/// Ledger entries at or below this many hours count as released.
const HOURS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub clearance_level: Clearance,
    #[serde(default = "full_availability")]
    pub availability: i64,
    #[serde(default = "default_capacity")]
    pub capacity_hours: f64,
    #[serde(default)]
    pub allocated_hours: f64,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default)]
    pub allocated_projects: Vec<String>,
    /// Hours held per project.
    #[serde(default)]
    pub project_hours: BTreeMap<String, f64>,
    #[serde(default)]
    pub utilization: i64,
    #[serde(default)]
    pub burnout_risk: Level,
    #[serde(default)]
    pub leave_schedule: Vec<Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn full_availability() -> i64 {
    100
}

fn default_capacity() -> f64 {
    160.0
}

/// Percentage of capacity allocated, floored and capped at
/// [`MAX_UTILIZATION`]. Zero when there is no capacity.
pub fn utilization(allocated_hours: f64, capacity_hours: f64) -> i64 {
    if capacity_hours <= 0.0 {
        return 0;
    }
    let percent = (allocated_hours * 100.0 / capacity_hours).floor();
    (percent as i64).clamp(0, MAX_UTILIZATION)
}

pub fn burnout_risk(utilization: i64) -> Level {
    match utilization {
        u if u > 100 => Level::Critical,
        u if u > 85 => Level::High,
        u if u > 70 => Level::Medium,
        _ => Level::Low,
    }
}

impl Record for Resource {
    const COLLECTION: CollectionName = CollectionName::Resources;
    const LABEL: &'static str = "Resource";
    const READ_ONLY: &'static [&'static str] = &[
        "allocated_hours",
        "allocated_projects",
        "project_hours",
        "utilization",
        "burnout_risk",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn derive(&mut self) {
        self.utilization = utilization(self.allocated_hours, self.capacity_hours);
        self.burnout_risk = burnout_risk(self.utilization);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation("Resource name is required".into()));
        }
        if !self.capacity_hours.is_finite() || self.capacity_hours < 0.0 {
            return Err(TrackerError::Validation(
                "capacity_hours must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

fn check_hours(hours: f64) -> TrackerResult<()> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(TrackerError::Validation(
            "hours must be a non-negative number".into(),
        ))
    }
}

impl Resource {
    pub fn new(request: NewResource, now: DateTime<Utc>) -> Self {
        Resource {
            id: super::new_id(),
            name: request.name,
            resource_type: request.resource_type,
            department: request.department,
            unit: request.unit,
            skills: request.skills,
            certifications: request.certifications,
            clearance_level: request.clearance_level,
            availability: full_availability(),
            capacity_hours: request.capacity_hours,
            allocated_hours: 0.0,
            hourly_rate: request.hourly_rate,
            allocated_projects: Vec::new(),
            project_hours: BTreeMap::new(),
            utilization: 0,
            burnout_risk: Level::Low,
            leave_schedule: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Book `hours` against `project_id`.
    pub fn assign(&mut self, project_id: &str, hours: f64) -> TrackerResult<()> {
        check_hours(hours)?;
        if !self.allocated_projects.iter().any(|p| p == project_id) {
            self.allocated_projects.push(project_id.to_string());
        }
        self.allocated_hours += hours;
        *self.project_hours.entry(project_id.to_string()).or_insert(0.0) += hours;
        Ok(())
    }

    /// Release `hours` from `project_id`. The project stays in the
    /// allocation set while it still holds hours in the ledger.
    pub fn release(&mut self, project_id: &str, hours: f64) -> TrackerResult<()> {
        check_hours(hours)?;
        self.allocated_hours = (self.allocated_hours - hours).max(0.0);

        let exhausted = match self.project_hours.get_mut(project_id) {
            Some(held) => {
                *held -= hours;
                *held <= HOURS_EPSILON
            }
            None => true,
        };
        if exhausted {
            self.project_hours.remove(project_id);
            self.allocated_projects.retain(|p| p != project_id);
        }
        Ok(())
    }

    pub fn is_allocated_to(&self, project_id: &str) -> bool {
        self.allocated_projects.iter().any(|p| p == project_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub department: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub clearance_level: Clearance,
    #[serde(default = "default_capacity")]
    pub capacity_hours: f64,
    #[serde(default)]
    pub hourly_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(capacity: f64) -> Resource {
        Resource::new(
            NewResource {
                name: "Lt. Col. Sarah Khan".into(),
                resource_type: "human".into(),
                department: None,
                unit: None,
                skills: vec![],
                certifications: vec![],
                clearance_level: Clearance::Secret,
                capacity_hours: capacity,
                hourly_rate: 0.0,
            },
            Utc::now(),
        )
    }

    #[test]
    fn utilization_is_floored_and_capped() {
        assert_eq!(utilization(136.0, 160.0), 85);
        assert_eq!(utilization(1.0, 3.0), 33);
        assert_eq!(utilization(1_000.0, 160.0), MAX_UTILIZATION);
        assert_eq!(utilization(50.0, 0.0), 0);
    }

    #[test]
    fn burnout_thresholds_are_exclusive() {
        assert_eq!(burnout_risk(70), Level::Low);
        assert_eq!(burnout_risk(71), Level::Medium);
        assert_eq!(burnout_risk(85), Level::Medium);
        assert_eq!(burnout_risk(86), Level::High);
        assert_eq!(burnout_risk(100), Level::High);
        assert_eq!(burnout_risk(101), Level::Critical);
    }

    #[test]
    fn assign_then_release_restores_state() {
        let mut r = resource(160.0);
        r.assign("proj-1", 136.0).unwrap();
        r.derive();
        assert_eq!(r.utilization, 85);
        assert_eq!(r.burnout_risk, Level::Medium);

        r.release("proj-1", 136.0).unwrap();
        r.derive();
        assert_eq!(r.allocated_hours, 0.0);
        assert_eq!(r.utilization, 0);
        assert!(r.allocated_projects.is_empty());
        assert!(r.project_hours.is_empty());
    }

    #[test]
    fn partial_release_keeps_project_reference() {
        let mut r = resource(160.0);
        r.assign("proj-1", 40.0).unwrap();
        r.assign("proj-2", 20.0).unwrap();

        r.release("proj-1", 10.0).unwrap();
        assert!(r.is_allocated_to("proj-1"));
        assert_eq!(r.project_hours["proj-1"], 30.0);

        r.release("proj-1", 50.0).unwrap();
        assert!(!r.is_allocated_to("proj-1"));
        assert!(r.is_allocated_to("proj-2"));
        assert_eq!(r.allocated_hours, 0.0);
    }

    #[test]
    fn release_of_untracked_project_drops_reference() {
        let mut r = resource(160.0);
        r.allocated_projects.push("legacy".into());
        r.allocated_hours = 30.0;
        r.release("legacy", 10.0).unwrap();
        assert!(!r.is_allocated_to("legacy"));
        assert_eq!(r.allocated_hours, 20.0);
    }

    #[test]
    fn negative_hours_are_rejected() {
        let mut r = resource(160.0);
        assert!(r.assign("proj-1", -5.0).is_err());
        assert!(r.release("proj-1", f64::NAN).is_err());
        assert!(r.allocated_projects.is_empty());
    }
}
