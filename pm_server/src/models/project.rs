//! Projects and their derived health indicators.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clearance::Clearance;
use super::program::full_health;
use super::ProjectStatus;
use crate::error::{TrackerError, TrackerResult};
use crate::store::{CollectionName, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectTemplate {
    #[serde(rename = "R&D")]
    ResearchAndDevelopment,
    #[serde(rename = "Infrastructure")]
    Infrastructure,
    #[serde(rename = "Weapon Systems")]
    WeaponSystems,
    #[default]
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "Logistics")]
    Logistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub program_id: String,
    #[serde(default)]
    pub parent_project_id: Option<String>,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template: ProjectTemplate,
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
    pub budget_allocated: f64,
    #[serde(default)]
    pub budget_spent: f64,
    #[serde(default)]
    pub budget_forecast: f64,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "full_health")]
    pub health_score: i64,
    #[serde(default)]
    pub progress: i64,
    #[serde(default = "first_phase")]
    pub phase: String,
    #[serde(default = "pending")]
    pub phase_gate_status: String,
    #[serde(default)]
    pub milestones: Vec<Value>,
    #[serde(default)]
    pub dependencies: Vec<Value>,
    #[serde(default)]
    pub kpis: Vec<Value>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub clearance_level: Clearance,
    #[serde(default)]
    pub buffer_days: i64,
    #[serde(default)]
    pub contingency_budget: f64,
    #[serde(default)]
    pub schedule_variance: f64,
    #[serde(default)]
    pub cost_variance: Option<f64>,
    #[serde(default)]
    pub critical_path: Vec<String>,
    #[serde(default)]
    pub go_no_go_status: Option<String>,
    #[serde(default)]
    pub scenarios: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn first_phase() -> String {
    "Phase 1".to_string()
}

fn pending() -> String {
    "pending".to_string()
}

/// Blend of budget adherence and progress, 0..=100.
///
/// Budget health loses one point per percent of overspend; schedule health
/// is progress plus a 20 point allowance, capped at 100.
pub fn health_score(budget_allocated: f64, budget_spent: f64, progress: i64) -> i64 {
    let budget_health = if budget_allocated > 0.0 {
        let overspend = (budget_spent / budget_allocated - 1.0) * 100.0;
        100.0 - overspend.clamp(0.0, 100.0)
    } else {
        100.0
    };
    let schedule_health = (progress + 20).min(100) as f64;
    ((budget_health + schedule_health) / 2.0).floor() as i64
}

/// Percentage of the allocation left unspent. Undefined without an allocation.
pub fn cost_variance(budget_allocated: f64, budget_spent: f64) -> Option<f64> {
    (budget_allocated > 0.0)
        .then(|| (budget_allocated - budget_spent) / budget_allocated * 100.0)
}

impl Record for Project {
    const COLLECTION: CollectionName = CollectionName::Projects;
    const LABEL: &'static str = "Project";
    const READ_ONLY: &'static [&'static str] = &["health_score", "cost_variance", "scenarios"];

    fn id(&self) -> &str {
        &self.id
    }

    fn derive(&mut self) {
        self.health_score = health_score(self.budget_allocated, self.budget_spent, self.progress);
        self.cost_variance = cost_variance(self.budget_allocated, self.budget_spent);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> TrackerResult<()> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(TrackerError::Validation(
                "Project name and code are required".into(),
            ));
        }
        if !(0..=100).contains(&self.progress) {
            return Err(TrackerError::Validation(
                "Project progress must be between 0 and 100".into(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(TrackerError::Validation(
                "Project end_date precedes start_date".into(),
            ));
        }
        if self.budget_allocated < 0.0 || self.budget_spent < 0.0 {
            return Err(TrackerError::Validation(
                "Project budgets cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub program_id: String,
    pub parent_project_id: Option<String>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(default)]
    pub template: ProjectTemplate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub budget_allocated: f64,
    #[serde(default)]
    pub buffer_days: i64,
    #[serde(default)]
    pub contingency_budget: f64,
    #[serde(default)]
    pub clearance_level: Clearance,
}

impl Project {
    pub fn new(request: NewProject, manager_id: &str, now: DateTime<Utc>) -> Self {
        Project {
            id: super::new_id(),
            program_id: request.program_id,
            parent_project_id: request.parent_project_id,
            name: request.name,
            code: request.code,
            description: request.description,
            template: request.template,
            start_date: request.start_date,
            end_date: request.end_date,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            budget_allocated: request.budget_allocated,
            budget_spent: 0.0,
            budget_forecast: 0.0,
            status: ProjectStatus::Planning,
            health_score: full_health(),
            progress: 0,
            phase: first_phase(),
            phase_gate_status: pending(),
            milestones: Vec::new(),
            dependencies: Vec::new(),
            kpis: Vec::new(),
            manager_id: Some(manager_id.to_string()),
            clearance_level: request.clearance_level,
            buffer_days: request.buffer_days,
            contingency_budget: request.contingency_budget,
            schedule_variance: 0.0,
            cost_variance: None,
            critical_path: Vec::new(),
            go_no_go_status: None,
            scenarios: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a phase-gate decision.
    pub fn decide_gate(&mut self, decision: &str) {
        self.go_no_go_status = Some(decision.to_string());
        self.phase_gate_status = decision.to_string();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateDecision {
    pub status: Option<String>,
}

impl GateDecision {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("pending")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_blends_budget_and_schedule() {
        // On budget, 40% done: (100 + 60) / 2
        assert_eq!(health_score(1_000.0, 500.0, 40), 80);
        // 50% overspent, complete: (50 + 100) / 2
        assert_eq!(health_score(1_000.0, 1_500.0, 100), 75);
        // Overspend beyond 100% bottoms out budget health at zero.
        assert_eq!(health_score(1_000.0, 5_000.0, 0), 10);
        // No allocation means budget health is not penalised.
        assert_eq!(health_score(0.0, 200.0, 90), 100);
    }

    #[test]
    fn cost_variance_is_unset_without_allocation() {
        assert_eq!(cost_variance(0.0, 100.0), None);
        assert_eq!(cost_variance(200.0, 150.0), Some(25.0));
        assert_eq!(cost_variance(100.0, 150.0), Some(-50.0));
    }

    #[test]
    fn template_uses_display_names_on_the_wire() {
        let json = serde_json::to_value(ProjectTemplate::WeaponSystems).unwrap();
        assert_eq!(json, "Weapon Systems");
        let parsed: ProjectTemplate = serde_json::from_value("R&D".into()).unwrap();
        assert_eq!(parsed, ProjectTemplate::ResearchAndDevelopment);
    }

    #[test]
    fn derive_refreshes_health_and_variance() {
        let request = NewProject {
            program_id: "prog-1".into(),
            parent_project_id: None,
            name: "Radar".into(),
            code: "RAD".into(),
            description: None,
            template: ProjectTemplate::WeaponSystems,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            budget_allocated: 1_000.0,
            buffer_days: 0,
            contingency_budget: 0.0,
            clearance_level: Clearance::Secret,
        };
        let mut project = Project::new(request, "mgr", Utc::now());
        project.progress = 60;
        project.budget_spent = 250.0;
        project.derive();

        assert_eq!(project.health_score, 90);
        assert_eq!(project.cost_variance, Some(75.0));
    }

    #[test]
    fn progress_outside_percent_range_is_invalid() {
        let json = serde_json::json!({
            "id": "p", "program_id": "g", "name": "n", "code": "c",
            "start_date": "2024-01-01", "end_date": "2024-02-01",
            "progress": 120,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        });
        let project: Project = serde_json::from_value(json).unwrap();
        assert!(matches!(project.validate(), Err(TrackerError::Validation(_))));
    }
}
