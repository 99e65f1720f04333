//! Projects: creation, phase gates, scenarios and schedule views.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TrackerResult;
use crate::models::project::{GateDecision, NewProject, Project};
use crate::models::task::TaskStatus;
use crate::store::{Database, Filter, UpdateOp};

/// Days each task contributes to the critical path estimate.
const DAYS_PER_TASK: usize = 5;

pub async fn list_projects(
    db: &Database,
    program_id: Option<&str>,
    status: Option<&str>,
) -> TrackerResult<Vec<Project>> {
    let filter = Filter::new()
        .eq_opt("program_id", program_id)
        .eq_opt("status", status);
    db.projects.list(&filter).await
}

pub async fn create_project(
    db: &Database,
    request: NewProject,
    manager_id: &str,
) -> TrackerResult<Project> {
    let project = db
        .projects
        .insert(Project::new(request, manager_id, Utc::now()))
        .await?;
    tracing::info!(
        project_id = %project.id,
        program_id = %project.program_id,
        clearance = %project.clearance_level,
        "Project created"
    );
    Ok(project)
}

/// Record a go/no-go decision on the current phase gate.
pub async fn decide_gate(
    db: &Database,
    project_id: &str,
    decision: GateDecision,
) -> TrackerResult<Project> {
    let project = db
        .projects
        .modify(project_id, |p| {
            p.decide_gate(decision.status());
            Ok(())
        })
        .await?;
    tracing::info!(project_id, decision = decision.status(), "Phase gate decided");
    Ok(project)
}

/// Append a what-if scenario. The scenario gets its own id and timestamp.
pub async fn add_scenario(
    db: &Database,
    project_id: &str,
    mut scenario: Map<String, Value>,
) -> TrackerResult<Project> {
    let now = Utc::now();
    scenario.insert("id".into(), Value::String(crate::models::new_id()));
    scenario.insert("created_at".into(), Value::String(now.to_rfc3339()));

    db.projects
        .update(
            project_id,
            &[
                UpdateOp::push("scenarios", Value::Object(scenario)),
                UpdateOp::set("updated_at", now.to_rfc3339()),
            ],
        )
        .await
}

#[derive(Debug, Serialize)]
pub struct GanttBar {
    pub id: String,
    pub name: String,
    pub wbs_code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: i64,
    pub dependencies: Vec<Value>,
    pub status: TaskStatus,
    pub is_critical: bool,
    pub assignees: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GanttView {
    pub project: Project,
    pub tasks: Vec<GanttBar>,
    pub milestones: Vec<Value>,
}

pub async fn gantt(db: &Database, project_id: &str) -> TrackerResult<GanttView> {
    let project = db.projects.get(project_id).await?;
    let tasks = db
        .tasks
        .list(&Filter::new().eq("project_id", project_id))
        .await?
        .into_iter()
        .map(|t| GanttBar {
            is_critical: t.is_critical_path,
            id: t.id,
            name: t.name,
            wbs_code: t.wbs_code,
            start: t.start_date,
            end: t.end_date,
            progress: t.progress,
            dependencies: t.dependencies,
            status: t.status,
            assignees: t.assigned_to,
        })
        .collect();

    Ok(GanttView {
        milestones: project.milestones.clone(),
        project,
        tasks,
    })
}

#[derive(Debug, Serialize)]
pub struct CriticalPath {
    pub critical_path: Vec<String>,
    pub total_duration_days: usize,
}

/// Tasks flagged critical or without float. No scheduling pass is run.
pub async fn critical_path(db: &Database, project_id: &str) -> TrackerResult<CriticalPath> {
    db.projects.get(project_id).await?;
    let tasks = db
        .tasks
        .list(&Filter::new().eq("project_id", project_id))
        .await?;

    Ok(CriticalPath {
        critical_path: tasks
            .iter()
            .filter(|t| t.is_critical())
            .map(|t| t.id.clone())
            .collect(),
        total_duration_days: tasks.len() * DAYS_PER_TASK,
    })
}
