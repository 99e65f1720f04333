//! Programs, projects and tasks.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{deleted, AppState, Patch};
use crate::auth::CurrentUser;
use crate::error::TrackerResult;
use crate::models::program::{NewProgram, Program};
use crate::models::project::{GateDecision, NewProject, Project};
use crate::models::task::{AcceptanceReview, NewTask, Task};
use crate::services::project_service::{self, CriticalPath, GanttView};
use crate::services::{program_service, task_service};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/programs", get(list_programs).post(create_program))
        .route(
            "/programs/{program_id}",
            get(get_program).put(update_program).delete(delete_program),
        )
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{project_id}/go-no-go", post(decide_gate))
        .route("/projects/{project_id}/scenarios", post(add_scenario))
        .route("/projects/{project_id}/gantt", get(gantt))
        .route("/projects/{project_id}/critical-path", get(critical_path))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/accept", post(accept_task))
}

// ── Programs ──

#[derive(Debug, Deserialize)]
pub struct ProgramQuery {
    pub status: Option<String>,
}

async fn list_programs(
    State(state): State<AppState>,
    Query(query): Query<ProgramQuery>,
) -> TrackerResult<Json<Vec<Program>>> {
    program_service::list_programs(&state.db, query.status.as_deref())
        .await
        .map(Json)
}

async fn get_program(
    State(state): State<AppState>,
    Path(program_id): Path<String>,
) -> TrackerResult<Json<Program>> {
    state.db.programs.get(&program_id).await.map(Json)
}

async fn create_program(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewProgram>,
) -> TrackerResult<Json<Program>> {
    program_service::create_program(&state.db, request, user.id())
        .await
        .map(Json)
}

async fn update_program(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(program_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Program>> {
    state.db.programs.patch(&program_id, patch).await.map(Json)
}

async fn delete_program(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(program_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.programs.delete(&program_id).await?;
    Ok(deleted("Program", &program_id))
}

// ── Projects ──

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub program_id: Option<String>,
    pub status: Option<String>,
}

async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> TrackerResult<Json<Vec<Project>>> {
    project_service::list_projects(
        &state.db,
        query.program_id.as_deref(),
        query.status.as_deref(),
    )
    .await
    .map(Json)
}

async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> TrackerResult<Json<Project>> {
    state.db.projects.get(&project_id).await.map(Json)
}

async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewProject>,
) -> TrackerResult<Json<Project>> {
    project_service::create_project(&state.db, request, user.id())
        .await
        .map(Json)
}

async fn update_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Project>> {
    state.db.projects.patch(&project_id, patch).await.map(Json)
}

async fn delete_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.projects.delete(&project_id).await?;
    Ok(deleted("Project", &project_id))
}

async fn decide_gate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<String>,
    Json(decision): Json<GateDecision>,
) -> TrackerResult<Json<Project>> {
    project_service::decide_gate(&state.db, &project_id, decision)
        .await
        .map(Json)
}

async fn add_scenario(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<String>,
    Json(scenario): Json<Map<String, Value>>,
) -> TrackerResult<Json<Project>> {
    project_service::add_scenario(&state.db, &project_id, scenario)
        .await
        .map(Json)
}

async fn gantt(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> TrackerResult<Json<GanttView>> {
    project_service::gantt(&state.db, &project_id).await.map(Json)
}

async fn critical_path(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> TrackerResult<Json<CriticalPath>> {
    project_service::critical_path(&state.db, &project_id)
        .await
        .map(Json)
}

// ── Tasks ──

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<String>,
    pub status: Option<String>,
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> TrackerResult<Json<Vec<Task>>> {
    task_service::list_tasks(&state.db, query.project_id.as_deref(), query.status.as_deref())
        .await
        .map(Json)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> TrackerResult<Json<Task>> {
    state.db.tasks.get(&task_id).await.map(Json)
}

async fn create_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<NewTask>,
) -> TrackerResult<Json<Task>> {
    task_service::create_task(&state.db, request).await.map(Json)
}

async fn update_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Task>> {
    state.db.tasks.patch(&task_id, patch).await.map(Json)
}

async fn delete_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.tasks.delete(&task_id).await?;
    Ok(deleted("Task", &task_id))
}

async fn accept_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(review): Json<AcceptanceReview>,
) -> TrackerResult<Json<Task>> {
    task_service::accept_task(&state.db, &task_id, review, user.id())
        .await
        .map(Json)
}
