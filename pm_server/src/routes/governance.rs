//! Risks, issues and approvals.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use super::{deleted, AppState, Patch};
use crate::auth::CurrentUser;
use crate::error::TrackerResult;
use crate::models::approval::{Approval, NewApproval};
use crate::models::issue::{Issue, NewIssue};
use crate::models::risk::{NewRisk, Risk};
use crate::models::Escalation;
use crate::services::approval_service::{
    self, ApproveRequest, DelegateRequest, OverrideRequest, RejectRequest,
};
use crate::services::{issue_service, risk_service};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/risks", get(list_risks).post(create_risk))
        .route(
            "/risks/{risk_id}",
            get(get_risk).put(update_risk).delete(delete_risk),
        )
        .route("/risks/{risk_id}/escalate", post(escalate_risk))
        .route("/issues", get(list_issues).post(create_issue))
        .route(
            "/issues/{issue_id}",
            get(get_issue).put(update_issue).delete(delete_issue),
        )
        .route("/issues/{issue_id}/escalate", post(escalate_issue))
        .route("/approvals", get(list_approvals).post(create_approval))
        .route("/approvals/overdue", get(overdue_approvals))
        .route("/approvals/{approval_id}", get(get_approval))
        .route("/approvals/{approval_id}/approve", post(approve))
        .route("/approvals/{approval_id}/reject", post(reject))
        .route("/approvals/{approval_id}/delegate", post(delegate))
        .route(
            "/approvals/{approval_id}/emergency-override",
            post(emergency_override),
        )
}

// ── Risks ──

#[derive(Debug, Deserialize)]
pub struct RiskQuery {
    pub project_id: Option<String>,
    pub level: Option<String>,
}

async fn list_risks(
    State(state): State<AppState>,
    Query(query): Query<RiskQuery>,
) -> TrackerResult<Json<Vec<Risk>>> {
    risk_service::list_risks(&state.db, query.project_id.as_deref(), query.level.as_deref())
        .await
        .map(Json)
}

async fn get_risk(
    State(state): State<AppState>,
    Path(risk_id): Path<String>,
) -> TrackerResult<Json<Risk>> {
    state.db.risks.get(&risk_id).await.map(Json)
}

async fn create_risk(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewRisk>,
) -> TrackerResult<Json<Risk>> {
    risk_service::create_risk(&state.db, request, user.id())
        .await
        .map(Json)
}

async fn update_risk(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(risk_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Risk>> {
    state.db.risks.patch(&risk_id, patch).await.map(Json)
}

async fn delete_risk(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(risk_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.risks.delete(&risk_id).await?;
    Ok(deleted("Risk", &risk_id))
}

async fn escalate_risk(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(risk_id): Path<String>,
    Json(escalation): Json<Escalation>,
) -> TrackerResult<Json<Risk>> {
    risk_service::escalate_risk(&state.db, &risk_id, escalation)
        .await
        .map(Json)
}

// ── Issues ──

#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    pub project_id: Option<String>,
    pub status: Option<String>,
}

async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<IssueQuery>,
) -> TrackerResult<Json<Vec<Issue>>> {
    issue_service::list_issues(&state.db, query.project_id.as_deref(), query.status.as_deref())
        .await
        .map(Json)
}

async fn get_issue(
    State(state): State<AppState>,
    Path(issue_id): Path<String>,
) -> TrackerResult<Json<Issue>> {
    state.db.issues.get(&issue_id).await.map(Json)
}

async fn create_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewIssue>,
) -> TrackerResult<Json<Issue>> {
    issue_service::create_issue(&state.db, request, user.id())
        .await
        .map(Json)
}

async fn update_issue(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(issue_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Issue>> {
    state.db.issues.patch(&issue_id, patch).await.map(Json)
}

async fn delete_issue(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(issue_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.issues.delete(&issue_id).await?;
    Ok(deleted("Issue", &issue_id))
}

async fn escalate_issue(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(issue_id): Path<String>,
    Json(escalation): Json<Escalation>,
) -> TrackerResult<Json<Issue>> {
    issue_service::escalate_issue(&state.db, &issue_id, escalation)
        .await
        .map(Json)
}

// ── Approvals ──

#[derive(Debug, Deserialize)]
pub struct ApprovalQuery {
    pub status: Option<String>,
    pub entity_type: Option<String>,
}

async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQuery>,
) -> TrackerResult<Json<Vec<Approval>>> {
    approval_service::list_approvals(
        &state.db,
        query.status.as_deref(),
        query.entity_type.as_deref(),
    )
    .await
    .map(Json)
}

async fn get_approval(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
) -> TrackerResult<Json<Approval>> {
    state.db.approvals.get(&approval_id).await.map(Json)
}

async fn overdue_approvals(State(state): State<AppState>) -> TrackerResult<Json<Vec<Approval>>> {
    approval_service::overdue(&state.db).await.map(Json)
}

async fn create_approval(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewApproval>,
) -> TrackerResult<Json<Approval>> {
    approval_service::create_approval(&state.db, request, &user.0)
        .await
        .map(Json)
}

async fn approve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(approval_id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> TrackerResult<Json<Approval>> {
    approval_service::approve(
        &state.db,
        &state.config.jwt_secret,
        &approval_id,
        &user.0,
        request,
    )
    .await
    .map(Json)
}

async fn reject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(approval_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> TrackerResult<Json<Approval>> {
    approval_service::reject(
        &state.db,
        &state.config.jwt_secret,
        &approval_id,
        &user.0,
        request,
    )
    .await
    .map(Json)
}

async fn delegate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(approval_id): Path<String>,
    Json(request): Json<DelegateRequest>,
) -> TrackerResult<Json<Approval>> {
    approval_service::delegate(&state.db, &approval_id, &user.0, request)
        .await
        .map(Json)
}

async fn emergency_override(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(approval_id): Path<String>,
    Json(request): Json<OverrideRequest>,
) -> TrackerResult<Json<Approval>> {
    user.require_admin("emergency override")?;
    approval_service::emergency_override(&state.db, &approval_id, &user.0, request)
        .await
        .map(Json)
}
