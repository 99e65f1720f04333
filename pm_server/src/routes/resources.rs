//! Resource directory, allocation and capacity planning.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use super::{deleted, AppState, Patch};
use crate::auth::CurrentUser;
use crate::error::TrackerResult;
use crate::models::resource::{NewResource, Resource};
use crate::services::resource_service::{
    self, AllocationConflict, Allocation, BulkAllocation, BulkResult, CapacityOverview,
    CertificationsSummary, ProjectAllocation, ResourceMatch, SkillsSummary,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resources", get(list_resources).post(create_resource))
        .route("/resources/conflicts/check", get(conflicts))
        .route("/resources/search/skills", get(search_skills))
        .route("/resources/search/certifications", get(search_certifications))
        .route("/resources/clearance/{level}", get(by_clearance))
        .route("/resources/capacity/overview", get(capacity_overview))
        .route("/resources/skills/summary", get(skills_summary))
        .route("/resources/certifications/summary", get(certifications_summary))
        .route(
            "/resources/project/{project_id}/allocation",
            get(project_allocation),
        )
        .route("/resources/bulk/allocate", post(bulk_allocate))
        .route(
            "/resources/{resource_id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/resources/{resource_id}/allocate", post(allocate))
        .route("/resources/{resource_id}/deallocate", post(deallocate))
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub clearance: Option<String>,
}

async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> TrackerResult<Json<Vec<Resource>>> {
    resource_service::list_resources(
        &state.db,
        query.resource_type.as_deref(),
        query.clearance.as_deref(),
    )
    .await
    .map(Json)
}

async fn get_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
) -> TrackerResult<Json<Resource>> {
    state.db.resources.get(&resource_id).await.map(Json)
}

async fn create_resource(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<NewResource>,
) -> TrackerResult<Json<Resource>> {
    resource_service::create_resource(&state.db, request)
        .await
        .map(Json)
}

async fn update_resource(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(resource_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Resource>> {
    state.db.resources.patch(&resource_id, patch).await.map(Json)
}

async fn delete_resource(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(resource_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.resources.delete(&resource_id).await?;
    Ok(deleted("Resource", &resource_id))
}

// ── Allocation ──

async fn allocate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(resource_id): Path<String>,
    Json(allocation): Json<Allocation>,
) -> TrackerResult<Json<Resource>> {
    resource_service::allocate(&state.db, &resource_id, &allocation)
        .await
        .map(Json)
}

async fn deallocate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(resource_id): Path<String>,
    Json(allocation): Json<Allocation>,
) -> TrackerResult<Json<Resource>> {
    resource_service::deallocate(&state.db, &resource_id, &allocation)
        .await
        .map(Json)
}

async fn bulk_allocate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(entries): Json<Vec<BulkAllocation>>,
) -> Json<BulkResult> {
    Json(resource_service::bulk_allocate(&state.db, entries).await)
}

async fn conflicts(
    State(state): State<AppState>,
) -> TrackerResult<Json<Vec<AllocationConflict>>> {
    resource_service::conflicts(&state.db).await.map(Json)
}

// ── Search & planning ──

#[derive(Debug, Deserialize)]
pub struct SkillQuery {
    pub skills: String,
}

#[derive(Debug, Deserialize)]
pub struct CertificationQuery {
    pub certifications: String,
}

async fn search_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillQuery>,
) -> TrackerResult<Json<Vec<ResourceMatch>>> {
    resource_service::search_by_skills(&state.db, &query.skills)
        .await
        .map(Json)
}

async fn search_certifications(
    State(state): State<AppState>,
    Query(query): Query<CertificationQuery>,
) -> TrackerResult<Json<Vec<ResourceMatch>>> {
    resource_service::search_by_certifications(&state.db, &query.certifications)
        .await
        .map(Json)
}

async fn by_clearance(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> TrackerResult<Json<Vec<Resource>>> {
    resource_service::by_clearance(&state.db, &level)
        .await
        .map(Json)
}

async fn capacity_overview(
    State(state): State<AppState>,
) -> TrackerResult<Json<CapacityOverview>> {
    resource_service::capacity_overview(&state.db).await.map(Json)
}

async fn skills_summary(State(state): State<AppState>) -> TrackerResult<Json<SkillsSummary>> {
    resource_service::skills_summary(&state.db).await.map(Json)
}

async fn certifications_summary(
    State(state): State<AppState>,
) -> TrackerResult<Json<CertificationsSummary>> {
    resource_service::certifications_summary(&state.db)
        .await
        .map(Json)
}

async fn project_allocation(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> TrackerResult<Json<ProjectAllocation>> {
    resource_service::project_allocation(&state.db, &project_id)
        .await
        .map(Json)
}
