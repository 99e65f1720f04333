//! Budget lines, vendors and contracts.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use super::{deleted, AppState, Patch};
use crate::auth::CurrentUser;
use crate::error::TrackerResult;
use crate::models::budget::{BudgetEntry, FundRelease, NewBudgetEntry};
use crate::models::contract::{Contract, NewContract};
use crate::models::vendor::{Blacklisting, DueDiligence, NewVendor, Vendor};
use crate::services::{budget_service, vendor_service};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budget", get(list_budget).post(create_budget))
        .route(
            "/budget/{entry_id}",
            get(get_budget).put(update_budget).delete(delete_budget),
        )
        .route("/budget/{entry_id}/release", post(release_budget))
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route(
            "/vendors/{vendor_id}",
            get(get_vendor).put(update_vendor).delete(delete_vendor),
        )
        .route("/vendors/{vendor_id}/due-diligence", post(due_diligence))
        .route("/vendors/{vendor_id}/blacklist", post(blacklist))
        .route("/contracts", get(list_contracts).post(create_contract))
        .route(
            "/contracts/{contract_id}",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
}

// ── Budget ──

#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    pub project_id: Option<String>,
    pub fiscal_year: Option<String>,
}

async fn list_budget(
    State(state): State<AppState>,
    Query(query): Query<BudgetQuery>,
) -> TrackerResult<Json<Vec<BudgetEntry>>> {
    budget_service::list_entries(
        &state.db,
        query.project_id.as_deref(),
        query.fiscal_year.as_deref(),
    )
    .await
    .map(Json)
}

async fn get_budget(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> TrackerResult<Json<BudgetEntry>> {
    state.db.budget.get(&entry_id).await.map(Json)
}

async fn create_budget(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<NewBudgetEntry>,
) -> TrackerResult<Json<BudgetEntry>> {
    budget_service::create_entry(&state.db, request).await.map(Json)
}

async fn update_budget(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(entry_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<BudgetEntry>> {
    state.db.budget.patch(&entry_id, patch).await.map(Json)
}

async fn delete_budget(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(entry_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.budget.delete(&entry_id).await?;
    Ok(deleted("Budget entry", &entry_id))
}

async fn release_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<String>,
    Json(release): Json<FundRelease>,
) -> TrackerResult<Json<BudgetEntry>> {
    budget_service::release_funds(&state.db, &entry_id, release, user.id())
        .await
        .map(Json)
}

// ── Vendors ──

#[derive(Debug, Deserialize)]
pub struct VendorQuery {
    pub status: Option<String>,
    pub category: Option<String>,
}

async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<VendorQuery>,
) -> TrackerResult<Json<Vec<Vendor>>> {
    vendor_service::list_vendors(&state.db, query.status.as_deref(), query.category.as_deref())
        .await
        .map(Json)
}

async fn get_vendor(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> TrackerResult<Json<Vendor>> {
    state.db.vendors.get(&vendor_id).await.map(Json)
}

async fn create_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<NewVendor>,
) -> TrackerResult<Json<Vendor>> {
    vendor_service::create_vendor(&state.db, request).await.map(Json)
}

async fn update_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vendor_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Vendor>> {
    state.db.vendors.patch(&vendor_id, patch).await.map(Json)
}

async fn delete_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vendor_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.vendors.delete(&vendor_id).await?;
    Ok(deleted("Vendor", &vendor_id))
}

async fn due_diligence(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vendor_id): Path<String>,
    Json(diligence): Json<DueDiligence>,
) -> TrackerResult<Json<Vendor>> {
    vendor_service::complete_due_diligence(&state.db, &vendor_id, diligence)
        .await
        .map(Json)
}

async fn blacklist(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vendor_id): Path<String>,
    Json(blacklisting): Json<Blacklisting>,
) -> TrackerResult<Json<Vendor>> {
    vendor_service::blacklist(&state.db, &vendor_id, blacklisting)
        .await
        .map(Json)
}

// ── Contracts ──

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub vendor_id: Option<String>,
    pub project_id: Option<String>,
}

async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
) -> TrackerResult<Json<Vec<Contract>>> {
    vendor_service::list_contracts(
        &state.db,
        query.vendor_id.as_deref(),
        query.project_id.as_deref(),
    )
    .await
    .map(Json)
}

async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> TrackerResult<Json<Contract>> {
    state.db.contracts.get(&contract_id).await.map(Json)
}

async fn create_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<NewContract>,
) -> TrackerResult<Json<Contract>> {
    vendor_service::create_contract(&state.db, request)
        .await
        .map(Json)
}

async fn update_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<String>,
    Json(patch): Patch,
) -> TrackerResult<Json<Contract>> {
    state.db.contracts.patch(&contract_id, patch).await.map(Json)
}

async fn delete_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<String>,
) -> TrackerResult<Json<Value>> {
    state.db.contracts.delete(&contract_id).await?;
    Ok(deleted("Contract", &contract_id))
}
