//! Tracker HTTP routes, nested under `/api`.
//!
//! Reads are public. Every write resolves the caller from the bearer token
//! through [`CurrentUser`](crate::auth::CurrentUser).

pub mod auth;
pub mod finance;
pub mod governance;
pub mod portfolio;
pub mod resources;

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::config::TrackerConfig;
use crate::dashboard::stats::{self, DashboardStats};
use crate::error::TrackerResult;
use crate::services::export_service::{self, ExportFormat, ExportKind};
use crate::store::Database;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: TrackerConfig,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: Database, config: TrackerConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
        Self { db, config, tokens }
    }
}

/// Update payloads: a JSON object of field values.
pub(crate) type Patch = Json<Map<String, Value>>;

pub(crate) fn deleted(label: &str, id: &str) -> Json<Value> {
    Json(json!({ "message": format!("{label} deleted"), "id": id }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

/// Build the tracker's Axum router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api = Router::new()
        .route("/health", get(health))
        .route("/seed", post(seed))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/export/{kind}", get(export))
        .merge(auth::routes())
        .merge(portfolio::routes())
        .merge(resources::routes())
        .merge(finance::routes())
        .merge(governance::routes());

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ── Operations ──

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now().to_rfc3339() }))
}

async fn seed(State(state): State<AppState>) -> TrackerResult<Json<Value>> {
    let summary = crate::seeder::seed(&state.db, state.config.bcrypt_cost).await?;
    Ok(Json(json!({
        "message": "Data seeded successfully",
        "counts": summary,
    })))
}

async fn dashboard_stats(State(state): State<AppState>) -> TrackerResult<Json<DashboardStats>> {
    stats::dashboard_stats(&state.db).await.map(Json)
}

// ── Export ──

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub project_id: Option<String>,
}

async fn export(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ExportQuery>,
) -> TrackerResult<Response> {
    let kind = ExportKind::from_str(&kind)?;
    let format = match query.format.as_deref() {
        Some(f) => ExportFormat::from_str(f)?,
        None => ExportFormat::default(),
    };

    let rows = export_service::documents(&state.db, kind, query.project_id.as_deref()).await?;
    tracing::info!(kind = kind.as_str(), rows = rows.len(), "Export generated");

    match format {
        ExportFormat::Json => {
            crate::metrics::export(kind.as_str(), "json");
            Ok(Json(rows).into_response())
        }
        ExportFormat::Csv => {
            crate::metrics::export(kind.as_str(), "csv");
            let body = export_service::to_csv(&rows)?;
            let disposition = format!("attachment; filename={}.csv", kind.as_str());
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}
