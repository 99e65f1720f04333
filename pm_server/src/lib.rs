//! Defense program and project management tracker.
//!
//! A REST service over a document store: programs, projects, WBS tasks,
//! cleared resources, budgets, risks, vendors, issues and multi-level
//! approvals. The binary in `main.rs` wires configuration, storage and the
//! HTTP router together.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod routes;
pub mod schema;
pub mod seeder;
pub mod services;
pub mod store;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use routes::{router, AppState};
pub use store::Database;

/// Build the application router over an existing database handle.
pub fn build_app(db: Database, config: TrackerConfig) -> axum::Router {
    router(AppState::new(db, config))
}
