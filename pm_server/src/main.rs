//! Defense PM Tracker server.
//!
//! Serves the tracker API under `/api`. Documents live in PostgreSQL when
//! `DATABASE_URL` is set and in process memory otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use pm_server::store::{Database, DocumentStore, MemoryStore, PgStore};
use pm_server::{build_app, metrics, seeder, TrackerConfig};

#[derive(Parser)]
#[command(name = "defense-pm", about = "Defense Program & Project Management Tracker")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "PM_PORT", default_value = "8001")]
    port: u16,

    /// PostgreSQL connection URL. Uses the in-memory store when unset.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Load the demo portfolio before serving
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();
    let config = TrackerConfig::from_env();

    tracing::info!("Starting Defense PM Tracker...");

    let store: Arc<dyn DocumentStore> = match cli.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections)
                .map_err(|e| anyhow::anyhow!("database pool: {e}"))?;
            store.run_migrations().await?;
            tracing::info!("Using PostgreSQL document store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set -- data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let db = Database::new(store, config.max_write_attempts);

    if cli.seed {
        let summary = seeder::seed(&db, config.bcrypt_cost)
            .await
            .map_err(|e| anyhow::anyhow!("seeding failed: {e}"))?;
        tracing::info!(?summary, "Seeded demo portfolio");
    }

    metrics::init_metrics();

    let app = build_app(db, config);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Defense PM Tracker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
