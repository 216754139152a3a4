//! Broadsheet API server - backend for the e-paper portal
//!
//! Provides REST endpoints for:
//! - PDF issue upload and page rasterization
//! - Published-issue lookup (latest, by date, by month)
//! - Paginated browsing and issue deletion

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod handlers;
mod models;
mod state;

use broadsheet::{AppConfig, PublishScheduler};
use state::AppState;

/// Upload body ceiling. Full-colour broadsheet issues run large.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Ingestion
        .route(
            "/newspaper/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Issue lookups
        .route("/newspaper", get(handlers::latest))
        .route("/newspaper/date", get(handlers::by_date))
        .route("/newspaper/dates", get(handlers::dates))
        .route("/newspaper/page", get(handlers::page))
        .route("/newspaper/future", get(handlers::future))
        // Removal
        .route("/newspaper/:id", delete(handlers::remove));

    // The local provider keeps page images on disk; serve them here.
    // Remote providers carry their own public URLs.
    if let Some(root) = &state.local_media_root {
        router = router.nest_service("/uploads", ServeDir::new(root));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("broadsheet=info".parse()?)
                .add_directive("broadsheet_server=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing broadsheet API...");
    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::new(&config)?);

    // Publication sweep: once now, then on the configured interval. The
    // broadcast channel wakes the loop early when the server drains.
    let scheduler = PublishScheduler::new(state.db.clone(), config.sweep_interval);
    let (trigger_tx, trigger_rx) = tokio::sync::broadcast::channel(4);
    let sweeper = scheduler.start(trigger_rx);

    let app = app(state);

    // Parse bind address
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting broadsheet API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    let _ = trigger_tx.send(());
    let _ = sweeper.await;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining"),
        Err(error) => {
            // Without a signal handler the default disposition still
            // terminates the process; just never trigger a graceful drain.
            tracing::error!(%error, "could not listen for shutdown signals");
            std::future::pending::<()>().await;
        }
    }
}
