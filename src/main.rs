//! Smart PPE Compliance Server
//!
//! Backend for real-time PPE compliance detection and monitoring.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  PPE COMPLIANCE SERVER                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────────┐   ┌─────────────────────┐ │
//! │  │  API     │   │  Detection    │   │  Alert Fan-out      │ │
//! │  │  (Axum)  │──▶│  Normalizer + │──▶│  (Slack / Email /   │ │
//! │  │          │   │  Evaluator    │   │   WhatsApp)         │ │
//! │  └────┬─────┘   └───────┬───────┘   └──────────┬──────────┘ │
//! │       └─────────────────┼──────────────────────┘            │
//! │                         ▼                                   │
//! │                  ┌─────────────┐                            │
//! │                  │ PostgreSQL  │                            │
//! │                  └─────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod detection;
mod alerts;
mod handlers;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alerts::AlertDispatcher;
use detection::{DetectionProvider, RoboflowDetector};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ppe_compliance_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("PPE Compliance Server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Process-wide detection and alerting components
    let detector: Arc<dyn DetectionProvider> = Arc::new(RoboflowDetector::new(&config.detector)?);
    if !config.detector.is_configured() {
        tracing::warn!("Detection API not configured; checks will record degraded results");
    }

    let dispatcher = Arc::new(AlertDispatcher::from_config(&config)?);
    tracing::info!("Alert channels configured: {:?}", dispatcher.configured_channels());

    // Build application state
    let state = AppState {
        pool,
        config: Arc::new(config),
        detector,
        alerts: dispatcher,
    };
    let port = state.config.port;

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: Arc<config::Config>,
    pub detector: Arc<dyn DetectionProvider>,
    pub alerts: Arc<AlertDispatcher>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Compliance checks and records
        .route("/api/v1/compliance/check", post(handlers::compliance::check))
        .route("/api/v1/compliance/check-upload", post(handlers::compliance::check_upload))
        .route("/api/v1/compliance/records", get(handlers::compliance::list_records))
        .route("/api/v1/compliance/records/:id", get(handlers::compliance::get_record))

        // Workers
        .route("/api/v1/workers", post(handlers::workers::create).get(handlers::workers::list))
        .route("/api/v1/workers/:worker_id", get(handlers::workers::get))

        // Alerts
        .route("/api/v1/alerts/send", post(handlers::alerts::send))

        // Webhooks (workflow integration)
        .route("/api/v1/webhooks/compliance", post(handlers::webhooks::compliance))

        // Dashboard and analytics
        .route("/api/v1/dashboard/stats", get(handlers::dashboard::stats))
        .route("/api/v1/analytics/compliance", get(handlers::analytics::compliance))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
