//! HTTP and WebSocket control surface for kitsmith.
//!
//! Exposes the workflow [`Controller`] as a JSON API: kit editing, stage
//! triggers, item listings, and a live stream of run events. Requests that
//! need the actor while a run is in flight get `409 Conflict`.
//!
//! Built on Axum.

pub mod api;
pub mod events;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use kitsmith_config::AppConfig;
use kitsmith_workflow::{Controller, KIT_SLOTS};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub controller: Controller,
    /// The 27-slot kit layout last submitted by the panel.
    pub layout: RwLock<Vec<Option<String>>>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            layout: RwLock::new(vec![None; KIT_SLOTS]),
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the gateway until `shutdown` fires.
pub async fn serve(
    config: &AppConfig,
    controller: Controller,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(Arc::new(GatewayState::new(controller)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info!("Gateway stopped");
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
