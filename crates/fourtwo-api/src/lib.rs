//! FourTwo API /v1: REST endpoints around the simulation engine
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use config::ApiConfig;
use error::ApiError;
use fourtwo_registry::{BlockRegistry, FixtureRegistry};
use metrics::SimulationMetrics;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared, read-only state. Each request builds its own context.
#[derive(Clone)]
pub struct AppState {
    pub blocks: Arc<BlockRegistry>,
    pub fixtures: Arc<FixtureRegistry>,
    pub metrics: Arc<SimulationMetrics>,
}

impl AppState {
    pub fn new(blocks: BlockRegistry, fixtures: FixtureRegistry) -> Result<Self, ApiError> {
        Ok(Self {
            blocks: Arc::new(blocks),
            fixtures: Arc::new(fixtures),
            metrics: Arc::new(SimulationMetrics::new()?),
        })
    }

    /// Standard blocks and the embedded fixtures
    pub fn standard() -> Result<Self, ApiError> {
        Self::new(BlockRegistry::standard(), FixtureRegistry::embedded()?)
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/simulate", post(handlers::simulate))
        .route("/v1/registry/blocks", get(handlers::list_blocks))
        .route("/v1/fixtures", get(handlers::list_fixtures))
        .route("/v1/fixtures/{id}", get(handlers::get_fixture))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: &ApiConfig) -> Result<(), ApiError> {
    let state = AppState::standard()?;
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    tracing::info!(
        addr = %config.addr,
        version = fourtwo_core::ENGINE_VERSION,
        "FourTwo API listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
