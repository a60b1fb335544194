//! Router setup and shared application state.
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::runpod::RunpodClient;
use crate::workflow::VariantRegistry;

pub struct AppState {
    pub config: Config,
    pub runpod_client: RunpodClient,
    pub registry: VariantRegistry,
    /// Plain client for the /api/download proxy fetch; the per-request
    /// timeout comes from `config.download_timeout()`.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let runpod_client = RunpodClient::from_config(&config);
        AppState {
            config,
            runpod_client,
            registry: VariantRegistry::builtin(),
            http: reqwest::Client::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/generate", post(handlers::generate))
        .route("/api/download", post(handlers::download))
        .route("/api/workflows", get(handlers::list_workflows))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
