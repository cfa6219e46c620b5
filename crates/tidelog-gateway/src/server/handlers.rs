//! Built-in HTTP handlers

use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tidelog_core::Logger;
use tracing::debug;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub logger: Arc<Logger>,
}

impl axum::extract::FromRef<AppState> for Arc<Logger> {
    fn from_ref(state: &AppState) -> Self {
        state.logger.clone()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    debug!("[Gateway] Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
