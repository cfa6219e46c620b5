//! Gateway integration tests
//!
//! Exercise the router with both logging middleware layers in place and
//! check what lands in the log file.

mod correlation;
mod error_logging;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use tests::TestLogger;
use tidelog_gateway::{build_router, AppState, HandlerError, RequestContext};
use tower::ServiceExt;

/// Routes covering success, client error, server error and handler logging
pub fn test_routes() -> Router<AppState> {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/missing", get(missing))
        .route("/items/{id}", post(save_item))
        .route("/work", get(work))
}

async fn missing() -> Result<(), HandlerError> {
    Err(HandlerError::new(
        StatusCode::NOT_FOUND,
        anyhow::anyhow!("no such item"),
    ))
}

async fn save_item(Path(id): Path<String>) -> Result<(), HandlerError> {
    Err(HandlerError::internal(anyhow::anyhow!(
        "item {} could not be saved",
        id
    )))
}

async fn work(State(state): State<AppState>, ctx: RequestContext) -> String {
    state.logger.info_with("Doing work", ctx.log_options());
    ctx.request_id
}

pub fn test_router(harness: &TestLogger) -> Router {
    build_router(harness.logger.clone(), test_routes())
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
