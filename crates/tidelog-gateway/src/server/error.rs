//! Handler errors
//!
//! Handlers return `Result<_, HandlerError>`. The error renders its own
//! response and leaves an [`UnhandledError`] in the response extensions for
//! the error-logging middleware to pick up.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::sync::Arc;
use tidelog_core::ErrorInfo;

/// Error surfaced by a request handler
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    error: anyhow::Error,
}

impl HandlerError {
    pub fn new(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

impl<E> From<E> for HandlerError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self::internal(error)
    }
}

/// Error details attached to a response produced from a [`HandlerError`]
#[derive(Debug, Clone)]
pub struct UnhandledError(pub Arc<ErrorInfo>);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let info = ErrorInfo::from_anyhow(&self.error);

        // Server-side failure details stay in the log
        let message = if self.status.is_server_error() {
            self.status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            info.message.clone()
        };

        let mut response = (self.status, Json(json!({ "error": message }))).into_response();
        response
            .extensions_mut()
            .insert(UnhandledError(Arc::new(info)));
        response
    }
}
