//! Request Context - per-request correlation data
//!
//! Generates the correlation id and carries it, with the request line and
//! start time, through the request's extensions.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use std::time::Instant;
use tidelog_core::LogOptions;
use uuid::Uuid;

/// Context label used on every entry the HTTP layer emits
pub const HTTP_CONTEXT: &str = "HTTP";

/// Generate a globally unique, opaque request id (UUID v4)
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Correlation context for a single request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request id
    pub request_id: String,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path (e.g., /uploads)
    pub path: String,
    /// Request start time
    pub started_at: Instant,
}

impl RequestContext {
    /// Create a new context for an incoming request
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            request_id: generate_request_id(),
            method: method.to_string(),
            path: path.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Whole milliseconds since the request arrived
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Options tagging an entry with this request's id and the HTTP context
    pub fn log_options(&self) -> LogOptions {
        LogOptions::new()
            .with_context(HTTP_CONTEXT)
            .with_request_id(self.request_id.clone())
    }
}

/// Handlers can take `RequestContext` directly to tag their own entries
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
