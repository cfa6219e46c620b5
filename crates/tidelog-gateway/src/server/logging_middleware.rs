//! HTTP Request/Response Logging Middleware
//!
//! Assigns each request a correlation id and logs a start line and a finish
//! line through the [`Logger`]. A second middleware logs unhandled handler
//! errors with the request that caused them.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{ConnectInfo, FromRequestParts, RawPathParams, Request, State},
    http::{header, Extensions, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body::Frame;
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tidelog_core::{ErrorInfo, LogLevel, LogOptions, Logger, Metadata};

use super::error::UnhandledError;
use crate::logging::{RequestContext, HTTP_CONTEXT};

/// Response header echoing the request's correlation id
pub const X_REQUEST_ID: &str = "x-request-id";

/// Maximum body size captured for error logs (64KB)
const MAX_BODY_LOG_SIZE: usize = 64 * 1024;

/// Body fields replaced before logging
const SENSITIVE_FIELDS: &[&str] = &["password", "token", "secret", "apiKey", "api_key"];

/// Severity of the finish entry for a response status
pub fn level_for_status(status: StatusCode) -> LogLevel {
    match status.as_u16() {
        500.. => LogLevel::Error,
        400..=499 => LogLevel::Warn,
        _ => LogLevel::Info,
    }
}

/// Client address: socket peer, then `x-forwarded-for`, else "unknown"
fn client_ip(extensions: &Extensions, headers: &HeaderMap) -> String {
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Logging middleware for requests and responses
///
/// Generates the request id, stores a [`RequestContext`] in the request
/// extensions and logs one entry on arrival and one on completion.
pub async fn request_logging_middleware(
    State(logger): State<Arc<Logger>>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::new(request.method().as_str(), request.uri().path());

    let headers = request.headers();
    logger.info_with(
        "Incoming request",
        ctx.log_options()
            .with_field("method", ctx.method.clone())
            .with_field("path", ctx.path.clone())
            .with_field("ip", client_ip(request.extensions(), headers))
            .with_field("userAgent", header_value(headers, header::USER_AGENT))
            .with_field("referer", header_value(headers, header::REFERER)),
    );

    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    let status = response.status();

    logger.log(
        level_for_status(status),
        "Request completed",
        ctx.log_options()
            .with_field("method", ctx.method.clone())
            .with_field("path", ctx.path.clone())
            .with_field("statusCode", status.as_u16())
            .with_field("durationMs", ctx.elapsed_ms()),
    );

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}

/// Error-logging middleware
///
/// Logs a handler's [`UnhandledError`] at `error` with the request's method,
/// path, address, body, query and path params, then returns the response
/// untouched. Install with `route_layer` so path params are available.
pub async fn error_logging_middleware(
    State(logger): State<Arc<Logger>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let params: Metadata = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
        Err(_) => Metadata::new(),
    };

    let query: Metadata = parts
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .map(|(k, v)| (k, Value::String(v)))
                .collect()
        })
        .unwrap_or_default();

    let request_id = parts
        .extensions
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone());
    let tagged = || {
        let options = LogOptions::new().with_context(HTTP_CONTEXT);
        match &request_id {
            Some(id) => options.with_request_id(id.clone()),
            None => options,
        }
    };

    let (body_summary, body) = match capture_body(&parts.headers, body).await {
        Ok(captured) => captured,
        Err(e) => {
            // The handler still runs and sees the same read error
            logger.warn_with(
                "Failed to read request body",
                tagged().with_error(ErrorInfo::from_error(&e)),
            );
            (
                Value::String("[unreadable]".to_string()),
                Body::new(ReplayedError(Some(e))),
            )
        }
    };

    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let ip = client_ip(&parts.extensions, &parts.headers);

    let response = next.run(Request::from_parts(parts, body)).await;

    if let Some(UnhandledError(info)) = response.extensions().get::<UnhandledError>() {
        let options = tagged()
            .with_error(info.as_ref().clone())
            .with_field("method", method)
            .with_field("path", path)
            .with_field("ip", ip)
            .with_field("body", body_summary)
            .with_field("query", query)
            .with_field("params", params);
        logger.error_with("Unhandled request error", options);
    }

    response
}

/// Buffer small bodies for logging and hand back an equivalent body.
///
/// Multipart uploads, bodies of unknown length and bodies above
/// `MAX_BODY_LOG_SIZE` pass through unread.
async fn capture_body(headers: &HeaderMap, body: Body) -> Result<(Value, Body), axum::Error> {
    let is_multipart = header_value(headers, header::CONTENT_TYPE)
        .map(|ct| ct.starts_with("multipart/"))
        .unwrap_or(false);
    let length = header_value(headers, header::CONTENT_LENGTH)
        .and_then(|v| v.parse::<usize>().ok())
        .or_else(|| body.size_hint().exact().map(|n| n as usize));

    match length {
        Some(0) => Ok((Value::Null, body)),
        Some(len) if !is_multipart && len <= MAX_BODY_LOG_SIZE => {
            let bytes = body.collect().await?.to_bytes();
            let summary = format_body(&bytes);
            Ok((summary, Body::from(bytes)))
        }
        Some(len) => Ok((Value::String(format!("[{} bytes]", len)), body)),
        None => Ok((Value::String("[streamed]".to_string()), body)),
    }
}

/// Body that yields a read error already hit while capturing
struct ReplayedError(Option<axum::Error>);

impl HttpBody for ReplayedError {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        Poll::Ready(self.0.take().map(Err))
    }
}

/// Render a captured body: JSON stays structured (sensitive fields redacted),
/// text is truncated, binary is summarized.
pub fn format_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => {
            if let Ok(mut json) = serde_json::from_str::<Value>(text) {
                redact(&mut json);
                return json;
            }
            // Truncate long text
            if text.chars().count() > 200 {
                let truncated: String = text.chars().take(200).collect();
                Value::String(format!("{}...", truncated))
            } else {
                Value::String(text.to_string())
            }
        }
        Err(_) => Value::String(format!("[binary: {} bytes]", bytes.len())),
    }
}

fn redact(value: &mut Value) {
    if let Value::Object(map) = value {
        for (key, field) in map.iter_mut() {
            if SENSITIVE_FIELDS.contains(&key.as_str()) {
                *field = Value::String("[REDACTED]".to_string());
            } else {
                redact(field);
            }
        }
    }
}
