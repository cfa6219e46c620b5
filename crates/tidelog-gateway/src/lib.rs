//! Tidelog Gateway
//!
//! HTTP host for services that log through `tidelog-core`:
//! - Per-request correlation ids, start and finish entries
//! - Unhandled handler errors logged with the request that caused them
//! - Shutdown signals, panic hook and logged background tasks

pub mod lifecycle;
pub mod logging;
pub mod server;

pub use lifecycle::{install_panic_hook, shutdown_signal, spawn_logged};
pub use logging::{generate_request_id, RequestContext};
pub use server::{
    build_router, AppState, GatewayConfig, GatewayServer, HandlerError, UnhandledError,
    X_REQUEST_ID,
};
