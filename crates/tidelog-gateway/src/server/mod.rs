//! Gateway Server
//!
//! HTTP host wiring the correlation and error-logging middleware around the
//! application's routes.

mod error;
mod handlers;
pub mod logging_middleware;

pub use error::{HandlerError, UnhandledError};
pub use handlers::{health, AppState, HealthResponse};
pub use logging_middleware::{
    error_logging_middleware, level_for_status, request_logging_middleware, X_REQUEST_ID,
};

use anyhow::Context;
use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tidelog_core::Logger;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Gateway server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl GatewayConfig {
    /// Read `HOST` and `PORT`, keeping defaults for missing or invalid values
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Get the socket address
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid address {}:{}", self.host, self.port))
    }
}

/// Build the Axum router.
///
/// `routes` are merged next to `/health`. The error-logging middleware wraps
/// matched routes only; request logging wraps everything, fallbacks included.
pub fn build_router(logger: Arc<Logger>, routes: Router<AppState>) -> Router {
    let state = AppState {
        logger: logger.clone(),
    };

    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes)
        .route_layer(middleware::from_fn_with_state(
            logger.clone(),
            logging_middleware::error_logging_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            logger,
            logging_middleware::request_logging_middleware,
        ))
        .with_state(state)
}

/// HTTP host owning the router and its lifecycle
pub struct GatewayServer {
    config: GatewayConfig,
    logger: Arc<Logger>,
    routes: Router<AppState>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, logger: Arc<Logger>) -> Self {
        Self {
            config,
            logger,
            routes: Router::new(),
        }
    }

    /// Add application routes
    pub fn with_routes(mut self, routes: Router<AppState>) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(self.logger.clone(), self.routes.clone())
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        let addr = listener.local_addr()?;

        info!("[Gateway] Ready to accept connections on {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

        info!("[Gateway] Stopped");
        Ok(())
    }

    /// Bind the configured address and serve
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = self.config.addr()?;

        info!("[Gateway] Starting on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener, shutdown).await
    }
}
