//! Tidelog server entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tidelog_core::{logger, resolve_once, ErrorInfo, LogOptions, Logger, LoggerLayer};
use tidelog_gateway::lifecycle::PROCESS_CONTEXT;
use tidelog_gateway::{
    install_panic_hook, shutdown_signal, spawn_logged, GatewayConfig, GatewayServer,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Directory used when the configured log directory cannot be created
fn fallback_logs_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("tidelog").join("logs"))
}

/// Route `tracing` events from the host and its libraries into the logger
fn init_tracing(logger: Arc<Logger>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // RUST_LOG narrows what reaches the logger; the logger's own threshold
    // still applies afterwards
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("debug")
            .add_directive("hyper=warn".parse().expect("static directive"))
            .add_directive("tower=warn".parse().expect("static directive"))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(LoggerLayer::new(logger))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let fallback = fallback_logs_dir();
    let config = resolve_once(fallback.as_deref())
        .context("Failed to resolve logging configuration")?;

    let logger = Arc::new(Logger::new(config.clone()).await);
    logger::install_global(logger.clone());
    install_panic_hook(logger.clone());
    init_tracing(logger.clone());

    info!(
        threshold = config.level.as_str(),
        file_logging = config.enable_file_transport,
        "Logging initialized"
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        spawn_logged(logger.clone(), "signal-watcher", async move {
            shutdown_signal()
                .await
                .context("Failed to listen for shutdown signals")?;
            info!("Shutdown signal received");
            shutdown.cancel();
            Ok::<(), anyhow::Error>(())
        });
    }

    let server = GatewayServer::new(GatewayConfig::from_env(), logger.clone());
    let result = server.run(shutdown).await;

    if let Err(e) = &result {
        logger.error_with(
            "Gateway stopped with an error",
            LogOptions::new()
                .with_context(PROCESS_CONTEXT)
                .with_error(ErrorInfo::from_anyhow(e)),
        );
    }

    logger.close().await;
    result
}
