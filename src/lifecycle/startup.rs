//! Ordered startup: config, observability, listener, server.

use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, watcher::ConfigWatcher, ConfigError, GatewayConfig};
use crate::forward::ForwardError;
use crate::http::GatewayServer;
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build forwarder: {0}")]
    Forwarder(#[from] ForwardError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load config (or defaults), start the gateway and block until a shutdown signal.
pub async fn run(config_path: Option<&Path>) -> Result<(), StartupError> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "matrix-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.gateway.base_url,
        max_length = config.gateway.max_length,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.gateway.clone());
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = GatewayServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
