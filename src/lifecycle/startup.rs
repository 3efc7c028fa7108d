//! Startup orchestration.
//!
//! # Order
//! 1. Load the routing table (fatal on failure)
//! 2. Start the reload controller, signal handlers and file watcher
//! 3. Start the metrics exporter, if enabled
//! 4. Load TLS material and bind the listener (fatal on failure)
//! 5. Serve until shutdown, then wait for relay sessions to drain
//!
//! Listeners start last, so no traffic arrives before routing is ready.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::net::{listener, tls, ListenerError};
use crate::observability::metrics;
use crate::routing::{reload_channel, ReloadController};

/// Anything that stops the proxy from starting or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to watch routing file: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run the proxy until it is told to stop.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = ?config.routes.path,
        tls = config.listener.tls.is_some(),
        "vhost-proxy starting"
    );

    let routes = Arc::new(ReloadController::load(&config.routes.path)?);
    let shutdown = Arc::new(Shutdown::new());

    let (reload, commands) = reload_channel();
    let reloader = tokio::spawn(Arc::clone(&routes).run(commands, shutdown.subscribe()));
    let _signals = signals::install(reload.clone(), Arc::clone(&shutdown))?;

    // Dropping the watcher stops it, so it lives as long as this function.
    let _watcher = if config.routes.watch {
        Some(ConfigWatcher::new(routes.source(), reload.clone()).run()?)
    } else {
        None
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let tls = match &config.listener.tls {
        Some(tls_config) => Some(tls::load_tls_config(tls_config).await?),
        None => None,
    };
    let listener = listener::bind(&config.listener)?;

    let server = HttpServer::new(&config, Arc::clone(&routes), Arc::clone(&shutdown));
    let sessions = server.sessions();
    let served = server.run(listener, tls).await;

    // The server only returns on its own when it failed; make sure the
    // rest of the proxy follows it down.
    if !shutdown.is_triggered() {
        tracing::error!("HTTP server stopped without a shutdown request");
        shutdown.trigger();
    }

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    if !sessions.wait_for_drain(grace).await {
        tracing::warn!(
            remaining = sessions.active_count(),
            "Relay sessions still open after grace period"
        );
    }
    let _ = reloader.await;

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
