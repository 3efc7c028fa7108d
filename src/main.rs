//! vhost-proxy
//!
//! A TLS-terminating reverse proxy that picks a backend by virtual host,
//! built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────────┐
//!                     │                      VHOST PROXY                        │
//!                     │                                                         │
//!   Client request    │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐      │
//!   ──────────────────┼─▶│   net   │──▶│   http   │──▶│ routing::resolve │      │
//!                     │  │ (+tls)  │   │ dispatch │   └────────┬─────────┘      │
//!                     │  └─────────┘   └────┬─────┘            │                │
//!                     │                     │          upgrade?│                │
//!                     │            ┌────────┴────────┐         │                │
//!                     │            ▼                 ▼         │                │
//!                     │   ┌────────────────┐  ┌────────────┐   │                │
//!                     │   │ http::forward  │  │   relay    │◀──┘                │
//!                     │   │ (hyper client) │  │ two pumps  │                    │
//!                     │   └───────┬────────┘  └─────┬──────┘                    │
//!                     │           └────────┬────────┘                           │
//!                     │                    ▼                                    │
//!                     │                 Backend                                 │
//!                     │                                                         │
//!                     │  ┌───────────────────────────────────────────────────┐  │
//!                     │  │ config (settings, routing file, watcher)          │  │
//!                     │  │ routing::reload (ArcSwap table, SIGHUP/SIGUSR1)   │  │
//!                     │  │ lifecycle (signals, shutdown, drain)              │  │
//!                     │  │ observability (tracing, prometheus)               │  │
//!                     │  └───────────────────────────────────────────────────┘  │
//!                     └────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use vhost_proxy::config::cli::Cli;
use vhost_proxy::lifecycle::startup;
use vhost_proxy::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    logging::init(&config.observability);

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "vhost-proxy stopped with an error");
        return Err(e.into());
    }
    Ok(())
}
