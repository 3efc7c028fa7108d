//! Listener binding.
//!
//! # Responsibilities
//! - Bind the configured address before any traffic is accepted
//! - Report bind failures as fatal startup errors
//!
//! The accept loop itself belongs to `axum-server`, which takes ownership
//! of the bound socket (plain or behind rustls).

use std::net::{SocketAddr, TcpListener};

use thiserror::Error;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Address did not parse.
    #[error("invalid bind address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Certificate or key could not be loaded.
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),
}

/// Bind to the configured address.
pub fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(address).map_err(|source| ListenerError::Bind {
        address,
        source,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ListenerError::Bind { address, source })?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(address),
        tls = config.tls.is_some(),
        "Listener bound"
    );

    Ok(listener)
}
