//! Request target resolution.
//!
//! Pure functions: no I/O, no shared state. Given the current table and what
//! the inbound request looks like, decide where it goes.

use std::fmt;

use axum::http::uri::PathAndQuery;
use thiserror::Error;

use crate::routing::table::RoutingTable;

/// Scheme used to reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    /// WebSocket schemes for upgrades, HTTP schemes otherwise; the secure
    /// variant when `secure` is set.
    pub fn select(upgrade: bool, secure: bool) -> Self {
        match (upgrade, secure) {
            (true, true) => Scheme::Wss,
            (true, false) => Scheme::Ws,
            (false, true) => Scheme::Https,
            (false, false) => Scheme::Http,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved destination of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub backend: String,
}

impl Target {
    /// Absolute URL on the backend for the given path and query.
    /// The query is carried over verbatim.
    pub fn url(&self, path_and_query: Option<&PathAndQuery>) -> String {
        let pq = path_and_query.map(PathAndQuery::as_str).unwrap_or("/");
        format!("{}://{}{}", self.scheme, self.backend, pq)
    }
}

/// No backend is configured for the requested virtual host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no backend configured for virtual host {host:?}")]
pub struct RoutingMiss {
    pub host: String,
}

/// Resolve the backend for a request.
///
/// `host` is the virtual host exactly as received; `None` (no Host header and
/// no URI authority) is always a miss.
pub fn resolve(
    table: &RoutingTable,
    host: Option<&str>,
    upgrade: bool,
    secure: bool,
) -> Result<Target, RoutingMiss> {
    let host = host.unwrap_or_default();
    match table.lookup(host) {
        Some(backend) if !backend.is_empty() => Ok(Target {
            scheme: Scheme::select(upgrade, secure),
            backend: backend.to_string(),
        }),
        _ => Err(RoutingMiss {
            host: host.to_string(),
        }),
    }
}
