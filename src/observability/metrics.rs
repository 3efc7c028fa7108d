//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, kind
//! - `proxy_request_duration_seconds` (histogram): time to response headers
//! - `proxy_routing_misses_total` (counter): requests for unknown virtual hosts
//! - `proxy_relay_sessions_active` (gauge): open WebSocket relay sessions
//! - `proxy_relay_frames_total` (counter): relayed frames by direction
//! - `proxy_config_reloads_total` (counter): reload attempts by outcome
//!
//! Without an installed recorder every call here is a no-op, so tests and
//! library users pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Which path a request took through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Http,
    WebSocket,
}

impl RequestKind {
    fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Http => "http",
            RequestKind::WebSocket => "websocket",
        }
    }
}

pub fn record_request(method: &str, status: u16, kind: RequestKind, start: Instant) {
    let status = status.to_string();
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status,
        "kind" => kind.as_str()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "kind" => kind.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_routing_miss() {
    counter!("proxy_routing_misses_total").increment(1);
}

// Deltas rather than absolute values: guards on different threads may
// report out of order, and increments commute.
pub fn session_opened() {
    gauge!("proxy_relay_sessions_active").increment(1.0);
}

pub fn session_closed() {
    gauge!("proxy_relay_sessions_active").decrement(1.0);
}

pub fn record_frame(direction: &'static str) {
    counter!("proxy_relay_frames_total", "direction" => direction).increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("proxy_config_reloads_total", "outcome" => outcome).increment(1);
}
