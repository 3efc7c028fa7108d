//! Error responses and header hygiene.
//!
//! # Responsibilities
//! - Map routing and upstream failures to status codes
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Unknown virtual host: 502 Bad Gateway, same as an unreachable backend
//! - Backend timeouts result in 504 Gateway Timeout
//! - Error bodies are short plain text; details go to the log

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::RoutingMiss;

/// Headers that describe one connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Response for a request whose virtual host has no backend.
pub fn routing_failure(miss: &RoutingMiss) -> Response {
    (StatusCode::BAD_GATEWAY, format!("{}\n", miss)).into_response()
}

pub fn bad_gateway(message: &str) -> Response {
    (StatusCode::BAD_GATEWAY, format!("{}\n", message)).into_response()
}

pub fn gateway_timeout() -> Response {
    (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out\n").into_response()
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Turn a backend response into one for the client.
pub fn from_upstream(response: hyper::Response<hyper::body::Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
