//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Validate the client's upgrade handshake
//! - Resolve the backend and dial it before answering the client
//! - Hand both connections to a relay session
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - The backend is dialed before the 101 is sent, so a routing miss or an
//!   unreachable backend is an ordinary 502 instead of a dead socket
//! - Only the Cookie header is carried to the backend
//! - The dial (TCP, TLS and handshake) is bounded by the connect timeout

use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequestParts, WebSocketUpgrade};
use axum::http::{header, HeaderMap, Request};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::http::request::{request_id, virtual_host};
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::{RelaySession, SessionInfo};
use crate::routing::resolve;

/// Backend side of a relay.
pub type BackendSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The backend WebSocket could not be opened.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("invalid backend request: {0}")]
    Request(#[source] tungstenite::Error),

    #[error("backend handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("backend did not complete the handshake within {0:?}")]
    Timeout(Duration),
}

/// Open a WebSocket to `url`, carrying the client's cookies.
pub async fn dial(url: &str, client_headers: &HeaderMap, timeout: Duration) -> Result<BackendSocket, DialError> {
    let mut request = url.into_client_request().map_err(DialError::Request)?;
    for cookie in client_headers.get_all(header::COOKIE) {
        request.headers_mut().append(header::COOKIE, cookie.clone());
    }

    match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((socket, handshake))) => {
            tracing::debug!(url = %url, status = %handshake.status(), "Backend WebSocket open");
            Ok(socket)
        }
        Ok(Err(e)) => Err(DialError::Handshake(e)),
        Err(_) => Err(DialError::Timeout(timeout)),
    }
}

/// Handle an upgrade request end to end.
pub async fn proxy(state: &AppState, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_owned();

    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, state).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(request_id = %request_id, error = %rejection, "Rejected WebSocket handshake");
            return rejection.into_response();
        }
    };

    let host = virtual_host(&parts.headers, &parts.uri).map(str::to_owned);
    let table = state.routes.current();
    let target = match resolve(&table, host.as_deref(), true, state.upstream_secure) {
        Ok(target) => target,
        Err(miss) => {
            metrics::record_routing_miss();
            tracing::warn!(request_id = %request_id, host = %miss.host, "No backend for virtual host");
            return response::routing_failure(&miss);
        }
    };
    drop(table);

    let url = target.url(parts.uri.path_and_query());
    let backend = match dial(&url, &parts.headers, state.timeouts.connect).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(request_id = %request_id, url = %url, error = %e, "Backend dial failed");
            return response::bad_gateway("Backend WebSocket unavailable");
        }
    };

    let session = RelaySession::new(
        state.sessions.track(),
        SessionInfo {
            virtual_host: host.unwrap_or_default(),
            backend: url,
        },
        state.timeouts.close,
        state.shutdown.subscribe(),
    );

    upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(request_id = %request_id, error = %e, "Client upgrade failed");
        })
        .on_upgrade(move |client| async move {
            session.run(client, backend).await;
        })
}
