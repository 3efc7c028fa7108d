//! Plain HTTP forwarding.
//!
//! Requests that are not WebSocket upgrades are sent to the resolved backend
//! with a pooled hyper client and the backend's response is streamed back.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri, Version};
use axum::response::Response;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::http::response;
use crate::routing::Target;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Where a request came from.
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    pub peer: SocketAddr,
    pub secure: bool,
    pub virtual_host: &'a str,
}

/// Shared upstream HTTP client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(request_timeout: Duration) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout,
        }
    }

    /// Send `request` to `target` and return the backend's response, or a
    /// 502/504 if the backend cannot be reached in time.
    pub async fn forward(&self, target: &Target, request: Request<Body>, origin: Origin<'_>) -> Response {
        let request = match prepare(target, request, origin) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(backend = %target.backend, error = %e, "Cannot build upstream request");
                return response::bad_gateway("Invalid upstream request");
            }
        };

        match tokio::time::timeout(self.request_timeout, self.client.request(request)).await {
            Ok(Ok(upstream)) => response::from_upstream(upstream),
            Ok(Err(e)) => {
                tracing::warn!(backend = %target.backend, error = %e, "Upstream request failed");
                response::bad_gateway("Upstream request failed")
            }
            Err(_) => {
                tracing::warn!(
                    backend = %target.backend,
                    timeout_secs = self.request_timeout.as_secs(),
                    "Upstream request timed out"
                );
                response::gateway_timeout()
            }
        }
    }
}

/// Rewrite an inbound request for the backend: absolute backend URI with the
/// path and query untouched, hop-by-hop headers removed, forwarding headers
/// added. The inbound Host header is kept.
pub fn prepare(
    target: &Target,
    request: Request<Body>,
    origin: Origin<'_>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    let uri: Uri = target.url(parts.uri.path_and_query()).parse()?;
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    let headers = &mut parts.headers;
    response::strip_hop_by_hop(headers);

    if !headers.contains_key(header::HOST) {
        headers.insert(header::HOST, HeaderValue::from_str(origin.virtual_host)?);
    }

    let peer_ip = origin.peer.ip().to_string();
    let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, peer_ip),
        None => peer_ip,
    };
    headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&forwarded_for)?);
    headers.insert(
        X_FORWARDED_PROTO,
        HeaderValue::from_static(if origin.secure { "https" } else { "http" }),
    );
    headers.insert(X_FORWARDED_HOST, HeaderValue::from_str(origin.virtual_host)?);

    Ok(Request::from_parts(parts, body))
}
