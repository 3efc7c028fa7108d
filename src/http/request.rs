//! Request inspection.
//!
//! # Responsibilities
//! - Extract the routing key (virtual host) from a request
//! - Detect WebSocket upgrade requests, for HTTP/1.1 and HTTP/2
//! - Read the request ID set by the request-id layer
//!
//! # Design Decisions
//! - The virtual host is used exactly as received, port included; no
//!   normalization, so `api` and `api:443` are different hosts
//! - Nothing here mutates the request

use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The virtual host a request addresses: the Host header as received, or the
/// URI authority when there is none (HTTP/2 `:authority`).
pub fn virtual_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    match headers.get(header::HOST) {
        Some(value) => value.to_str().ok(),
        None => uri.authority().map(|a| a.as_str()),
    }
}

/// Whether the request asks to be upgraded to a WebSocket.
///
/// HTTP/1.1: a `Connection` header listing `upgrade` together with
/// `Upgrade: websocket`. HTTP/2: an extended CONNECT with the `websocket`
/// protocol.
pub fn is_websocket_upgrade<B>(request: &Request<B>) -> bool {
    if request.method() == Method::CONNECT {
        return request
            .extensions()
            .get::<hyper::ext::Protocol>()
            .is_some_and(|p| p.as_str().eq_ignore_ascii_case("websocket"));
    }

    let headers = request.headers();
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .any(|value| has_token(value, "upgrade"));
    let upgrade_websocket = headers
        .get_all(header::UPGRADE)
        .iter()
        .any(|value| has_token(value, "websocket"));

    connection_upgrade && upgrade_websocket
}

/// Request ID assigned by the request-id layer, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn has_token(value: &HeaderValue, token: &str) -> bool {
    value
        .to_str()
        .map(|s| s.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/chat?room=1");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn host_header_is_taken_verbatim() {
        let req = request(&[("host", "api:8443")]);
        assert_eq!(virtual_host(req.headers(), req.uri()), Some("api:8443"));
    }

    #[test]
    fn authority_used_without_host_header() {
        let req = Request::builder()
            .uri("https://web.internal/index.html")
            .body(Body::empty())
            .unwrap();
        assert_eq!(virtual_host(req.headers(), req.uri()), Some("web.internal"));

        let bare = request(&[]);
        assert_eq!(virtual_host(bare.headers(), bare.uri()), None);
    }

    #[test]
    fn upgrade_detection_uses_header_tokens() {
        assert!(is_websocket_upgrade(&request(&[
            ("connection", "Upgrade"),
            ("upgrade", "websocket"),
        ])));
        assert!(is_websocket_upgrade(&request(&[
            ("connection", "keep-alive, Upgrade"),
            ("upgrade", "WebSocket"),
        ])));
        assert!(!is_websocket_upgrade(&request(&[("upgrade", "websocket")])));
        assert!(!is_websocket_upgrade(&request(&[
            ("connection", "upgrade"),
            ("upgrade", "h2c"),
        ])));
        assert!(!is_websocket_upgrade(&request(&[])));
    }

    #[test]
    fn extended_connect_is_an_upgrade() {
        let mut req = Request::builder()
            .method(Method::CONNECT)
            .uri("https://api/chat")
            .body(Body::empty())
            .unwrap();
        assert!(!is_websocket_upgrade(&req));

        req.extensions_mut()
            .insert(hyper::ext::Protocol::from_static("websocket"));
        assert!(is_websocket_upgrade(&req));
    }

    #[test]
    fn request_id_falls_back_to_unknown() {
        let req = request(&[("x-request-id", "abc-123")]);
        assert_eq!(request_id(req.headers()), "abc-123");
        assert_eq!(request_id(request(&[]).headers()), "unknown");
    }
}
