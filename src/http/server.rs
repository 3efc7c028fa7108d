//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Serve on the bound listener, plain or behind rustls
//! - Stop accepting on shutdown and let in-flight requests finish
//!
//! # Dispatch
//! Every request is classified once: WebSocket upgrades go to the relay,
//! everything else to the HTTP forwarder. No retries.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::{Forwarder, Origin};
use crate::http::request::{is_websocket_upgrade, request_id, virtual_host};
use crate::http::{response, websocket};
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::net::SessionTracker;
use crate::observability::metrics::{self, RequestKind};
use crate::routing::{resolve, ReloadController};

/// Timeouts that apply to relay sessions.
#[derive(Debug, Clone, Copy)]
pub struct RelayTimeouts {
    /// Backend dial, TCP through WebSocket handshake.
    pub connect: Duration,
    /// How long a closing session waits for its peers.
    pub close: Duration,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ReloadController>,
    pub forwarder: Forwarder,
    pub sessions: SessionTracker,
    pub shutdown: Arc<Shutdown>,
    /// The listener terminates TLS.
    pub inbound_secure: bool,
    /// Backends are reached over TLS (`https`/`wss`).
    pub upstream_secure: bool,
    pub timeouts: RelayTimeouts,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    shutdown_grace: Duration,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, routes: Arc<ReloadController>, shutdown: Arc<Shutdown>) -> Self {
        let inbound_secure = config.listener.tls.is_some();
        let state = AppState {
            routes,
            forwarder: Forwarder::new(Duration::from_secs(config.timeouts.request_secs)),
            sessions: SessionTracker::new(),
            shutdown,
            inbound_secure,
            upstream_secure: inbound_secure && config.upstream.match_inbound_tls,
            timeouts: RelayTimeouts {
                connect: Duration::from_secs(config.timeouts.connect_secs),
                close: Duration::from_secs(config.timeouts.close_secs),
            },
        };

        Self {
            router: Self::build_router(state.clone()),
            state,
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Tracker of the relay sessions this server opens.
    pub fn sessions(&self) -> SessionTracker {
        self.state.sessions.clone()
    }

    /// Serve on `listener` until shutdown is signalled.
    pub async fn run(self, listener: std::net::TcpListener, tls: Option<RustlsConfig>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = tls.is_some(),
            upstream_tls = self.state.upstream_secure,
            "HTTP server starting"
        );

        let handle = Handle::new();
        let mut stop = self.state.shutdown.subscribe();
        let grace = self.shutdown_grace;
        let watcher = handle.clone();
        tokio::spawn(async move {
            shutdown::signalled(&mut stop).await;
            tracing::info!(grace_secs = grace.as_secs(), "HTTP server draining");
            watcher.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        match tls {
            Some(tls) => {
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await?
            }
            None => axum_server::from_tcp(listener).handle(handle).serve(app).await?,
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: classify, resolve, then relay or forward.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    if is_websocket_upgrade(&request) {
        let response = websocket::proxy(&state, request).await;
        metrics::record_request(&method, response.status().as_u16(), RequestKind::WebSocket, start);
        return response;
    }

    let request_id = request_id(request.headers()).to_owned();
    let host = virtual_host(request.headers(), request.uri()).map(str::to_owned);
    let table = state.routes.current();

    let response = match resolve(&table, host.as_deref(), false, state.upstream_secure) {
        Ok(target) => {
            tracing::debug!(
                request_id = %request_id,
                host = host.as_deref().unwrap_or_default(),
                target = %target.url(request.uri().path_and_query()),
                generation = table.generation(),
                "Forwarding request"
            );
            let origin = Origin {
                peer,
                secure: state.inbound_secure,
                virtual_host: host.as_deref().unwrap_or_default(),
            };
            state.forwarder.forward(&target, request, origin).await
        }
        Err(miss) => {
            metrics::record_routing_miss();
            tracing::warn!(request_id = %request_id, host = %miss.host, "No backend for virtual host");
            response::routing_failure(&miss)
        }
    };

    metrics::record_request(&method, response.status().as_u16(), RequestKind::Http, start);
    response
}
