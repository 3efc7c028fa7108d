//! Virtual host reverse proxy library.
//!
//! Routes plain HTTP and WebSocket traffic to the backend configured for the
//! request's virtual host, with a routing table that can be swapped while the
//! proxy keeps serving.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{ReloadController, RoutingTable};
