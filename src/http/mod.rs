//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, dispatch)
//!     → request.rs (virtual host, upgrade detection)
//!     → routing::resolve (backend for the virtual host)
//!     → websocket.rs (dial backend, relay frames)   if upgrade
//!     → forward.rs (stream request/response)        otherwise
//!     → response.rs (error mapping, header hygiene)
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use forward::Forwarder;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use websocket::DialError;
