//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → tls.rs (optional rustls termination via axum-server)
//!     → Hand off to HTTP layer (plaintext view)
//!
//! Upgraded WebSocket connections
//!     → connection.rs (session IDs, open-session tracking)
//! ```
//!
//! # Design Decisions
//! - Bind happens before anything else is spawned; failure is fatal
//! - TLS is optional and handled transparently
//! - Each relay session tracked for graceful shutdown

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{SessionGuard, SessionId, SessionTracker};
pub use listener::ListenerError;
