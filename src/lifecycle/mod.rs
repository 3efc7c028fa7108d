//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load routes → Reload controller, signals, watcher → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Close relay sessions → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP/SIGUSR1 → Trigger routing reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: routing table first, listener last
//! - One watch channel reaches every long-running task, including late subscribers
//! - Draining has a deadline; sessions still open after it are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
