//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (host, upgrade?, inbound TLS?)
//!     → reload.rs (current Arc<RoutingTable>, lock-free)
//!     → director.rs (resolve: Target or RoutingMiss)
//!
//! Table compilation (startup and every reload):
//!     routing file
//!     → table.rs (parse, validate every section)
//!     → reload.rs (publish as the new immutable snapshot)
//! ```
//!
//! # Design Decisions
//! - Tables are immutable at runtime; reload replaces the whole table
//! - Exact, case-sensitive virtual host match
//! - Explicit RoutingMiss rather than an empty backend address

pub mod director;
pub mod reload;
pub mod table;

pub use director::{resolve, RoutingMiss, Scheme, Target};
pub use reload::{reload_channel, ReloadController, ReloadHandle};
pub use table::RoutingTable;
