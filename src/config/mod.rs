//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML) + CLI flags
//!     → loader.rs / cli.rs (parse & merge)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable for the process lifetime)
//!
//! routing file (TOML, one section per virtual host)
//!     → routing::table (parse, validate_sections)
//!     → routing::reload (atomic swap of Arc<RoutingTable>)
//!
//! On reload trigger:
//!     SIGHUP / SIGUSR1 (lifecycle::signals) or watcher.rs file event
//!     → ReloadHandle::trigger
//!     → ReloadController rebuilds and publishes the table
//! ```
//!
//! # Design Decisions
//! - Settings are loaded once; only the routing table is hot-reloaded
//! - All settings fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::TimeoutConfig;
pub use schema::TlsConfig;
