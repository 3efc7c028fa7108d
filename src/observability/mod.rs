//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (session_id, virtual_host, backend)
//! - Request ID (x-request-id) set and propagated by tower-http
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
