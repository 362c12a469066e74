//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (method, path, status, error)
//! - Request ID comes from the server layer and rides on the HTTP span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
