//! Prometheus metrics and structured logging for pmscan.
//!
//! - Structured logging via `tracing` (JSON in production)
//! - Prometheus counters for snapshots, regimes, screening and cascades
//! - End-of-run summary built from the same counters

pub mod error;
pub mod logging;
pub mod metrics;
pub mod summary;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, LogFormat};
pub use metrics::Metrics;
pub use summary::{RunSummary, RunSummaryReporter};
