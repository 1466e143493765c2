//! pmscan application.
//!
//! Wires the library crates into a runnable pipeline:
//! - snapshot source (JSON Lines replay)
//! - metric extraction, screening, regime classification
//! - signal routing and cascade detection
//! - result store and paper execution

pub mod app;
pub mod config;
pub mod error;
pub mod execution;
pub mod pipeline;
pub mod records;
pub mod router;
pub mod source;

pub use app::Application;
pub use config::{AppConfig, ExecutionConfig, OperatingMode, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use execution::{ExecutionAdapter, OrderIntent, OrderSide, PaperExecution};
pub use pipeline::{CycleReport, Disposition, MarketOutcome, Pipeline};
pub use router::{CycleTally, ExclusionReason, Route, SignalRouter};
pub use source::{JsonLinesSource, SnapshotSource, VecSource};
