//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] pmscan_core::CoreError),

    #[error("Detector error: {0}")]
    Detector(#[from] pmscan_detector::DetectorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pmscan_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] pmscan_persistence::PersistenceError),

    #[error("Snapshot source error: {0}")]
    Source(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
