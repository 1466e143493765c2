//! Error types for pmscan-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid snapshot for {market}: {reason}")]
    InvalidSnapshot { market: String, reason: String },

    #[error("Invalid market id: {0}")]
    InvalidMarketId(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
