//! Screening error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ScreenResult<T> = Result<T, ScreenError>;
