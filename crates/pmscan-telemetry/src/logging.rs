//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,pmscan=debug";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event, with span context.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::LoggingInit(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

impl LogFormat {
    /// `PMSCAN_LOG_FORMAT` if set, else JSON when `RUST_ENV=production`.
    pub fn from_env() -> TelemetryResult<Self> {
        if let Ok(raw) = std::env::var("PMSCAN_LOG_FORMAT") {
            return raw.parse();
        }
        let is_production = std::env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        Ok(if is_production {
            Self::Json
        } else {
            Self::Pretty
        })
    }
}

/// Initialize logging with the format chosen by the environment.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(LogFormat::from_env()?)
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Fails if a subscriber is already installed.
pub fn init_logging_with(format: LogFormat) -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
