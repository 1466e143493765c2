//! Application configuration.

use crate::error::{AppError, AppResult};
use pmscan_core::ExtractorConfig;
use pmscan_detector::CascadeConfig;
use pmscan_persistence::PersistenceConfig;
use pmscan_screen::ScreeningConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Screen, classify and detect; record results only.
    #[default]
    Observation,
    /// Additionally turn fired cascades into paper order intents.
    Paper,
}

/// Paper execution sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Share of the screened position size used per cascade fade, in (0, 1].
    #[serde(default = "default_tactical_fraction")]
    pub tactical_fraction: f64,
}

fn default_tactical_fraction() -> f64 {
    0.25
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tactical_fraction: default_tactical_fraction(),
        }
    }
}

/// Telemetry output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Write the Prometheus text exposition here at shutdown.
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
    /// Interval between periodic run summaries (seconds).
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
}

fn default_summary_interval_secs() -> u64 {
    3600
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_path: None,
            summary_interval_secs: default_summary_interval_secs(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Operating mode.
    #[serde(default)]
    pub mode: OperatingMode,

    /// JSON Lines snapshot file replayed by the snapshot source.
    #[serde(default = "default_snapshots_path")]
    pub snapshots_path: PathBuf,

    /// Pause between cycles (ms).
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Process at most this many markets per cycle.
    #[serde(default)]
    pub max_markets_per_cycle: Option<usize>,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub screening: ScreeningConfig,

    #[serde(default)]
    pub cascade: CascadeConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_snapshots_path() -> PathBuf {
    PathBuf::from("data/snapshots.jsonl")
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            snapshots_path: default_snapshots_path(),
            cycle_interval_ms: default_cycle_interval_ms(),
            max_markets_per_cycle: None,
            extractor: ExtractorConfig::default(),
            screening: ScreeningConfig::default(),
            cascade: CascadeConfig::default(),
            execution: ExecutionConfig::default(),
            persistence: PersistenceConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section. Any error is fatal at startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.cycle_interval_ms == 0 {
            return Err(AppError::Config(
                "cycle_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.max_markets_per_cycle == Some(0) {
            return Err(AppError::Config(
                "max_markets_per_cycle must be at least 1 when set".to_string(),
            ));
        }

        let frac = self.execution.tactical_fraction;
        if !frac.is_finite() || frac <= 0.0 || frac > 1.0 {
            return Err(AppError::Config(format!(
                "execution.tactical_fraction ({frac}) must be in (0, 1]"
            )));
        }
        if self.telemetry.summary_interval_secs == 0 {
            return Err(AppError::Config(
                "telemetry.summary_interval_secs must be at least 1".to_string(),
            ));
        }

        self.extractor
            .validate()
            .map_err(|e| AppError::Config(format!("extractor: {e}")))?;
        self.screening
            .validate()
            .map_err(|e| AppError::Config(format!("screening: {e}")))?;
        self.cascade
            .validate()
            .map_err(|e| AppError::Config(format!("cascade: {e}")))?;
        Ok(())
    }
}
