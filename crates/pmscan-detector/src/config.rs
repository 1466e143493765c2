//! Cascade detector configuration.

use crate::error::{DetectorError, DetectorResult};
use serde::{Deserialize, Serialize};

/// Tuning for cascade detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Rolling window capacity (cycles) for the spread/depth baseline.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Observations required before the detector may fire.
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    /// Cycles suppressed after a fire.
    #[serde(default = "default_cooldown_cycles")]
    pub cooldown_cycles: u32,
    /// Spread expansion: spread >= spread_mult * median spread.
    #[serde(default = "default_spread_mult")]
    pub spread_mult: f64,
    /// Depth collapse: depth5 <= depth_collapse_mult * median depth (< 1).
    #[serde(default = "default_depth_collapse_mult")]
    pub depth_collapse_mult: f64,
    /// Minimum |Δmid| for a mid jump.
    #[serde(default = "default_mid_jump_threshold")]
    pub mid_jump_threshold: f64,
    /// vol24h must stay below this for a mid jump to count.
    #[serde(default = "default_low_volume_cap")]
    pub low_volume_cap: f64,
    /// Stop distance from entry as a fraction of entry.
    #[serde(default = "default_stop_fraction")]
    pub stop_fraction: f64,
}

fn default_window_size() -> usize {
    30
}

fn default_min_history() -> usize {
    10
}

fn default_cooldown_cycles() -> u32 {
    5
}

fn default_spread_mult() -> f64 {
    2.0
}

fn default_depth_collapse_mult() -> f64 {
    0.60
}

fn default_mid_jump_threshold() -> f64 {
    0.02 // 2 cents on a [0, 1] price
}

fn default_low_volume_cap() -> f64 {
    250_000.0
}

fn default_stop_fraction() -> f64 {
    0.05
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_history: default_min_history(),
            cooldown_cycles: default_cooldown_cycles(),
            spread_mult: default_spread_mult(),
            depth_collapse_mult: default_depth_collapse_mult(),
            mid_jump_threshold: default_mid_jump_threshold(),
            low_volume_cap: default_low_volume_cap(),
            stop_fraction: default_stop_fraction(),
        }
    }
}

impl CascadeConfig {
    /// Validate configuration values.
    ///
    /// Returns Err if:
    /// - window_size is 0
    /// - min_history is 0 or exceeds window_size
    /// - spread_mult <= 1 (no expansion to detect)
    /// - depth_collapse_mult outside (0, 1)
    /// - mid_jump_threshold or low_volume_cap not positive
    /// - stop_fraction outside (0, 1)
    pub fn validate(&self) -> DetectorResult<()> {
        if self.window_size == 0 {
            return Err(DetectorError::ConfigError(
                "window_size must be at least 1".to_string(),
            ));
        }

        if self.min_history == 0 || self.min_history > self.window_size {
            return Err(DetectorError::ConfigError(format!(
                "min_history ({}) must be in [1, window_size ({})]",
                self.min_history, self.window_size
            )));
        }

        if !self.spread_mult.is_finite() || self.spread_mult <= 1.0 {
            return Err(DetectorError::ConfigError(format!(
                "spread_mult ({}) must be greater than 1",
                self.spread_mult
            )));
        }

        if !(self.depth_collapse_mult > 0.0 && self.depth_collapse_mult < 1.0) {
            return Err(DetectorError::ConfigError(format!(
                "depth_collapse_mult ({}) must be in (0, 1)",
                self.depth_collapse_mult
            )));
        }

        if !self.mid_jump_threshold.is_finite() || self.mid_jump_threshold <= 0.0 {
            return Err(DetectorError::ConfigError(format!(
                "mid_jump_threshold ({}) must be positive",
                self.mid_jump_threshold
            )));
        }

        if !self.low_volume_cap.is_finite() || self.low_volume_cap <= 0.0 {
            return Err(DetectorError::ConfigError(format!(
                "low_volume_cap ({}) must be positive",
                self.low_volume_cap
            )));
        }

        if !(self.stop_fraction > 0.0 && self.stop_fraction < 1.0) {
            return Err(DetectorError::ConfigError(format!(
                "stop_fraction ({}) must be in (0, 1)",
                self.stop_fraction
            )));
        }

        Ok(())
    }
}
