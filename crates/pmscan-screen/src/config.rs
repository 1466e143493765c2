//! Screening configuration.

use crate::error::{ScreenError, ScreenResult};
use serde::{Deserialize, Serialize};

/// Thresholds for one strategy family, as multiples of position size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Required depth5 as a multiple of position size.
    pub depth_mult: f64,
    /// Required vol24h as a multiple of position size.
    pub volume_mult: f64,
    /// Maximum tolerated `position_size / vol24h`.
    pub max_exit_risk: f64,
}

impl FamilyConfig {
    /// Microstructure family (A*) defaults: 8x depth, 20x volume, 10% exit risk.
    pub fn microstructure() -> Self {
        Self {
            depth_mult: 8.0,
            volume_mult: 20.0,
            max_exit_risk: 0.10,
        }
    }

    /// Informational family (H*) defaults: 3x depth, 10x volume, 20% exit risk.
    pub fn informational() -> Self {
        Self {
            depth_mult: 3.0,
            volume_mult: 10.0,
            max_exit_risk: 0.20,
        }
    }

    fn validate(&self, family: &str) -> ScreenResult<()> {
        let fields = [
            ("depth_mult", self.depth_mult),
            ("volume_mult", self.volume_mult),
            ("max_exit_risk", self.max_exit_risk),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScreenError::InvalidConfig(format!(
                    "{family}.{name} ({value}) must be positive and finite"
                )));
            }
        }
        Ok(())
    }
}

fn default_target_position_fraction() -> f64 {
    0.01
}

fn default_family_a() -> FamilyConfig {
    FamilyConfig::microstructure()
}

fn default_family_h() -> FamilyConfig {
    FamilyConfig::informational()
}

/// Capital assumptions and per-family thresholds.
///
/// Immutable once loaded; every screening call reads it by reference so
/// several configurations can be swept side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Capital allocated to the framework (USDC).
    pub equity: f64,
    /// Target position as a fraction of equity, in (0, 1].
    #[serde(default = "default_target_position_fraction")]
    pub target_position_fraction: f64,
    /// A* thresholds.
    #[serde(default = "default_family_a")]
    pub family_a: FamilyConfig,
    /// H* thresholds.
    #[serde(default = "default_family_h")]
    pub family_h: FamilyConfig,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            equity: 10_000.0,
            target_position_fraction: default_target_position_fraction(),
            family_a: default_family_a(),
            family_h: default_family_h(),
        }
    }
}

impl ScreeningConfig {
    pub fn new(equity: f64, target_position_fraction: f64) -> Self {
        Self {
            equity,
            target_position_fraction,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    ///
    /// Returns Err if:
    /// - equity is not a positive finite number
    /// - target_position_fraction is outside (0, 1]
    /// - any family multiple or exit-risk cap is not positive
    pub fn validate(&self) -> ScreenResult<()> {
        if !self.equity.is_finite() || self.equity <= 0.0 {
            return Err(ScreenError::InvalidConfig(format!(
                "equity ({}) must be positive",
                self.equity
            )));
        }

        let frac = self.target_position_fraction;
        if !frac.is_finite() || frac <= 0.0 || frac > 1.0 {
            return Err(ScreenError::InvalidConfig(format!(
                "target_position_fraction ({frac}) must be in (0, 1]"
            )));
        }

        self.family_a.validate("family_a")?;
        self.family_h.validate("family_h")?;
        Ok(())
    }

    /// Position size S = equity * target_position_fraction.
    pub fn position_size(&self) -> f64 {
        self.equity * self.target_position_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScreeningConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.position_size(), 100.0);
        assert_eq!(config.family_a.depth_mult, 8.0);
        assert_eq!(config.family_h.volume_mult, 10.0);
    }

    #[test]
    fn test_validate_rejects_non_positive_equity() {
        assert!(ScreeningConfig::new(0.0, 0.01).validate().is_err());
        assert!(ScreeningConfig::new(-5.0, 0.01).validate().is_err());
        assert!(ScreeningConfig::new(f64::NAN, 0.01).validate().is_err());
    }

    #[test]
    fn test_validate_fraction_bounds() {
        assert!(ScreeningConfig::new(1000.0, 0.0).validate().is_err());
        assert!(ScreeningConfig::new(1000.0, 1.5).validate().is_err());
        assert!(ScreeningConfig::new(1000.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_family_thresholds() {
        let config = ScreeningConfig {
            family_h: FamilyConfig {
                max_exit_risk: 0.0,
                ..FamilyConfig::informational()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("family_h.max_exit_risk"));
    }
}
