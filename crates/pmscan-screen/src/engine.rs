//! Screening engine.
//!
//! Pure function of (metrics, capital config). Two independent threshold
//! sets are evaluated per call; a market may pass both, either or neither.

use crate::config::{FamilyConfig, ScreeningConfig};
use pmscan_core::{DerivedMetrics, EPSILON};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Strategy family a screen applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyFamily {
    /// Microstructure / mechanical strategies (bot-dominated markets).
    Microstructure,
    /// Informational strategies (human-dominated markets).
    Informational,
}

impl StrategyFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Microstructure => "A",
            Self::Informational => "H",
        }
    }
}

impl fmt::Display for StrategyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a family screen passed or failed. First failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenReason {
    Ok,
    /// No two-sided book: depth or spread undefined.
    NoBook,
    DepthTooLow,
    /// vol24h not reported.
    VolumeMissing,
    VolumeTooLow,
    ExitRiskTooHigh,
}

impl ScreenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoBook => "NO_BOOK",
            Self::DepthTooLow => "DEPTH_TOO_LOW",
            Self::VolumeMissing => "VOLUME_MISSING",
            Self::VolumeTooLow => "VOLUME_TOO_LOW",
            Self::ExitRiskTooHigh => "EXIT_RISK_TOO_HIGH",
        }
    }
}

impl fmt::Display for ScreenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute thresholds for one family at the configured position size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FamilyThresholds {
    pub depth5_min: f64,
    pub vol24h_min: f64,
    pub exit_risk_max: f64,
}

impl FamilyThresholds {
    fn at_position_size(family: &FamilyConfig, position_size: f64) -> Self {
        Self {
            depth5_min: family.depth_mult * position_size,
            vol24h_min: family.volume_mult * position_size,
            exit_risk_max: family.max_exit_risk,
        }
    }
}

/// Screening outcome for one family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FamilyScreen {
    pub family: StrategyFamily,
    pub eligible: bool,
    pub reason: ScreenReason,
    /// `position_size / max(vol24h, ε)`; `None` when volume is missing.
    pub exit_risk: Option<f64>,
    pub thresholds: FamilyThresholds,
}

/// Screening outcome for one market in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub position_size: f64,
    pub microstructure: FamilyScreen,
    pub informational: FamilyScreen,
}

impl ScreeningResult {
    pub fn eligible_a(&self) -> bool {
        self.microstructure.eligible
    }

    pub fn eligible_h(&self) -> bool {
        self.informational.eligible
    }

    /// True when at least one family passed.
    pub fn any_eligible(&self) -> bool {
        self.eligible_a() || self.eligible_h()
    }
}

/// Exit risk for a position size against 24h volume, with an ε floor.
pub fn exit_risk(position_size: f64, vol24h: f64) -> f64 {
    position_size / vol24h.max(EPSILON)
}

/// Screening engine.
#[derive(Debug, Clone)]
pub struct ScreeningEngine {
    config: ScreeningConfig,
}

impl ScreeningEngine {
    /// Create an engine. The config is expected to be validated already.
    pub fn new(config: ScreeningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    pub fn position_size(&self) -> f64 {
        self.config.position_size()
    }

    /// Screen one market's metrics for both families.
    pub fn screen(&self, metrics: &DerivedMetrics) -> ScreeningResult {
        let position_size = self.position_size();
        let microstructure = self.screen_family(
            StrategyFamily::Microstructure,
            &self.config.family_a,
            position_size,
            metrics,
        );
        let informational = self.screen_family(
            StrategyFamily::Informational,
            &self.config.family_h,
            position_size,
            metrics,
        );

        trace!(
            position_size,
            a = %microstructure.reason,
            h = %informational.reason,
            "Screened market"
        );

        ScreeningResult {
            position_size,
            microstructure,
            informational,
        }
    }

    fn screen_family(
        &self,
        family: StrategyFamily,
        family_config: &FamilyConfig,
        position_size: f64,
        metrics: &DerivedMetrics,
    ) -> FamilyScreen {
        let thresholds = FamilyThresholds::at_position_size(family_config, position_size);
        let exit_risk = metrics.vol24h.map(|vol| exit_risk(position_size, vol));

        let reason = Self::evaluate(&thresholds, metrics, exit_risk);

        FamilyScreen {
            family,
            eligible: reason == ScreenReason::Ok,
            reason,
            exit_risk,
            thresholds,
        }
    }

    fn evaluate(
        thresholds: &FamilyThresholds,
        metrics: &DerivedMetrics,
        exit_risk: Option<f64>,
    ) -> ScreenReason {
        // Unknown never passes: both depth and spread must be defined.
        let depth5 = match (metrics.depth5, metrics.spread) {
            (Some(depth5), Some(_)) => depth5,
            _ => return ScreenReason::NoBook,
        };

        if depth5 < thresholds.depth5_min {
            return ScreenReason::DepthTooLow;
        }

        let (vol24h, exit_risk) = match (metrics.vol24h, exit_risk) {
            (Some(vol), Some(risk)) => (vol, risk),
            _ => return ScreenReason::VolumeMissing,
        };

        if vol24h < thresholds.vol24h_min {
            return ScreenReason::VolumeTooLow;
        }

        if exit_risk > thresholds.exit_risk_max {
            return ScreenReason::ExitRiskTooHigh;
        }

        ScreenReason::Ok
    }
}
