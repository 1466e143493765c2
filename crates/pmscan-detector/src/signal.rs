//! Cascade signal types.

use crate::state::DetectorPhase;
use chrono::{DateTime, Utc};
use pmscan_core::MarketId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fade direction: trade against the cascade move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FadeDirection {
    /// Mid jumped up; sell into it.
    FadeUp,
    /// Mid dropped (or did not move); buy into it.
    FadeDown,
}

impl FadeDirection {
    /// Direction for a signed mid change.
    pub fn from_mid_change(mid_change: Option<f64>) -> Self {
        match mid_change {
            Some(delta) if delta > 0.0 => Self::FadeUp,
            _ => Self::FadeDown,
        }
    }

    /// Stop price a fraction away from entry, on the losing side.
    pub fn stop_price(&self, entry: f64, stop_fraction: f64) -> f64 {
        match self {
            Self::FadeUp => entry * (1.0 + stop_fraction),
            Self::FadeDown => entry * (1.0 - stop_fraction),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FadeUp => "FADE_UP",
            Self::FadeDown => "FADE_DOWN",
        }
    }
}

impl fmt::Display for FadeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which cascade conditions held this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeConditions {
    pub spread_expansion: bool,
    pub depth_collapse: bool,
    /// |Δmid| over threshold while vol24h stays under the low-volume cap.
    pub mid_jump: bool,
}

impl CascadeConditions {
    pub fn count(&self) -> u8 {
        [self.spread_expansion, self.depth_collapse, self.mid_jump]
            .iter()
            .filter(|held| **held)
            .count() as u8
    }

    /// Two or more conditions hold.
    pub fn qualifies(&self) -> bool {
        self.count() >= 2
    }

    /// Condition codes that held, comma separated.
    pub fn reasons(&self) -> String {
        let mut reasons = Vec::with_capacity(3);
        if self.spread_expansion {
            reasons.push("SPREAD_EXPANSION");
        }
        if self.depth_collapse {
            reasons.push("DEPTH_COLLAPSE");
        }
        if self.mid_jump {
            reasons.push("MID_JUMP");
        }
        reasons.join(",")
    }
}

/// What the detector concluded for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CascadeOutcome {
    Fired,
    /// Ready, but fewer than two conditions held.
    NoCascade,
    /// Not enough history yet.
    WarmingUp,
    /// Conditions may hold but a recent fire suppresses this one.
    Cooldown,
    /// Spread, depth or mid undefined; state left untouched.
    MissingData,
    /// Timestamp not newer than the last committed one; state left untouched.
    Duplicate,
}

impl CascadeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fired => "FIRED",
            Self::NoCascade => "NO_CASCADE",
            Self::WarmingUp => "WARMING_UP",
            Self::Cooldown => "COOLDOWN",
            Self::MissingData => "MISSING_DATA",
            Self::Duplicate => "DUPLICATE",
        }
    }
}

impl fmt::Display for CascadeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade reference attached to a fired signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeTrade {
    pub direction: FadeDirection,
    /// Entry reference: mid at fire time.
    pub entry: f64,
    pub stop: f64,
    /// Fraction of conditions that held (2/3 or 1).
    pub strength: f64,
}

/// Detector result for one market observation.
///
/// Emitted every cycle, fired or not, with the measured values and baseline
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSignal {
    pub market_id: MarketId,
    pub timestamp: DateTime<Utc>,
    pub outcome: CascadeOutcome,
    /// Phase before this observation was committed.
    pub phase: DetectorPhase,
    /// Observations committed before this one.
    pub observations_seen: u64,
    pub conditions: CascadeConditions,
    pub spread: Option<f64>,
    pub depth5: Option<f64>,
    pub mid: Option<f64>,
    pub mid_change: Option<f64>,
    pub vol24h: Option<f64>,
    /// Baseline medians, computed before this observation was appended.
    pub median_spread: Option<f64>,
    pub median_depth: Option<f64>,
    /// Present only when `outcome == Fired`.
    pub trade: Option<FadeTrade>,
}

impl CascadeSignal {
    pub fn is_fired(&self) -> bool {
        self.outcome == CascadeOutcome::Fired
    }

    /// Unique id for a fired signal, stable for a given market and time.
    pub fn signal_id(&self) -> String {
        format!("a2_{}_{}", self.market_id, self.timestamp.timestamp_millis())
    }
}
