//! Signal router.
//!
//! Sends each screened and classified market to exactly one place:
//! - BOT or MIXED regime and A* eligible: the cascade detector
//! - HUMAN regime and H* eligible: the informational framework
//! - otherwise excluded, with the reason

use pmscan_regime::{BotScoreResult, Regime};
use pmscan_screen::ScreeningResult;
use serde::Serialize;
use std::fmt;

/// Why a market left the pipeline without a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionReason {
    /// Neither family's screen passed.
    FailedScreening,
    /// The market passed a screen, but not the one its regime routes to.
    RegimeMismatch,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailedScreening => "failed_screening",
            Self::RegimeMismatch => "regime_mismatch",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Cascade,
    Informational,
    Excluded(ExclusionReason),
}

impl Route {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Informational => "informational",
            Self::Excluded(reason) => reason.as_str(),
        }
    }
}

pub struct SignalRouter;

impl SignalRouter {
    pub fn route(screening: &ScreeningResult, bot_score: &BotScoreResult) -> Route {
        let (wanted, other) = match bot_score.regime {
            Regime::Bot | Regime::Mixed => (screening.eligible_a(), screening.eligible_h()),
            Regime::Human => (screening.eligible_h(), screening.eligible_a()),
        };

        match (bot_score.regime, wanted, other) {
            (Regime::Bot | Regime::Mixed, true, _) => Route::Cascade,
            (Regime::Human, true, _) => Route::Informational,
            (_, false, true) => Route::Excluded(ExclusionReason::RegimeMismatch),
            (_, false, false) => Route::Excluded(ExclusionReason::FailedScreening),
        }
    }
}

/// Per-cycle counts of router decisions and detector fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleTally {
    pub processed: u64,
    pub invalid: u64,
    pub failed_screening: u64,
    pub regime_mismatch: u64,
    pub cascade_routed: u64,
    pub informational_routed: u64,
    pub fired: u64,
}

impl CycleTally {
    /// Count one routed market.
    pub fn record(&mut self, route: Route, fired: bool) {
        self.processed += 1;
        match route {
            Route::Cascade => self.cascade_routed += 1,
            Route::Informational => self.informational_routed += 1,
            Route::Excluded(ExclusionReason::FailedScreening) => self.failed_screening += 1,
            Route::Excluded(ExclusionReason::RegimeMismatch) => self.regime_mismatch += 1,
        }
        if fired {
            self.fired += 1;
        }
    }

    pub fn record_invalid(&mut self) {
        self.invalid += 1;
    }

    /// Add another tally into this one.
    pub fn merge(&mut self, other: &CycleTally) {
        self.processed += other.processed;
        self.invalid += other.invalid;
        self.failed_screening += other.failed_screening;
        self.regime_mismatch += other.regime_mismatch;
        self.cascade_routed += other.cascade_routed;
        self.informational_routed += other.informational_routed;
        self.fired += other.fired;
    }
}
