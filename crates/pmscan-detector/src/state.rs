//! Per-market cascade state.

use crate::config::CascadeConfig;
use crate::window::RollingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector phase for one market at the start of a cycle.
///
/// `Fired` is not a phase: a fire is reported through `CascadeOutcome` and
/// the market enters `Cooldown` on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorPhase {
    /// Fewer than `min_history` observations recorded.
    WarmingUp,
    Ready,
    /// Suppressing re-fire after a recent signal.
    Cooldown,
}

impl DetectorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WarmingUp => "WARMING_UP",
            Self::Ready => "READY",
            Self::Cooldown => "COOLDOWN",
        }
    }
}

impl fmt::Display for DetectorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling history and cooldown for one market.
#[derive(Debug, Clone)]
pub struct CascadeState {
    spreads: RollingWindow,
    depths: RollingWindow,
    observations_seen: u64,
    cooldown_remaining: u32,
    /// Timestamp of the last committed observation.
    last_timestamp: Option<DateTime<Utc>>,
}

impl CascadeState {
    pub fn new(window_size: usize) -> Self {
        Self {
            spreads: RollingWindow::new(window_size),
            depths: RollingWindow::new(window_size),
            observations_seen: 0,
            cooldown_remaining: 0,
            last_timestamp: None,
        }
    }

    /// Observations committed so far (not capped by the window).
    pub fn observations_seen(&self) -> u64 {
        self.observations_seen
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn spreads(&self) -> &RollingWindow {
        &self.spreads
    }

    pub fn depths(&self) -> &RollingWindow {
        &self.depths
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// True if an observation at `timestamp` was already committed, or is
    /// older than the last one.
    pub fn is_stale(&self, timestamp: DateTime<Utc>) -> bool {
        self.last_timestamp.is_some_and(|last| timestamp <= last)
    }

    /// Phase given the observations committed so far.
    pub fn phase(&self, config: &CascadeConfig) -> DetectorPhase {
        if self.observations_seen < config.min_history as u64 {
            DetectorPhase::WarmingUp
        } else if self.cooldown_remaining > 0 {
            DetectorPhase::Cooldown
        } else {
            DetectorPhase::Ready
        }
    }

    /// Baseline medians (spread, depth) over the current window.
    pub fn baseline(&self) -> (Option<f64>, Option<f64>) {
        (self.spreads.median(), self.depths.median())
    }

    /// Apply one cycle: append the observation and advance the cooldown.
    pub(crate) fn commit(
        &mut self,
        timestamp: DateTime<Utc>,
        spread: f64,
        depth5: f64,
        fired: bool,
        cooldown_cycles: u32,
    ) {
        self.last_timestamp = Some(timestamp);
        self.spreads.push(spread);
        self.depths.push(depth5);
        self.observations_seen += 1;

        if fired {
            self.cooldown_remaining = cooldown_cycles;
        } else {
            self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(i)
    }

    fn config() -> CascadeConfig {
        CascadeConfig {
            window_size: 4,
            min_history: 2,
            cooldown_cycles: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_transitions() {
        let config = config();
        let mut state = CascadeState::new(config.window_size);
        assert_eq!(state.phase(&config), DetectorPhase::WarmingUp);

        state.commit(t(0), 0.01, 100.0, false, 2);
        assert_eq!(state.phase(&config), DetectorPhase::WarmingUp);
        state.commit(t(1), 0.01, 100.0, false, 2);
        assert_eq!(state.phase(&config), DetectorPhase::Ready);

        state.commit(t(2), 0.05, 10.0, true, 2);
        assert_eq!(state.phase(&config), DetectorPhase::Cooldown);
        state.commit(t(3), 0.01, 100.0, false, 2);
        assert_eq!(state.phase(&config), DetectorPhase::Cooldown);
        state.commit(t(4), 0.01, 100.0, false, 2);
        assert_eq!(state.phase(&config), DetectorPhase::Ready);
    }

    #[test]
    fn test_count_not_capped_by_window() {
        let config = config();
        let mut state = CascadeState::new(config.window_size);
        for i in 0..10 {
            state.commit(t(i), 0.02, 50.0, false, 2);
        }
        assert_eq!(state.observations_seen(), 10);
        assert_eq!(state.spreads().len(), 4);
        assert_eq!(state.baseline(), (Some(0.02), Some(50.0)));
    }

    #[test]
    fn test_stale_timestamps() {
        let mut state = CascadeState::new(4);
        assert!(!state.is_stale(t(5)));

        state.commit(t(5), 0.02, 50.0, false, 2);
        assert_eq!(state.last_timestamp(), Some(t(5)));
        assert!(state.is_stale(t(5)));
        assert!(state.is_stale(t(4)));
        assert!(!state.is_stale(t(6)));
    }
}
