//! Cascade detector implementation.
//!
//! Every screened market with a complete book is committed to its window
//! once per cycle, through `observe` when it routes to cascade and through
//! `record` otherwise. `observe` additionally:
//! 1. reads the baseline medians from the window as it stood before this cycle
//! 2. evaluates the three conditions against that baseline
//! 3. fires when the market is `Ready` and two or more conditions hold
//!
//! and only then appends the observation and advances the cooldown. Both run
//! inside one `&mut self` call, so a market's window is never seen
//! half-updated. An observation with an undefined spread, depth or mid, or
//! with a timestamp not newer than the last committed one, leaves the state
//! untouched.

use crate::config::CascadeConfig;
use crate::error::DetectorResult;
use crate::signal::{CascadeConditions, CascadeOutcome, CascadeSignal, FadeDirection, FadeTrade};
use crate::state::{CascadeState, DetectorPhase};
use chrono::{DateTime, Utc};
use pmscan_core::{DerivedMetrics, MarketId};
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Cascade (A2) detector.
///
/// Owns every market's `CascadeState`. Markets are independent; the same
/// market must not be observed concurrently, which `&mut self` enforces.
#[derive(Debug)]
pub struct CascadeDetector {
    config: CascadeConfig,
    states: HashMap<MarketId, CascadeState>,
}

impl CascadeDetector {
    /// Create a detector. Fails if the configuration is invalid.
    pub fn new(config: CascadeConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            states: HashMap::new(),
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Commit an observation without evaluating it.
    ///
    /// Used for screened markets routed away from the cascade detector, so
    /// their baseline stays current. Returns whether the state changed.
    pub fn record(
        &mut self,
        market_id: &MarketId,
        timestamp: DateTime<Utc>,
        metrics: &DerivedMetrics,
    ) -> bool {
        let Some((spread, depth5, _)) = complete_book(metrics) else {
            return false;
        };

        let config = &self.config;
        let state = self
            .states
            .entry(market_id.clone())
            .or_insert_with(|| CascadeState::new(config.window_size));
        if state.is_stale(timestamp) {
            trace!(%market_id, %timestamp, "Observation already recorded");
            return false;
        }

        state.commit(timestamp, spread, depth5, false, config.cooldown_cycles);
        trace!(%market_id, observations = state.observations_seen(), "Observation recorded");
        true
    }

    /// Evaluate one observation of one market and commit it.
    pub fn observe(
        &mut self,
        market_id: &MarketId,
        timestamp: DateTime<Utc>,
        metrics: &DerivedMetrics,
    ) -> CascadeSignal {
        let Some((spread, depth5, mid)) = complete_book(metrics) else {
            debug!(%market_id, "Cascade check skipped: book incomplete");
            return self.unevaluated(market_id, timestamp, metrics, CascadeOutcome::MissingData);
        };
        if self.states.get(market_id).is_some_and(|s| s.is_stale(timestamp)) {
            debug!(%market_id, %timestamp, "Cascade check skipped: already observed");
            return self.unevaluated(market_id, timestamp, metrics, CascadeOutcome::Duplicate);
        }

        let config = &self.config;
        let state = self
            .states
            .entry(market_id.clone())
            .or_insert_with(|| CascadeState::new(config.window_size));

        let phase = state.phase(config);
        let observations_seen = state.observations_seen();
        let (median_spread, median_depth) = state.baseline();

        let conditions = evaluate_conditions(
            config,
            spread,
            depth5,
            metrics.mid_change,
            metrics.vol24h,
            median_spread,
            median_depth,
        );

        let outcome = match phase {
            DetectorPhase::WarmingUp => CascadeOutcome::WarmingUp,
            DetectorPhase::Cooldown => CascadeOutcome::Cooldown,
            DetectorPhase::Ready if conditions.qualifies() => CascadeOutcome::Fired,
            DetectorPhase::Ready => CascadeOutcome::NoCascade,
        };

        let fired = outcome == CascadeOutcome::Fired;
        let trade = fired.then(|| {
            let direction = FadeDirection::from_mid_change(metrics.mid_change);
            FadeTrade {
                direction,
                entry: mid,
                stop: direction.stop_price(mid, config.stop_fraction),
                strength: f64::from(conditions.count()) / 3.0,
            }
        });

        state.commit(timestamp, spread, depth5, fired, config.cooldown_cycles);

        if let Some(trade) = &trade {
            info!(
                %market_id,
                direction = %trade.direction,
                entry = trade.entry,
                stop = trade.stop,
                reasons = %conditions.reasons(),
                spread,
                median_spread = ?median_spread,
                depth5,
                median_depth = ?median_depth,
                "Cascade detected"
            );
        } else if conditions.qualifies() {
            debug!(
                %market_id,
                %phase,
                reasons = %conditions.reasons(),
                "Cascade conditions met but suppressed"
            );
        } else {
            trace!(%market_id, %phase, %outcome, "No cascade");
        }

        CascadeSignal {
            market_id: market_id.clone(),
            timestamp,
            outcome,
            phase,
            observations_seen,
            conditions,
            spread: Some(spread),
            depth5: Some(depth5),
            mid: Some(mid),
            mid_change: metrics.mid_change,
            vol24h: metrics.vol24h,
            median_spread,
            median_depth,
            trade,
        }
    }

    /// Signal for an observation that was neither evaluated nor committed.
    fn unevaluated(
        &self,
        market_id: &MarketId,
        timestamp: DateTime<Utc>,
        metrics: &DerivedMetrics,
        outcome: CascadeOutcome,
    ) -> CascadeSignal {
        let (median_spread, median_depth) = self
            .states
            .get(market_id)
            .map(CascadeState::baseline)
            .unwrap_or((None, None));

        CascadeSignal {
            market_id: market_id.clone(),
            timestamp,
            outcome,
            phase: self.phase(market_id),
            observations_seen: self.observations_seen(market_id),
            conditions: CascadeConditions::default(),
            spread: metrics.spread,
            depth5: metrics.depth5,
            mid: metrics.mid,
            mid_change: metrics.mid_change,
            vol24h: metrics.vol24h,
            median_spread,
            median_depth,
            trade: None,
        }
    }

    /// Current phase of a market; `WarmingUp` if never observed.
    pub fn phase(&self, market_id: &MarketId) -> DetectorPhase {
        self.states
            .get(market_id)
            .map(|s| s.phase(&self.config))
            .unwrap_or(DetectorPhase::WarmingUp)
    }

    /// Observations committed for a market.
    pub fn observations_seen(&self, market_id: &MarketId) -> u64 {
        self.states
            .get(market_id)
            .map(CascadeState::observations_seen)
            .unwrap_or(0)
    }

    pub fn state(&self, market_id: &MarketId) -> Option<&CascadeState> {
        self.states.get(market_id)
    }

    /// Number of markets with committed history.
    pub fn tracked_markets(&self) -> usize {
        self.states.len()
    }
}

/// (spread, depth5, mid) when all three are defined.
fn complete_book(metrics: &DerivedMetrics) -> Option<(f64, f64, f64)> {
    Some((metrics.spread?, metrics.depth5?, metrics.mid?))
}

fn evaluate_conditions(
    config: &CascadeConfig,
    spread: f64,
    depth5: f64,
    mid_change: Option<f64>,
    vol24h: Option<f64>,
    median_spread: Option<f64>,
    median_depth: Option<f64>,
) -> CascadeConditions {
    let spread_expansion =
        median_spread.is_some_and(|median| median > 0.0 && spread >= config.spread_mult * median);

    let depth_collapse = median_depth
        .is_some_and(|median| median > 0.0 && depth5 <= config.depth_collapse_mult * median);

    // Unknown volume never counts as low volume.
    let mid_jump = mid_change.is_some_and(|delta| delta.abs() >= config.mid_jump_threshold)
        && vol24h.is_some_and(|vol| vol < config.low_volume_cap);

    CascadeConditions {
        spread_expansion,
        depth_collapse,
        mid_jump,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const CALM_SPREAD: f64 = 0.02;
    const CALM_DEPTH: f64 = 1_000.0;
    const LOW_VOL: f64 = 100_000.0;

    fn key() -> MarketId {
        MarketId::new("tok-cascade")
    }

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(i)
    }

    fn obs(spread: f64, depth5: f64, mid_change: f64, vol24h: Option<f64>) -> DerivedMetrics {
        DerivedMetrics {
            spread: Some(spread),
            depth5: Some(depth5),
            mid: Some(0.50 + mid_change),
            mid_change: Some(mid_change),
            vol24h,
            ..Default::default()
        }
    }

    fn calm() -> DerivedMetrics {
        obs(CALM_SPREAD, CALM_DEPTH, 0.0, Some(LOW_VOL))
    }

    fn cascade() -> DerivedMetrics {
        obs(0.05, 400.0, 0.03, Some(LOW_VOL))
    }

    fn small_config() -> CascadeConfig {
        CascadeConfig {
            window_size: 10,
            min_history: 3,
            cooldown_cycles: 5,
            ..Default::default()
        }
    }

    fn warmed(config: CascadeConfig) -> CascadeDetector {
        let mut detector = CascadeDetector::new(config).unwrap();
        let min_history = detector.config().min_history;
        for i in 0..min_history {
            let signal = detector.observe(&key(), t(i as i64), &calm());
            assert_eq!(signal.outcome, CascadeOutcome::WarmingUp);
        }
        assert_eq!(detector.phase(&key()), DetectorPhase::Ready);
        detector
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CascadeConfig {
            min_history: 0,
            ..Default::default()
        };
        assert!(CascadeDetector::new(config).is_err());
    }

    #[test]
    fn test_never_fires_while_warming_up() {
        let mut detector = CascadeDetector::new(CascadeConfig::default()).unwrap();
        let extremes = [
            obs(0.001, 1_000_000.0, 0.0, Some(LOW_VOL)),
            obs(0.90, 1.0, 0.40, Some(1.0)),
            obs(0.001, 1_000_000.0, -0.40, Some(1.0)),
        ];

        for i in 0..10 {
            let m = &extremes[i % extremes.len()];
            let signal = detector.observe(&key(), t(i as i64), m);
            assert_eq!(signal.outcome, CascadeOutcome::WarmingUp, "cycle {i}");
            assert_eq!(signal.phase, DetectorPhase::WarmingUp);
            assert!(signal.trade.is_none());
        }
        assert_eq!(detector.observations_seen(&key()), 10);
        assert_eq!(detector.phase(&key()), DetectorPhase::Ready);
    }

    #[test]
    fn test_fires_iff_two_of_three_conditions() {
        for mask in 0u8..8 {
            let spread_up = mask & 0b001 != 0;
            let depth_down = mask & 0b010 != 0;
            let jump = mask & 0b100 != 0;

            let mut detector = warmed(small_config());
            let m = obs(
                if spread_up { 0.05 } else { CALM_SPREAD },
                if depth_down { 400.0 } else { CALM_DEPTH },
                if jump { 0.03 } else { 0.0 },
                Some(LOW_VOL),
            );
            let signal = detector.observe(&key(), t(100), &m);

            assert_eq!(signal.conditions.spread_expansion, spread_up, "mask {mask:03b}");
            assert_eq!(signal.conditions.depth_collapse, depth_down, "mask {mask:03b}");
            assert_eq!(signal.conditions.mid_jump, jump, "mask {mask:03b}");

            let expected = (spread_up as u8 + depth_down as u8 + jump as u8) >= 2;
            assert_eq!(signal.is_fired(), expected, "mask {mask:03b}");
            if !expected {
                assert_eq!(signal.outcome, CascadeOutcome::NoCascade);
            }
        }
    }

    #[test]
    fn test_fired_signal_trade_reference() {
        let mut detector = warmed(small_config());
        let signal = detector.observe(&key(), t(50), &cascade());

        let trade = signal.trade.unwrap();
        assert_eq!(trade.direction, FadeDirection::FadeUp);
        assert!((trade.entry - 0.53).abs() < 1e-12);
        assert!((trade.stop - 0.53 * 1.05).abs() < 1e-12);
        assert_eq!(trade.strength, 1.0);
        assert_eq!(signal.median_spread, Some(CALM_SPREAD));
        assert_eq!(signal.median_depth, Some(CALM_DEPTH));
    }

    #[test]
    fn test_fade_down_on_drop() {
        let mut detector = warmed(small_config());
        let signal = detector.observe(&key(), t(50), &obs(0.05, 400.0, -0.03, Some(LOW_VOL)));
        let trade = signal.trade.unwrap();
        assert_eq!(trade.direction, FadeDirection::FadeDown);
        assert!((trade.stop - 0.47 * 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_cooldown_suppresses_refire() {
        let mut detector = warmed(CascadeConfig::default());
        let cooldown = detector.config().cooldown_cycles as usize;

        let first = detector.observe(&key(), t(100), &cascade());
        assert!(first.is_fired());

        for i in 0..cooldown {
            let signal = detector.observe(&key(), t(101 + i as i64), &cascade());
            assert_eq!(signal.outcome, CascadeOutcome::Cooldown, "cycle {i}");
            assert!(signal.conditions.qualifies());
        }

        // 10 calm + 6 cascade values: medians still sit on the calm side
        let again = detector.observe(&key(), t(200), &cascade());
        assert!(again.is_fired());
    }

    #[test]
    fn test_never_fires_twice_within_cooldown() {
        let mut detector = warmed(small_config());
        let cooldown = detector.config().cooldown_cycles as usize;
        let mut fired_at = Vec::new();

        for i in 0..60 {
            let m = if i % 2 == 0 { cascade() } else { calm() };
            if detector.observe(&key(), t(10 + i as i64), &m).is_fired() {
                fired_at.push(i);
            }
        }

        assert!(!fired_at.is_empty());
        for pair in fired_at.windows(2) {
            assert!(pair[1] - pair[0] > cooldown, "fires at {pair:?}");
        }
    }

    #[test]
    fn test_baseline_excludes_current_observation() {
        let mut detector = warmed(CascadeConfig {
            min_history: 1,
            ..small_config()
        });
        // With one calm value in the window, appending first would move the
        // medians to (0.03, 750) and neither condition would hold.
        let m = obs(2.0 * CALM_SPREAD, 500.0, 0.0, Some(LOW_VOL));
        let signal = detector.observe(&key(), t(30), &m);

        assert_eq!(signal.median_spread, Some(CALM_SPREAD));
        assert_eq!(signal.median_depth, Some(CALM_DEPTH));
        assert!(signal.conditions.spread_expansion);
        assert!(signal.conditions.depth_collapse);
        assert!(signal.is_fired());

        let state = detector.state(&key()).unwrap();
        assert_eq!(state.spreads().iter().last(), Some(2.0 * CALM_SPREAD));
    }

    #[test]
    fn test_missing_data_leaves_state_untouched() {
        let mut detector = warmed(small_config());
        let before = detector.observations_seen(&key());

        let mut m = cascade();
        m.spread = None;
        let signal = detector.observe(&key(), t(40), &m);

        assert_eq!(signal.outcome, CascadeOutcome::MissingData);
        assert_eq!(signal.conditions, CascadeConditions::default());
        assert_eq!(detector.observations_seen(&key()), before);

        // unknown market: no state is created
        let other = MarketId::new("tok-other");
        detector.observe(&other, t(41), &m);
        assert_eq!(detector.tracked_markets(), 1);
        assert_eq!(detector.phase(&other), DetectorPhase::WarmingUp);
    }

    #[test]
    fn test_missing_volume_disables_mid_jump() {
        let mut detector = warmed(small_config());
        let signal = detector.observe(&key(), t(40), &obs(0.05, CALM_DEPTH, 0.05, None));

        assert!(signal.conditions.spread_expansion);
        assert!(!signal.conditions.mid_jump);
        assert_eq!(signal.outcome, CascadeOutcome::NoCascade);
    }

    #[test]
    fn test_high_volume_disables_mid_jump() {
        let mut detector = warmed(small_config());
        let signal =
            detector.observe(&key(), t(40), &obs(0.05, CALM_DEPTH, 0.05, Some(1_000_000.0)));
        assert!(!signal.conditions.mid_jump);
        assert!(!signal.is_fired());
    }

    #[test]
    fn test_zero_baseline_never_triggers() {
        let mut detector = CascadeDetector::new(small_config()).unwrap();
        for i in 0..3 {
            detector.observe(&key(), t(i), &obs(0.0, 0.0, 0.0, Some(LOW_VOL)));
        }
        let signal = detector.observe(&key(), t(3), &obs(0.5, 0.0, 0.0, Some(LOW_VOL)));
        assert!(!signal.conditions.spread_expansion);
        assert!(!signal.conditions.depth_collapse);
    }

    #[test]
    fn test_markets_are_independent() {
        let mut detector = warmed(small_config());
        let other = MarketId::new("tok-2");

        let signal = detector.observe(&other, t(0), &cascade());
        assert_eq!(signal.outcome, CascadeOutcome::WarmingUp);
        assert_eq!(detector.phase(&key()), DetectorPhase::Ready);
        assert_eq!(detector.tracked_markets(), 2);
        assert_eq!(detector.observations_seen(&other), 1);
        assert_eq!(detector.observations_seen(&key()), 3);
    }

    #[test]
    fn test_repeated_timestamp_not_committed_twice() {
        let mut detector = warmed(small_config());
        let fired = detector.observe(&key(), t(50), &cascade());
        assert!(fired.is_fired());
        let seen = detector.observations_seen(&key());
        let cooldown = detector.state(&key()).unwrap().cooldown_remaining();

        // retrying the same cycle, or replaying an older one
        for ts in [t(50), t(49)] {
            let again = detector.observe(&key(), ts, &cascade());
            assert_eq!(again.outcome, CascadeOutcome::Duplicate);
            assert!(again.trade.is_none());
            assert!(!detector.record(&key(), ts, &calm()));
        }

        let state = detector.state(&key()).unwrap();
        assert_eq!(state.observations_seen(), seen);
        assert_eq!(state.cooldown_remaining(), cooldown);
        assert_eq!(state.last_timestamp(), Some(t(50)));

        let next = detector.observe(&key(), t(51), &cascade());
        assert_eq!(next.outcome, CascadeOutcome::Cooldown);
        assert_eq!(detector.observations_seen(&key()), seen + 1);
    }

    #[test]
    fn test_record_commits_without_evaluating() {
        let mut detector = CascadeDetector::new(small_config()).unwrap();
        for i in 0..3 {
            assert!(detector.record(&key(), t(i), &calm()));
        }
        assert_eq!(detector.observations_seen(&key()), 3);
        assert_eq!(detector.phase(&key()), DetectorPhase::Ready);

        // recorded history serves as the baseline for the next evaluation
        let signal = detector.observe(&key(), t(3), &cascade());
        assert_eq!(signal.median_spread, Some(CALM_SPREAD));
        assert!(signal.is_fired());

        // a recorded cycle still counts down the cooldown, and never fires
        assert!(detector.record(&key(), t(4), &cascade()));
        assert_eq!(
            detector.state(&key()).unwrap().cooldown_remaining(),
            detector.config().cooldown_cycles - 1
        );
    }

    #[test]
    fn test_record_skips_incomplete_book() {
        let mut detector = CascadeDetector::new(small_config()).unwrap();
        let mut m = calm();
        m.depth5 = None;
        assert!(!detector.record(&key(), t(0), &m));
        assert_eq!(detector.tracked_markets(), 0);
    }

    #[test]
    fn test_deterministic_replay() {
        let sequence: Vec<DerivedMetrics> = (0..80)
            .map(|i| match i % 7 {
                0 | 3 => cascade(),
                5 => obs(0.045, 900.0, -0.025, Some(LOW_VOL)),
                6 => obs(0.03, 500.0, 0.0, None),
                _ => calm(),
            })
            .collect();

        let run = || {
            let mut detector = CascadeDetector::new(small_config()).unwrap();
            sequence
                .iter()
                .enumerate()
                .map(|(i, m)| detector.observe(&key(), t(i as i64), m))
                .collect::<Vec<_>>()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert!(first.iter().any(CascadeSignal::is_fired));
    }
}
