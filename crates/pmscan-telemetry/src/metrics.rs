//! Prometheus metrics for the pmscan pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that must crash at
//! startup. These panics only occur during static initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_gauge, CounterVec, Encoder, Histogram, HistogramVec, IntCounter, IntGauge,
    TextEncoder,
};
use std::path::Path;

/// Snapshots processed.
/// Labels: outcome (valid/invalid)
pub static SNAPSHOTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_snapshots_total",
        "Market snapshots processed",
        &["outcome"]
    )
    .unwrap()
});

/// Completed cycles.
pub static CYCLES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("pmscan_cycles_total", "Completed pipeline cycles").unwrap()
});

/// Wall time of one cycle.
pub static CYCLE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pmscan_cycle_duration_ms",
        "Pipeline cycle duration in milliseconds",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Regime classifications.
/// Labels: regime (BOT/HUMAN/MIXED)
pub static REGIME_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_regime_total",
        "Markets classified per regime",
        &["regime"]
    )
    .unwrap()
});

/// BotScore distribution.
pub static BOT_SCORE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pmscan_bot_score",
        "BotScore distribution",
        vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.65, 0.7, 0.8, 0.9, 1.0]
    )
    .unwrap()
});

/// Screening rejections.
/// Labels: family (A/H), reason
pub static SCREEN_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_screen_rejected_total",
        "Markets failing a family screen",
        &["family", "reason"]
    )
    .unwrap()
});

/// Exit risk at the configured position size.
pub static EXIT_RISK: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pmscan_exit_risk",
        "Position size over 24h volume",
        vec![1e-6, 1e-5, 1e-4, 1e-3, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0]
    )
    .unwrap()
});

/// Router decisions.
/// Labels: route (cascade/informational/failed_screening/regime_mismatch)
pub static ROUTES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("pmscan_routes_total", "Router decisions", &["route"]).unwrap()
});

/// Cascade detector outcomes.
/// Labels: outcome (FIRED/NO_CASCADE/WARMING_UP/COOLDOWN/MISSING_DATA)
pub static CASCADE_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_cascade_outcomes_total",
        "Cascade detector outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Cascade fires.
/// Labels: market_id, direction
pub static CASCADE_FIRED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_cascade_fired_total",
        "Cascade signals fired",
        &["market_id", "direction"]
    )
    .unwrap()
});

/// Condition count at fire time.
/// Labels: direction
pub static CASCADE_STRENGTH: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pmscan_cascade_strength",
        "Fraction of cascade conditions held at fire time",
        &["direction"],
        vec![0.5, 0.7, 1.0]
    )
    .unwrap()
});

/// Markets with cascade history.
pub static TRACKED_MARKETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmscan_tracked_markets",
        "Markets with cascade detector state"
    )
    .unwrap()
});

/// Paper order intents recorded.
/// Labels: side
pub static PAPER_INTENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmscan_paper_intents_total",
        "Paper order intents recorded",
        &["side"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn snapshot_valid() {
        SNAPSHOTS_TOTAL.with_label_values(&["valid"]).inc();
    }

    pub fn snapshot_invalid() {
        SNAPSHOTS_TOTAL.with_label_values(&["invalid"]).inc();
    }

    /// Record a completed cycle and its duration.
    pub fn cycle_completed(duration_ms: f64) {
        CYCLES_TOTAL.inc();
        CYCLE_DURATION_MS.observe(duration_ms);
    }

    /// Record a regime classification.
    pub fn regime_classified(regime: &str, score: f64) {
        REGIME_TOTAL.with_label_values(&[regime]).inc();
        BOT_SCORE.observe(score);
    }

    pub fn screen_rejected(family: &str, reason: &str) {
        SCREEN_REJECTED_TOTAL
            .with_label_values(&[family, reason])
            .inc();
    }

    pub fn exit_risk(risk: f64) {
        EXIT_RISK.observe(risk);
    }

    pub fn routed(route: &str) {
        ROUTES_TOTAL.with_label_values(&[route]).inc();
    }

    pub fn cascade_outcome(outcome: &str) {
        CASCADE_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a fired cascade signal.
    pub fn cascade_fired(market_id: &str, direction: &str, strength: f64) {
        CASCADE_FIRED_TOTAL
            .with_label_values(&[market_id, direction])
            .inc();
        CASCADE_STRENGTH
            .with_label_values(&[direction])
            .observe(strength);
    }

    pub fn tracked_markets(count: usize) {
        TRACKED_MARKETS.set(count as i64);
    }

    pub fn paper_intent(side: &str) {
        PAPER_INTENTS_TOTAL.with_label_values(&[side]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write the text exposition to a file, replacing it.
    pub fn write_to(path: impl AsRef<Path>) -> TelemetryResult<()> {
        let rendered = Self::render()?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_counter_increments() {
        let before = REGIME_TOTAL.with_label_values(&["MIXED"]).get();
        Metrics::regime_classified("MIXED", 0.47);
        let after = REGIME_TOTAL.with_label_values(&["MIXED"]).get();
        assert_eq!(after - before, 1.0);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        Metrics::screen_rejected("A", "DEPTH_TOO_LOW");
        Metrics::cascade_outcome("NO_CASCADE");

        let text = Metrics::render().unwrap();
        assert!(text.contains("pmscan_screen_rejected_total"));
        assert!(text.contains("reason=\"DEPTH_TOO_LOW\""));
        assert!(text.contains("pmscan_cascade_outcomes_total"));
    }

    #[test]
    fn test_write_to_file() {
        Metrics::tracked_markets(3);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("metrics.prom");

        Metrics::write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("pmscan_tracked_markets"));
    }
}
