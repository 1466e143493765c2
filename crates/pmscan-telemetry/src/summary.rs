//! End-of-run summary.
//!
//! Reads the pipeline counters and reports what changed since the reporter
//! was created:
//! - snapshots processed / rejected
//! - regime mix
//! - router decisions
//! - cascade fires

use crate::metrics::{
    CASCADE_OUTCOMES_TOTAL, CYCLES_TOTAL, PAPER_INTENTS_TOTAL, REGIME_TOTAL, ROUTES_TOTAL,
    SNAPSHOTS_TOTAL,
};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::CounterVec;
use serde::Serialize;
use tracing::info;

/// Counter totals over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub snapshots_valid: u64,
    pub snapshots_invalid: u64,
    pub regime_bot: u64,
    pub regime_human: u64,
    pub regime_mixed: u64,
    pub routed_cascade: u64,
    pub routed_informational: u64,
    pub failed_screening: u64,
    pub regime_mismatch: u64,
    pub cascades_fired: u64,
    pub paper_intents: u64,
}

/// Builds `RunSummary` values relative to a starting point.
pub struct RunSummaryReporter {
    baseline: RunSummary,
}

impl RunSummaryReporter {
    /// Snapshot the current counters as the run's starting point.
    pub fn new() -> Self {
        Self {
            baseline: Self::read_counters(Utc::now()),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.baseline.started_at
    }

    /// Totals accumulated since `new`.
    pub fn summary(&self) -> RunSummary {
        let now = Self::read_counters(self.baseline.started_at);
        let b = &self.baseline;
        RunSummary {
            started_at: b.started_at,
            cycles: now.cycles - b.cycles,
            snapshots_valid: now.snapshots_valid - b.snapshots_valid,
            snapshots_invalid: now.snapshots_invalid - b.snapshots_invalid,
            regime_bot: now.regime_bot - b.regime_bot,
            regime_human: now.regime_human - b.regime_human,
            regime_mixed: now.regime_mixed - b.regime_mixed,
            routed_cascade: now.routed_cascade - b.routed_cascade,
            routed_informational: now.routed_informational - b.routed_informational,
            failed_screening: now.failed_screening - b.failed_screening,
            regime_mismatch: now.regime_mismatch - b.regime_mismatch,
            cascades_fired: now.cascades_fired - b.cascades_fired,
            paper_intents: now.paper_intents - b.paper_intents,
        }
    }

    fn read_counters(started_at: DateTime<Utc>) -> RunSummary {
        RunSummary {
            started_at,
            cycles: CYCLES_TOTAL.get(),
            snapshots_valid: counter(&SNAPSHOTS_TOTAL, "valid"),
            snapshots_invalid: counter(&SNAPSHOTS_TOTAL, "invalid"),
            regime_bot: counter(&REGIME_TOTAL, "BOT"),
            regime_human: counter(&REGIME_TOTAL, "HUMAN"),
            regime_mixed: counter(&REGIME_TOTAL, "MIXED"),
            routed_cascade: counter(&ROUTES_TOTAL, "cascade"),
            routed_informational: counter(&ROUTES_TOTAL, "informational"),
            failed_screening: counter(&ROUTES_TOTAL, "failed_screening"),
            regime_mismatch: counter(&ROUTES_TOTAL, "regime_mismatch"),
            cascades_fired: counter(&CASCADE_OUTCOMES_TOTAL, "FIRED"),
            paper_intents: sum_all(&PAPER_INTENTS_TOTAL),
        }
    }

    /// Log the summary.
    pub fn output_summary(&self) {
        let s = self.summary();
        let elapsed = Utc::now() - s.started_at;

        info!("========== Run Summary ==========");
        info!(
            "Period: {} ({} minutes {} seconds)",
            s.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            elapsed.num_minutes(),
            elapsed.num_seconds() % 60
        );
        info!(
            "  Cycles: {}, snapshots: {} valid / {} invalid",
            s.cycles, s.snapshots_valid, s.snapshots_invalid
        );
        info!(
            "  Regimes: BOT={} HUMAN={} MIXED={}",
            s.regime_bot, s.regime_human, s.regime_mixed
        );
        info!(
            "  Routes: cascade={} informational={} failed_screening={} regime_mismatch={}",
            s.routed_cascade, s.routed_informational, s.failed_screening, s.regime_mismatch
        );
        info!(
            "  Cascades fired: {}, paper intents: {}",
            s.cascades_fired, s.paper_intents
        );
        info!("=================================");
    }
}

impl Default for RunSummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(vec: &CounterVec, label: &str) -> u64 {
    vec.with_label_values(&[label]).get() as u64
}

/// Sum a counter across every label set it has seen.
fn sum_all(vec: &CounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}
