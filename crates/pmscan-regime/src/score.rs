//! BotScore computation.
//!
//! Four components, each in [0, 1], higher meaning more mechanical:
//!
//! - pmwv: `|Δmid| / vol24h`, log-compressed (price moves on little volume)
//! - spread: tight continuous quoting
//! - depth: `depth5 / vol24h`, log-compressed
//! - stability: spread bucketed into steps
//!
//! An undefined spread scores as the most human-like extreme. Missing
//! volume falls back to the ε floor like zero volume does.

use crate::regime::Regime;
use pmscan_core::{DerivedMetrics, EPSILON};
use serde::{Deserialize, Serialize};
use tracing::trace;

const W_PMWV: f64 = 0.30;
const W_SPREAD: f64 = 0.25;
const W_DEPTH: f64 = 0.25;
const W_STABILITY: f64 = 0.20;

/// Stability score for an unquoted market.
const STABILITY_FLOOR: f64 = 0.2;

/// Per-component breakdown of a BotScore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BotScoreComponents {
    /// Raw price movement per unit volume.
    pub pmwv: f64,
    pub pmwv_score: f64,
    pub spread_score: f64,
    pub depth_score: f64,
    pub stability_score: f64,
}

impl BotScoreComponents {
    /// Weighted composite, clamped to [0, 1].
    pub fn composite(&self) -> f64 {
        let score = W_PMWV * self.pmwv_score
            + W_SPREAD * self.spread_score
            + W_DEPTH * self.depth_score
            + W_STABILITY * self.stability_score;
        score.clamp(0.0, 1.0)
    }
}

/// Result of classifying one market for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotScoreResult {
    pub score: f64,
    pub regime: Regime,
    pub components: BotScoreComponents,
}

/// Price movement per unit volume.
pub fn pmwv(mid_move_abs: f64, vol24h: Option<f64>) -> f64 {
    mid_move_abs / vol24h.unwrap_or(0.0).max(EPSILON)
}

/// `min(1, ln(1 + pmwv·10⁴) / ln(10001))`.
pub fn pmwv_score(pmwv: f64) -> f64 {
    ((1.0 + pmwv * 1e4).ln() / 10_001f64.ln()).clamp(0.0, 1.0)
}

/// `1 / (1 + spread·100)`; 0 when the spread is undefined.
pub fn spread_score(spread: Option<f64>) -> f64 {
    match spread {
        Some(spread) => (1.0 / (1.0 + spread.max(0.0) * 100.0)).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// `ln(1 + depth5 / max(vol24h, ε)) / ln(11)`, clamped; 0 when depth is undefined.
pub fn depth_score(depth5: Option<f64>, vol24h: Option<f64>) -> f64 {
    match depth5 {
        Some(depth5) => {
            let ratio = depth5.max(0.0) / vol24h.unwrap_or(0.0).max(EPSILON);
            ((1.0 + ratio).ln() / 11f64.ln()).clamp(0.0, 1.0)
        }
        None => 0.0,
    }
}

/// Step function of spread.
pub fn stability_score(spread: Option<f64>) -> f64 {
    match spread {
        Some(s) if s < 0.002 => 1.0,
        Some(s) if s < 0.01 => 0.7,
        Some(s) if s < 0.05 => 0.4,
        _ => STABILITY_FLOOR,
    }
}

/// Score one market's metrics and bucket the result.
pub fn classify(metrics: &DerivedMetrics) -> BotScoreResult {
    let pmwv = pmwv(metrics.mid_move_abs(), metrics.vol24h);
    let components = BotScoreComponents {
        pmwv,
        pmwv_score: pmwv_score(pmwv),
        spread_score: spread_score(metrics.spread),
        depth_score: depth_score(metrics.depth5, metrics.vol24h),
        stability_score: stability_score(metrics.spread),
    };

    let score = components.composite();
    let regime = Regime::from_score(score);

    trace!(
        score,
        %regime,
        pmwv_score = components.pmwv_score,
        spread_score = components.spread_score,
        depth_score = components.depth_score,
        stability_score = components.stability_score,
        "BotScore computed"
    );

    BotScoreResult {
        score,
        regime,
        components,
    }
}
