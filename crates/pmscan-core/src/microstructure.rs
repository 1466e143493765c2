//! Microstructure metric extraction.
//!
//! Turns a raw `MarketSnapshot` into the quantities the screening, regime
//! and cascade stages consume. Everything here is pure.
//!
//! A missing book side yields `None` for every quantity that needs it.
//! Nothing is coerced to zero: a zero spread or zero depth would read as
//! "perfectly liquid" to the ratios downstream.

use crate::error::{CoreError, Result};
use crate::types::{total_notional, BookLevel, MarketSnapshot, OrderBook};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Floor applied to volume denominators (exit risk, PMWV, depth ratio).
pub const EPSILON: f64 = 1e-9;

/// Which book sides contribute to `depth5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthSide {
    /// Bid depth + ask depth.
    #[default]
    Both,
    Bid,
    Ask,
}

/// Metric extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Number of best levels per side summed into depth.
    #[serde(default = "default_depth_levels")]
    pub depth_levels: usize,
    /// Sides combined into `depth5`.
    #[serde(default)]
    pub depth_side: DepthSide,
}

fn default_depth_levels() -> usize {
    5
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            depth_levels: default_depth_levels(),
            depth_side: DepthSide::Both,
        }
    }
}

impl ExtractorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.depth_levels == 0 {
            return Err(CoreError::InvalidConfig(
                "depth_levels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Quantities derived from one snapshot (and the previous mid).
///
/// Recomputed every cycle; never stored across cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    /// (bid + ask) / 2; needs both sides.
    pub mid: Option<f64>,
    /// ask - bid; needs both sides.
    pub spread: Option<f64>,
    /// Notional over the best levels of the bid side.
    pub bid_depth: f64,
    /// Notional over the best levels of the ask side.
    pub ask_depth: f64,
    /// Combined depth notional. `None` when the book is empty.
    pub depth5: Option<f64>,
    /// (bid_depth - ask_depth) / (bid_depth + ask_depth), in [-1, 1].
    pub symmetry: Option<f64>,
    /// 24h traded notional as reported.
    pub vol24h: Option<f64>,
    /// Signed mid change since the previous snapshot of this market.
    pub mid_change: Option<f64>,
}

impl DerivedMetrics {
    /// Absolute mid movement since the previous snapshot; 0 without one.
    pub fn mid_move_abs(&self) -> f64 {
        self.mid_change.map(f64::abs).unwrap_or(0.0)
    }
}

/// Best bid and ask as floats; `None` for a side with no levels.
pub fn best_bid_ask(book: &OrderBook) -> (Option<f64>, Option<f64>) {
    (
        book.best_bid().map(|p| p.to_f64()),
        book.best_ask().map(|p| p.to_f64()),
    )
}

/// Notional summed over the first `k` entries of one side.
///
/// Exact in `Decimal` when the sum fits; otherwise summed in `f64`.
pub fn side_depth(levels: &[BookLevel], k: usize) -> f64 {
    let top = &levels[..k.min(levels.len())];
    match total_notional(top) {
        Some(total) => total.to_f64().unwrap_or(0.0),
        None => top
            .iter()
            .map(|l| l.price.to_f64() * l.size.inner().to_f64().unwrap_or(0.0))
            .sum(),
    }
}

/// Signed book balance: +1 all bids, -1 all asks, `None` when both are zero.
pub fn book_symmetry(bid_depth: f64, ask_depth: f64) -> Option<f64> {
    let total = bid_depth + ask_depth;
    if total <= 0.0 {
        return None;
    }
    Some(((bid_depth - ask_depth) / total).clamp(-1.0, 1.0))
}

/// Metric extractor.
#[derive(Debug, Clone, Default)]
pub struct MetricExtractor {
    config: ExtractorConfig,
}

impl MetricExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Derive metrics from a snapshot.
    ///
    /// `prior_mid` is the mid of this market's previous snapshot, if any.
    pub fn extract(&self, snapshot: &MarketSnapshot, prior_mid: Option<f64>) -> DerivedMetrics {
        let book = &snapshot.book;
        let (best_bid, best_ask) = best_bid_ask(book);

        let (mid, spread) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (Some((bid + ask) / 2.0), Some(ask - bid)),
            _ => (None, None),
        };

        let k = self.config.depth_levels;
        let bid_depth = side_depth(book.bids(), k);
        let ask_depth = side_depth(book.asks(), k);

        let depth5 = if book.is_empty() {
            None
        } else {
            Some(match self.config.depth_side {
                DepthSide::Both => bid_depth + ask_depth,
                DepthSide::Bid => bid_depth,
                DepthSide::Ask => ask_depth,
            })
        };

        let mid_change = match (mid, prior_mid) {
            (Some(now), Some(prev)) => Some(now - prev),
            _ => None,
        };

        DerivedMetrics {
            best_bid,
            best_ask,
            mid,
            spread,
            bid_depth,
            ask_depth,
            depth5,
            symmetry: book_symmetry(bid_depth, ask_depth),
            vol24h: snapshot.vol24h.and_then(|v| v.to_f64()),
            mid_change,
        }
    }
}
