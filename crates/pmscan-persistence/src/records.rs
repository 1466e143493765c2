//! Row types written by the result store.
//!
//! Rows are flat and use plain strings and floats so they load directly
//! into a dataframe.

use serde::{Deserialize, Serialize};

/// One market observation: derived metrics plus screening outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp_ms: i64,
    pub cycle: u64,
    pub market_id: String,
    pub slug: Option<String>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub mid: Option<f64>,
    pub spread: Option<f64>,
    pub depth5: Option<f64>,
    pub symmetry: Option<f64>,
    pub vol24h: Option<f64>,
    pub position_size: f64,
    pub exit_risk: Option<f64>,
    pub eligible_a: bool,
    pub reason_a: String,
    pub eligible_h: bool,
    pub reason_h: String,
}

/// BotScore and its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotScoreRecord {
    pub timestamp_ms: i64,
    pub cycle: u64,
    pub market_id: String,
    pub score: f64,
    pub regime: String,
    pub pmwv: f64,
    pub pmwv_score: f64,
    pub spread_score: f64,
    pub depth_score: f64,
    pub stability_score: f64,
}

/// Strategy signal: a fired A2 cascade or an H1 candidate hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp_ms: i64,
    pub cycle: u64,
    pub market_id: String,
    /// `A2` or `H1`.
    pub strategy: String,
    pub signal_id: String,
    pub regime: String,
    pub bot_score: f64,
    pub direction: Option<String>,
    pub entry: Option<f64>,
    pub stop: Option<f64>,
    pub strength: Option<f64>,
    /// Condition codes that held, comma separated.
    #[serde(default)]
    pub reasons: String,
}

impl SignalRecord {
    pub fn is_cascade(&self) -> bool {
        self.strategy == "A2"
    }
}
