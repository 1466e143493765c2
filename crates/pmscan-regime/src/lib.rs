//! Regime classification for prediction markets.
//!
//! Scores how automation-driven a market looks from one cycle's metrics and
//! buckets the score into a `Regime`. Stateless: nothing is carried between
//! cycles.

pub mod regime;
pub mod score;

pub use regime::{Regime, BOT_THRESHOLD, HUMAN_THRESHOLD};
pub use score::{
    classify, depth_score, pmwv, pmwv_score, spread_score, stability_score, BotScoreComponents,
    BotScoreResult,
};
