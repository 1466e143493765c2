//! Regime labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or above this are `Bot`.
pub const BOT_THRESHOLD: f64 = 0.65;
/// Scores at or below this are `Human`.
pub const HUMAN_THRESHOLD: f64 = 0.40;

/// Who appears to drive a market's trading.
///
/// Matched exhaustively by the router; a new variant must be handled there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Bot,
    Human,
    Mixed,
}

impl Regime {
    /// Bucket a BotScore.
    pub fn from_score(score: f64) -> Self {
        if score >= BOT_THRESHOLD {
            Self::Bot
        } else if score <= HUMAN_THRESHOLD {
            Self::Human
        } else {
            Self::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "BOT",
            Self::Human => "HUMAN",
            Self::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
