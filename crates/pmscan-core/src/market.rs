//! Market identification.
//!
//! A prediction market lists one order book per outcome token. The pipeline
//! tracks state per book, so the identifier is the outcome token id as the
//! data provider reports it (e.g. a CLOB token id).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of one outcome book.
///
/// This is the key for all per-market state in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MarketId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidMarketId("empty identifier".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for MarketId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id: MarketId = "  7123  ".parse().unwrap();
        assert_eq!(id.as_str(), "7123");
        assert_eq!(id.to_string(), "7123");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("   ".parse::<MarketId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = MarketId::new("tok-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tok-1\"");
    }
}
