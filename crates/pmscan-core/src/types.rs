//! Snapshot data types.
//!
//! Contains the order book representation and `MarketSnapshot`, the single
//! input value the pipeline receives per market per cycle.

use crate::error::{CoreError, Result};
use crate::{MarketId, Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }

    /// Notional value of this level (price * size). `None` on overflow.
    pub fn notional(&self) -> Option<Decimal> {
        self.size.notional(self.price)
    }
}

/// Notional summed over `levels`. `None` if the sum leaves the `Decimal` range.
pub fn total_notional(levels: &[BookLevel]) -> Option<Decimal> {
    levels
        .iter()
        .try_fold(Decimal::ZERO, |acc, level| acc.checked_add(level.notional()?))
}

/// Wire shape of a book: levels in whatever order the provider sent them.
#[derive(Debug, Clone, Default, Deserialize)]
struct BookSides {
    #[serde(default)]
    bids: Vec<BookLevel>,
    #[serde(default)]
    asks: Vec<BookLevel>,
}

/// Order book with levels normalized best-first.
///
/// Bids are sorted by descending price, asks by ascending price, and
/// empty levels are dropped. Providers do not agree on level ordering, so
/// normalization happens once at construction and deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookSides")]
pub struct OrderBook {
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
}

impl From<BookSides> for OrderBook {
    fn from(sides: BookSides) -> Self {
        Self::new(sides.bids, sides.asks)
    }
}

impl OrderBook {
    pub fn new(mut bids: Vec<BookLevel>, mut asks: Vec<BookLevel>) -> Self {
        bids.retain(|l| !l.size.is_zero());
        asks.retain(|l| !l.size.is_zero());
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self { bids, asks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Bid levels, best (highest) first.
    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    /// Ask levels, best (lowest) first.
    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// True when neither side has any level.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// One observation of one market at one timestamp.
///
/// Produced by the data provider once per market per cycle and immutable
/// afterwards. Derived quantities (spread, mid, depth) are computed by the
/// `MetricExtractor`, not stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Outcome book identifier.
    pub market_id: MarketId,
    /// Human-readable market slug, if the provider supplied one.
    #[serde(default)]
    pub slug: Option<String>,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Traded notional over the last 24 hours. `None` when the provider
    /// did not report it.
    #[serde(default)]
    pub vol24h: Option<Decimal>,
    /// Raw order book levels.
    #[serde(default)]
    pub book: OrderBook,
}

impl MarketSnapshot {
    pub fn new(
        market_id: MarketId,
        timestamp: DateTime<Utc>,
        vol24h: Option<Decimal>,
        book: OrderBook,
    ) -> Self {
        Self {
            market_id,
            slug: None,
            timestamp,
            vol24h,
            book,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Decode a snapshot from one JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Check snapshot invariants.
    ///
    /// - market id is non-empty
    /// - `vol24h >= 0` when present
    /// - no negative prices or sizes
    /// - `best_bid <= best_ask` when both sides exist
    pub fn validate(&self) -> Result<()> {
        if self.market_id.is_empty() {
            return Err(self.invalid("empty market id"));
        }

        if let Some(vol) = self.vol24h {
            if vol.is_sign_negative() && !vol.is_zero() {
                return Err(self.invalid(format!("negative vol24h ({vol})")));
            }
        }

        let levels = self.book.bids().iter().chain(self.book.asks());
        for level in levels {
            if level.price.is_negative() || level.size.is_negative() {
                return Err(self.invalid(format!(
                    "negative level (price={}, size={})",
                    level.price, level.size
                )));
            }
        }

        if let (Some(bid), Some(ask)) = (self.book.best_bid(), self.book.best_ask()) {
            if bid > ask {
                return Err(self.invalid(format!("crossed book (bid={bid} > ask={ask})")));
            }
        }

        // Non-negative levels: a side whose full notional fits cannot
        // overflow over any prefix either.
        for (side, levels) in [("bid", self.book.bids()), ("ask", self.book.asks())] {
            if total_notional(levels).is_none() {
                return Err(self.invalid(format!("{side} notional out of range")));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> CoreError {
        CoreError::InvalidSnapshot {
            market: self.market_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel::new(Price::new(price), Size::new(size))
    }

    fn snapshot(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> MarketSnapshot {
        MarketSnapshot::new(
            MarketId::new("tok-1"),
            Utc::now(),
            Some(dec!(50000)),
            OrderBook::new(bids, asks),
        )
    }

    #[test]
    fn test_book_normalizes_order() {
        let book = OrderBook::new(
            vec![level(dec!(0.40), dec!(10)), level(dec!(0.45), dec!(5))],
            vec![level(dec!(0.55), dec!(10)), level(dec!(0.50), dec!(5))],
        );

        assert_eq!(book.best_bid(), Some(Price::new(dec!(0.45))));
        assert_eq!(book.best_ask(), Some(Price::new(dec!(0.50))));
    }

    #[test]
    fn test_book_drops_empty_levels() {
        let book = OrderBook::new(vec![level(dec!(0.48), dec!(0))], vec![]);
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_validate_accepts_locked_book() {
        let snap = snapshot(
            vec![level(dec!(0.50), dec!(10))],
            vec![level(dec!(0.50), dec!(10))],
        );
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_crossed_book() {
        let snap = snapshot(
            vec![level(dec!(0.52), dec!(10))],
            vec![level(dec!(0.50), dec!(10))],
        );
        let err = snap.validate().unwrap_err();
        assert!(err.to_string().contains("crossed book"));
    }

    #[test]
    fn test_validate_rejects_negative_volume() {
        let mut snap = snapshot(vec![], vec![]);
        snap.vol24h = Some(dec!(-1));
        assert!(snap.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_size() {
        let snap = snapshot(vec![level(dec!(0.40), dec!(-3))], vec![]);
        assert!(snap.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_notional_overflow() {
        let huge = Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000_000, 0);
        let bids = (1..=4).map(|i| level(Decimal::new(40 + i, 2), huge)).collect();
        let snap = snapshot(bids, vec![level(dec!(0.50), dec!(10))]);

        let err = snap.validate().unwrap_err();
        assert!(err.to_string().contains("bid notional out of range"));
    }

    #[test]
    fn test_total_notional() {
        let levels = [level(dec!(0.40), dec!(10)), level(dec!(0.50), dec!(2))];
        assert_eq!(total_notional(&levels), Some(dec!(5)));
        assert_eq!(total_notional(&[]), Some(Decimal::ZERO));
        assert_eq!(total_notional(&[level(dec!(2), Decimal::MAX)]), None);
    }

    #[test]
    fn test_deserialize_normalizes_book() {
        let raw = r#"{
            "market_id": "tok-9",
            "timestamp": "2025-01-01T00:00:00Z",
            "vol24h": "1200.5",
            "book": {
                "bids": [{"price": "0.30", "size": "100"}, {"price": "0.35", "size": "50"}],
                "asks": [{"price": "0.41", "size": "20"}]
            }
        }"#;

        let snap = MarketSnapshot::from_json(raw).unwrap();
        assert_eq!(snap.market_id.as_str(), "tok-9");
        assert_eq!(snap.vol24h, Some(dec!(1200.5)));
        assert_eq!(snap.book.best_bid(), Some(Price::new(dec!(0.35))));
        assert!(snap.slug.is_none());
    }

    #[test]
    fn test_deserialize_missing_book() {
        let raw = r#"{"market_id": "tok-2", "timestamp": "2025-01-01T00:00:00Z"}"#;
        let snap = MarketSnapshot::from_json(raw).unwrap();
        assert!(snap.book.is_empty());
        assert!(snap.vol24h.is_none());
    }
}
