//! Core domain types for the prediction-market research pipeline.
//!
//! This crate provides the values every other stage consumes:
//! - `MarketId`: identifier of one tradable outcome book
//! - `Price`, `Size`: precision-safe wire values from the order book
//! - `MarketSnapshot`: one observation of one market at one timestamp
//! - `MetricExtractor`: derives spread, mid, depth and symmetry from a snapshot

pub mod decimal;
pub mod error;
pub mod market;
pub mod microstructure;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::MarketId;
pub use microstructure::{
    best_bid_ask, book_symmetry, side_depth, DepthSide, DerivedMetrics, ExtractorConfig,
    MetricExtractor, EPSILON,
};
pub use types::{total_notional, BookLevel, MarketSnapshot, OrderBook};
