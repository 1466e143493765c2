//! Capital-aware screening for prediction markets.
//!
//! Decides, per snapshot, whether a market can absorb the configured
//! position size for each strategy family:
//! - A*: microstructure strategies, strict depth and volume multiples
//! - H*: informational strategies, looser multiples
//!
//! Exit risk (`position_size / vol24h`) caps how much of a day's volume the
//! position would represent on exit.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{FamilyConfig, ScreeningConfig};
pub use engine::{
    FamilyScreen, FamilyThresholds, ScreenReason, ScreeningEngine, ScreeningResult,
    StrategyFamily,
};
pub use error::{ScreenError, ScreenResult};
