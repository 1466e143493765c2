//! Liquidity-cascade detection for prediction markets.
//!
//! Watches each market's spread and depth against a rolling median baseline
//! and fires a fade signal when the book shows at least two of:
//! - spread expansion
//! - depth collapse
//! - a mid jump on low volume
//!
//! State is per market, owned by the `CascadeDetector`, and updated as one
//! unit per observation.

pub mod config;
pub mod detector;
pub mod error;
pub mod signal;
pub mod state;
pub mod window;

pub use config::CascadeConfig;
pub use detector::CascadeDetector;
pub use error::{DetectorError, DetectorResult};
pub use signal::{CascadeConditions, CascadeOutcome, CascadeSignal, FadeDirection, FadeTrade};
pub use state::{CascadeState, DetectorPhase};
pub use window::RollingWindow;
