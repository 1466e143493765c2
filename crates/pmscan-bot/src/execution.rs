//! Execution adapters.
//!
//! Only paper execution exists: a fired cascade becomes an `OrderIntent`
//! that is logged and kept in memory. Nothing leaves the process.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use pmscan_core::{MarketId, Price, Size};
use pmscan_detector::{CascadeSignal, FadeDirection};
use pmscan_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Fading an up move sells; fading a down move buys.
    pub fn for_fade(direction: FadeDirection) -> Self {
        match direction {
            FadeDirection::FadeUp => Self::Sell,
            FadeDirection::FadeDown => Self::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order that would be placed for a fired signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderIntent {
    pub intent_id: String,
    pub signal_id: String,
    pub market_id: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    pub stop: Price,
    pub created_at: DateTime<Utc>,
}

/// Receives fired cascade signals.
pub trait ExecutionAdapter {
    /// Handle one signal. Returns the intent created, if any.
    fn submit(
        &mut self,
        signal: &CascadeSignal,
        position_size: f64,
    ) -> AppResult<Option<OrderIntent>>;

    /// Intents created so far.
    fn intents(&self) -> &[OrderIntent];
}

/// Records intents without sending them anywhere.
pub struct PaperExecution {
    tactical_fraction: f64,
    intents: Vec<OrderIntent>,
}

impl PaperExecution {
    pub fn new(tactical_fraction: f64) -> Self {
        Self {
            tactical_fraction,
            intents: Vec::new(),
        }
    }
}

fn to_decimal(value: f64, dp: u32, what: &str) -> AppResult<Decimal> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(dp))
        .ok_or_else(|| AppError::Execution(format!("{what} ({value}) is not representable")))
}

impl ExecutionAdapter for PaperExecution {
    fn submit(
        &mut self,
        signal: &CascadeSignal,
        position_size: f64,
    ) -> AppResult<Option<OrderIntent>> {
        let Some(trade) = signal.trade else {
            return Ok(None);
        };

        let side = OrderSide::for_fade(trade.direction);
        let signal_id = signal.signal_id();
        let intent = OrderIntent {
            intent_id: format!("paper_{}", self.intents.len() + 1),
            signal_id,
            market_id: signal.market_id.clone(),
            side,
            price: Price::new(to_decimal(trade.entry, 4, "entry")?),
            size: Size::new(to_decimal(
                position_size * self.tactical_fraction,
                2,
                "size",
            )?),
            stop: Price::new(to_decimal(trade.stop, 4, "stop")?),
            created_at: signal.timestamp,
        };

        info!(
            intent_id = %intent.intent_id,
            signal_id = %intent.signal_id,
            market_id = %intent.market_id,
            side = %side,
            price = %intent.price,
            size = %intent.size,
            stop = %intent.stop,
            "Paper order intent"
        );
        Metrics::paper_intent(side.as_str());

        self.intents.push(intent.clone());
        Ok(Some(intent))
    }

    fn intents(&self) -> &[OrderIntent] {
        &self.intents
    }
}
