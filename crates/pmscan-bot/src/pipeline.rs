//! Per-market pipeline: extract, screen, classify, route, detect.
//!
//! One snapshot runs start to finish before the next begins. The only state
//! carried across cycles is the previous mid per market and the cascade
//! detector's windows, which take every screened market's book whichever way
//! it routes.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::router::{CycleTally, ExclusionReason, Route, SignalRouter};
use chrono::{DateTime, Utc};
use pmscan_core::{DerivedMetrics, ExtractorConfig, MarketId, MarketSnapshot, MetricExtractor};
use pmscan_detector::{CascadeConfig, CascadeDetector, CascadeSignal};
use pmscan_regime::{classify, BotScoreResult};
use pmscan_screen::{ScreeningConfig, ScreeningEngine, ScreeningResult};
use pmscan_telemetry::Metrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a market ended up this cycle.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// Evaluated by the cascade detector.
    Cascade(CascadeSignal),
    /// Handed to the informational framework.
    Informational,
    Excluded(ExclusionReason),
}

impl Disposition {
    pub fn route(&self) -> Route {
        match self {
            Self::Cascade(_) => Route::Cascade,
            Self::Informational => Route::Informational,
            Self::Excluded(reason) => Route::Excluded(*reason),
        }
    }

    /// The detector signal, if it fired.
    pub fn fired_signal(&self) -> Option<&CascadeSignal> {
        match self {
            Self::Cascade(signal) if signal.is_fired() => Some(signal),
            _ => None,
        }
    }
}

/// Everything the pipeline produced for one market in one cycle.
#[derive(Debug, Clone)]
pub struct MarketOutcome {
    pub market_id: MarketId,
    pub slug: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metrics: DerivedMetrics,
    pub screening: ScreeningResult,
    pub bot_score: BotScoreResult,
    pub disposition: Disposition,
}

impl MarketOutcome {
    pub fn is_fired(&self) -> bool {
        self.disposition.fired_signal().is_some()
    }
}

/// Result of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<MarketOutcome>,
    pub tally: CycleTally,
    /// Cancellation stopped the cycle before every market ran.
    pub cancelled: bool,
}

pub struct Pipeline {
    extractor: MetricExtractor,
    engine: ScreeningEngine,
    detector: CascadeDetector,
    /// Mid of the previous valid snapshot per market.
    last_mid: HashMap<MarketId, f64>,
    max_markets_per_cycle: Option<usize>,
}

impl Pipeline {
    pub fn new(
        extractor: ExtractorConfig,
        screening: ScreeningConfig,
        cascade: CascadeConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            extractor: MetricExtractor::new(extractor),
            engine: ScreeningEngine::new(screening),
            detector: CascadeDetector::new(cascade)?,
            last_mid: HashMap::new(),
            max_markets_per_cycle: None,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let mut pipeline = Self::new(
            config.extractor.clone(),
            config.screening.clone(),
            config.cascade.clone(),
        )?;
        pipeline.max_markets_per_cycle = config.max_markets_per_cycle;
        Ok(pipeline)
    }

    pub fn detector(&self) -> &CascadeDetector {
        &self.detector
    }

    pub fn position_size(&self) -> f64 {
        self.engine.position_size()
    }

    /// Run one market through the pipeline.
    ///
    /// An invalid snapshot is rejected before any state changes.
    pub fn process(&mut self, snapshot: &MarketSnapshot) -> AppResult<MarketOutcome> {
        snapshot.validate()?;
        Metrics::snapshot_valid();

        let market_id = &snapshot.market_id;
        let prior_mid = self.last_mid.get(market_id).copied();
        let metrics = self.extractor.extract(snapshot, prior_mid);
        match metrics.mid {
            Some(mid) => {
                self.last_mid.insert(market_id.clone(), mid);
            }
            None => {
                self.last_mid.remove(market_id);
            }
        }

        let screening = self.engine.screen(&metrics);
        for family in [&screening.microstructure, &screening.informational] {
            if !family.eligible {
                Metrics::screen_rejected(family.family.as_str(), family.reason.as_str());
            }
        }
        if let Some(risk) = screening.microstructure.exit_risk {
            Metrics::exit_risk(risk);
        }

        let bot_score = classify(&metrics);
        Metrics::regime_classified(bot_score.regime.as_str(), bot_score.score);

        let route = SignalRouter::route(&screening, &bot_score);
        Metrics::routed(route.label());

        let disposition = match route {
            Route::Cascade => {
                let signal = self.detector.observe(market_id, snapshot.timestamp, &metrics);
                Metrics::cascade_outcome(signal.outcome.as_str());
                if let Some(trade) = &signal.trade {
                    Metrics::cascade_fired(
                        market_id.as_str(),
                        trade.direction.as_str(),
                        trade.strength,
                    );
                }
                Disposition::Cascade(signal)
            }
            Route::Informational => Disposition::Informational,
            Route::Excluded(reason) => Disposition::Excluded(reason),
        };
        if route != Route::Cascade && screening.any_eligible() {
            self.detector.record(market_id, snapshot.timestamp, &metrics);
        }

        debug!(
            %market_id,
            score = bot_score.score,
            regime = %bot_score.regime,
            a = %screening.microstructure.reason,
            h = %screening.informational.reason,
            route = route.label(),
            "Market processed"
        );

        Ok(MarketOutcome {
            market_id: market_id.clone(),
            slug: snapshot.slug.clone(),
            timestamp: snapshot.timestamp,
            metrics,
            screening,
            bot_score,
            disposition,
        })
    }

    /// Run every market of one cycle.
    ///
    /// `cancel` is checked between markets, never inside one.
    pub fn run_cycle(&mut self, snapshots: &[MarketSnapshot], cancel: &AtomicBool) -> CycleReport {
        let started = Instant::now();
        let limit = self.max_markets_per_cycle.unwrap_or(usize::MAX);
        if snapshots.len() > limit {
            warn!(
                markets = snapshots.len(),
                limit, "Cycle exceeds market limit, truncating"
            );
        }

        let mut report = CycleReport::default();
        for snapshot in snapshots.iter().take(limit) {
            if cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                info!(
                    processed = report.tally.processed,
                    "Cycle cancelled between markets"
                );
                break;
            }

            match self.process(snapshot) {
                Ok(outcome) => {
                    report
                        .tally
                        .record(outcome.disposition.route(), outcome.is_fired());
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(market_id = %snapshot.market_id, error = %e, "Snapshot rejected");
                    Metrics::snapshot_invalid();
                    report.tally.record_invalid();
                }
            }
        }

        Metrics::tracked_markets(self.detector.tracked_markets());
        Metrics::cycle_completed(started.elapsed().as_secs_f64() * 1000.0);
        report
    }
}
