//! Main application orchestration.
//!
//! Pulls cycles from the snapshot source, runs them through the pipeline,
//! records the results and, in paper mode, turns fired cascades into paper
//! order intents. Periodic and final run summaries go to the log.

use crate::config::{AppConfig, OperatingMode};
use crate::error::AppResult;
use crate::execution::{ExecutionAdapter, PaperExecution};
use crate::pipeline::{CycleReport, Pipeline};
use crate::records::{bot_score_record, signal_record, snapshot_record};
use crate::router::CycleTally;
use crate::source::{JsonLinesSource, SnapshotSource};
use pmscan_persistence::ResultStore;
use pmscan_telemetry::{Metrics, RunSummaryReporter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub struct Application {
    config: AppConfig,
    pipeline: Pipeline,
    source: Box<dyn SnapshotSource + Send>,
    store: Option<ResultStore>,
    /// Present in paper mode only.
    execution: Option<Box<dyn ExecutionAdapter + Send>>,
    summary: RunSummaryReporter,
    cycle: u64,
    totals: CycleTally,
    cancel: Arc<AtomicBool>,
}

impl Application {
    /// Create an application replaying `config.snapshots_path`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let source = JsonLinesSource::open(&config.snapshots_path)?;
        Self::with_source(config, Box::new(source))
    }

    /// Create an application reading from any snapshot source.
    pub fn with_source(
        config: AppConfig,
        source: Box<dyn SnapshotSource + Send>,
    ) -> AppResult<Self> {
        config.validate()?;
        let pipeline = Pipeline::from_config(&config)?;

        let store = if config.persistence.enabled {
            Some(ResultStore::open(&config.persistence)?)
        } else {
            info!("Result store disabled");
            None
        };

        let execution: Option<Box<dyn ExecutionAdapter + Send>> = match config.mode {
            OperatingMode::Observation => None,
            OperatingMode::Paper => Some(Box::new(PaperExecution::new(
                config.execution.tactical_fraction,
            ))),
        };

        Ok(Self {
            config,
            pipeline,
            source,
            store,
            execution,
            summary: RunSummaryReporter::new(),
            cycle: 0,
            totals: CycleTally::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Tallies accumulated over every cycle run so far.
    pub fn totals(&self) -> &CycleTally {
        &self.totals
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycle
    }

    /// Paper intents created so far; empty in observation mode.
    pub fn paper_intents(&self) -> usize {
        self.execution.as_ref().map_or(0, |e| e.intents().len())
    }

    /// Flag checked between markets. Setting it stops the run.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run one cycle. Returns `None` once the source is exhausted.
    pub fn step(&mut self) -> AppResult<Option<CycleTally>> {
        let Some(snapshots) = self.source.next_cycle()? else {
            return Ok(None);
        };

        self.cycle += 1;
        let report = self.pipeline.run_cycle(&snapshots, &self.cancel);
        self.record(&report)?;
        self.execute(&report)?;

        let tally = report.tally;
        self.totals.merge(&tally);

        info!(
            cycle = self.cycle,
            markets = snapshots.len(),
            processed = tally.processed,
            invalid = tally.invalid,
            cascade = tally.cascade_routed,
            informational = tally.informational_routed,
            failed_screening = tally.failed_screening,
            regime_mismatch = tally.regime_mismatch,
            fired = tally.fired,
            "Cycle complete"
        );
        Ok(Some(tally))
    }

    fn record(&mut self, report: &CycleReport) -> AppResult<()> {
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };

        for outcome in &report.outcomes {
            store.record_snapshot(snapshot_record(self.cycle, outcome))?;
            store.record_bot_score(bot_score_record(self.cycle, outcome))?;
            if let Some(signal) = signal_record(self.cycle, outcome) {
                store.record_signal(signal)?;
            }
        }
        Ok(())
    }

    fn execute(&mut self, report: &CycleReport) -> AppResult<()> {
        let Some(execution) = self.execution.as_mut() else {
            return Ok(());
        };

        let position_size = self.pipeline.position_size();
        for signal in report
            .outcomes
            .iter()
            .filter_map(|o| o.disposition.fired_signal())
        {
            execution.submit(signal, position_size)?;
        }
        Ok(())
    }

    /// Run until the source is exhausted or Ctrl-C.
    ///
    /// With `once`, stop after a single cycle. A failed cycle ends the run
    /// with its error, after the final summary and result flush.
    pub async fn run(mut self, once: bool) -> AppResult<()> {
        info!(
            mode = ?self.config.mode,
            cycle_interval_ms = self.config.cycle_interval_ms,
            once,
            "Starting application"
        );

        let shutdown = Arc::new(Notify::new());
        let signal_task = {
            let cancel = self.cancel.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutdown signal received");
                        cancel.store(true, Ordering::SeqCst);
                        shutdown.notify_one();
                    }
                    Err(e) => error!(?e, "Failed to listen for shutdown signal"),
                }
            })
        };

        let mut cycle_interval = interval(Duration::from_millis(self.config.cycle_interval_ms));
        cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let summary_period = Duration::from_secs(self.config.telemetry.summary_interval_secs);
        let mut summary_interval = interval_at(Instant::now() + summary_period, summary_period);

        let mut failure = None;
        loop {
            tokio::select! {
                _ = cycle_interval.tick() => {
                    match self.step() {
                        Ok(Some(_)) if once => break,
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            info!(cycles = self.cycle, "Snapshot source exhausted");
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, cycle = self.cycle, "Cycle failed, shutting down");
                            failure = Some(e);
                            break;
                        }
                    }
                    if self.cancel.load(Ordering::SeqCst) {
                        break;
                    }
                }

                _ = summary_interval.tick() => {
                    debug!("Outputting periodic run summary");
                    self.summary.output_summary();
                    if let Some(store) = self.store.as_mut() {
                        if let Err(e) = store.flush() {
                            warn!(error = %e, "Periodic result flush failed");
                        }
                    }
                }

                _ = shutdown.notified() => {
                    break;
                }
            }
        }

        signal_task.abort();
        let closed = self.shutdown();
        match failure {
            Some(e) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "Shutdown after failed cycle also failed");
                }
                Err(e)
            }
            None => closed,
        }
    }

    fn shutdown(mut self) -> AppResult<()> {
        info!(
            cycles = self.cycle,
            processed = self.totals.processed,
            fired = self.totals.fired,
            paper_intents = self.paper_intents(),
            "Shutting down"
        );

        info!("Final run summary:");
        self.summary.output_summary();

        if let Some(mut store) = self.store.take() {
            store.close()?;
        }

        if let Some(path) = &self.config.telemetry.metrics_path {
            Metrics::write_to(path)?;
            info!(path = %path.display(), "Metrics written");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::source::VecSource;
    use chrono::Utc;
    use pmscan_core::{BookLevel, MarketId, MarketSnapshot, OrderBook, Price, Size};
    use rust_decimal_macros::dec;

    fn config(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.persistence.output_dir = dir.path().to_path_buf();
        config.cycle_interval_ms = 1;
        config
    }

    #[test]
    fn test_step_returns_none_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app =
            Application::with_source(config(&dir), Box::new(VecSource::new(vec![vec![]])))
                .unwrap();

        let tally = app.step().unwrap().unwrap();
        assert_eq!(tally, CycleTally::default());
        assert!(app.step().unwrap().is_none());
        assert_eq!(app.cycles_run(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.cascade.min_history = 0;
        let result = Application::with_source(config, Box::new(VecSource::new(vec![])));
        assert!(result.is_err());
    }

    #[test]
    fn test_observation_mode_has_no_execution() {
        let dir = tempfile::tempdir().unwrap();
        let app = Application::with_source(config(&dir), Box::new(VecSource::new(vec![])))
            .unwrap();
        assert_eq!(app.paper_intents(), 0);
        assert!(app.execution.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_when_source_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let app = Application::with_source(
            config(&dir),
            Box::new(VecSource::new(vec![vec![], vec![]])),
        )
        .unwrap();
        app.run(false).await.unwrap();
    }

    struct FailingSource {
        served: bool,
    }

    impl SnapshotSource for FailingSource {
        fn next_cycle(&mut self) -> AppResult<Option<Vec<MarketSnapshot>>> {
            if std::mem::replace(&mut self.served, true) {
                return Err(AppError::Source("feed disconnected".to_string()));
            }
            let level = |price| BookLevel::new(Price::new(price), Size::new(dec!(20000)));
            Ok(Some(vec![MarketSnapshot::new(
                MarketId::new("tok-1"),
                Utc::now(),
                Some(dec!(5000)),
                OrderBook::new(vec![level(dec!(0.4995))], vec![level(dec!(0.5005))]),
            )]))
        }
    }

    #[tokio::test]
    async fn test_failed_cycle_still_shuts_down_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        let metrics_path = dir.path().join("metrics.prom");
        config.telemetry.metrics_path = Some(metrics_path.clone());

        let app =
            Application::with_source(config, Box::new(FailingSource { served: false })).unwrap();
        let err = app.run(false).await.unwrap_err();
        assert!(matches!(err, AppError::Source(_)));

        // rows from the completed cycle were flushed and metrics written
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let scores =
            std::fs::read_to_string(dir.path().join(format!("bot_scores_{today}.jsonl"))).unwrap();
        assert_eq!(scores.lines().count(), 1);
        assert!(metrics_path.exists());
    }
}
