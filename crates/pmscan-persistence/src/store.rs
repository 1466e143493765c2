//! Result store: one JSON Lines stream per record type.

use crate::error::PersistenceResult;
use crate::records::{BotScoreRecord, SignalRecord, SnapshotRecord};
use crate::writer::JsonLinesWriter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Result store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Write results at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Output directory for the `.jsonl` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Records buffered per stream before a flush.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Also write `snapshots_*` rows (the largest stream).
    #[serde(default = "default_enabled")]
    pub record_snapshots: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_buffer_size() -> usize {
    100
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            output_dir: default_output_dir(),
            buffer_size: default_buffer_size(),
            record_snapshots: default_enabled(),
        }
    }
}

/// Writes cycle outputs as rows.
pub struct ResultStore {
    snapshots: Option<JsonLinesWriter<SnapshotRecord>>,
    bot_scores: JsonLinesWriter<BotScoreRecord>,
    signals: JsonLinesWriter<SignalRecord>,
}

impl ResultStore {
    /// Open the store under `config.output_dir`.
    pub fn open(config: &PersistenceConfig) -> PersistenceResult<Self> {
        let dir = &config.output_dir;
        let snapshots = if config.record_snapshots {
            Some(JsonLinesWriter::new(dir, "snapshots", config.buffer_size)?)
        } else {
            None
        };

        info!(dir = %dir.display(), record_snapshots = config.record_snapshots, "Result store opened");

        Ok(Self {
            snapshots,
            bot_scores: JsonLinesWriter::new(dir, "bot_scores", config.buffer_size)?,
            signals: JsonLinesWriter::new(dir, "signals", config.buffer_size)?,
        })
    }

    pub fn record_snapshot(&mut self, record: SnapshotRecord) -> PersistenceResult<()> {
        match self.snapshots.as_mut() {
            Some(writer) => writer.add_record(record),
            None => Ok(()),
        }
    }

    pub fn record_bot_score(&mut self, record: BotScoreRecord) -> PersistenceResult<()> {
        self.bot_scores.add_record(record)
    }

    pub fn record_signal(&mut self, record: SignalRecord) -> PersistenceResult<()> {
        self.signals.add_record(record)
    }

    /// Flush every stream.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if let Some(writer) = self.snapshots.as_mut() {
            writer.flush()?;
        }
        self.bot_scores.flush()?;
        self.signals.flush()
    }

    pub fn close(&mut self) -> PersistenceResult<()> {
        if let Some(writer) = self.snapshots.as_mut() {
            writer.close()?;
        }
        self.bot_scores.close()?;
        self.signals.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn config(dir: &TempDir, record_snapshots: bool) -> PersistenceConfig {
        PersistenceConfig {
            output_dir: dir.path().to_path_buf(),
            record_snapshots,
            ..Default::default()
        }
    }

    fn signal() -> SignalRecord {
        SignalRecord {
            timestamp_ms: 1_740_787_200_000,
            cycle: 12,
            market_id: "tok-1".to_string(),
            strategy: "A2".to_string(),
            signal_id: "a2_tok-1_1740787200000".to_string(),
            regime: "MIXED".to_string(),
            bot_score: 0.52,
            direction: Some("FADE_UP".to_string()),
            entry: Some(0.53),
            stop: Some(0.5565),
            strength: Some(1.0),
            reasons: "SPREAD_EXPANSION,DEPTH_COLLAPSE,MID_JUMP".to_string(),
        }
    }

    fn bot_score() -> BotScoreRecord {
        BotScoreRecord {
            timestamp_ms: 1_740_787_200_000,
            cycle: 12,
            market_id: "tok-1".to_string(),
            score: 0.47,
            regime: "MIXED".to_string(),
            pmwv: 1e-8,
            pmwv_score: 0.0,
            spread_score: 0.91,
            depth_score: 0.17,
            stability_score: 1.0,
        }
    }

    #[test]
    fn test_streams_go_to_separate_files() {
        let dir = TempDir::new().unwrap();
        let mut store = ResultStore::open(&config(&dir, true)).unwrap();

        store.record_signal(signal()).unwrap();
        store.record_bot_score(bot_score()).unwrap();
        store.close().unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let signals =
            std::fs::read_to_string(dir.path().join(format!("signals_{today}.jsonl"))).unwrap();
        let scores =
            std::fs::read_to_string(dir.path().join(format!("bot_scores_{today}.jsonl"))).unwrap();

        let parsed: SignalRecord = serde_json::from_str(signals.trim()).unwrap();
        assert!(parsed.is_cascade());
        assert_eq!(parsed.direction.as_deref(), Some("FADE_UP"));
        assert!(scores.contains("\"regime\":\"MIXED\""));
    }

    #[test]
    fn test_snapshot_stream_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let mut store = ResultStore::open(&config(&dir, false)).unwrap();
        store.record_bot_score(bot_score()).unwrap();
        store.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("bot_scores_"));
    }
}
