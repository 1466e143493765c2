//! Snapshot sources.
//!
//! The pipeline pulls one cycle of snapshots at a time. `JsonLinesSource`
//! replays a file with one `MarketSnapshot` JSON document per line;
//! consecutive lines that share a timestamp form one cycle.

use crate::error::{AppError, AppResult};
use pmscan_core::MarketSnapshot;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supplies snapshots cycle by cycle.
pub trait SnapshotSource {
    /// Next cycle's snapshots, or `None` once the source is exhausted.
    fn next_cycle(&mut self) -> AppResult<Option<Vec<MarketSnapshot>>>;
}

/// Replays JSON Lines snapshots.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    /// First snapshot of the next cycle, read ahead while closing the last.
    pending: Option<MarketSnapshot>,
    line_no: u64,
    skipped: u64,
    exhausted: bool,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::Source(format!("Failed to open {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "Replaying snapshots");
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            pending: None,
            line_no: 0,
            skipped: 0,
            exhausted: false,
        }
    }

    /// Malformed lines skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next decodable snapshot, skipping blank and malformed lines.
    fn read_snapshot(&mut self) -> AppResult<Option<MarketSnapshot>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| AppError::Source(format!("read failed: {e}")))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match MarketSnapshot::from_json(trimmed) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %e, "Skipping malformed snapshot line");
                }
            }
        }
    }
}

impl<R: BufRead> SnapshotSource for JsonLinesSource<R> {
    fn next_cycle(&mut self) -> AppResult<Option<Vec<MarketSnapshot>>> {
        if self.exhausted {
            return Ok(None);
        }

        let first = match self.pending.take() {
            Some(snapshot) => snapshot,
            None => match self.read_snapshot()? {
                Some(snapshot) => snapshot,
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            },
        };

        let timestamp = first.timestamp;
        let mut cycle = vec![first];
        loop {
            match self.read_snapshot()? {
                Some(snapshot) if snapshot.timestamp == timestamp => cycle.push(snapshot),
                Some(snapshot) => {
                    self.pending = Some(snapshot);
                    break;
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }

        debug!(%timestamp, markets = cycle.len(), "Cycle read");
        Ok(Some(cycle))
    }
}

/// In-memory cycles, consumed in order.
pub struct VecSource {
    cycles: std::vec::IntoIter<Vec<MarketSnapshot>>,
}

impl VecSource {
    pub fn new(cycles: Vec<Vec<MarketSnapshot>>) -> Self {
        Self {
            cycles: cycles.into_iter(),
        }
    }
}

impl SnapshotSource for VecSource {
    fn next_cycle(&mut self) -> AppResult<Option<Vec<MarketSnapshot>>> {
        Ok(self.cycles.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(market: &str, ts: &str) -> String {
        format!(
            r#"{{"market_id":"{market}","timestamp":"{ts}","vol24h":"5000","book":{{"bids":[{{"price":"0.49","size":"100"}}],"asks":[{{"price":"0.51","size":"100"}}]}}}}"#
        )
    }

    fn source(lines: &[String]) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::from_reader(Cursor::new(lines.join("\n").into_bytes()))
    }

    #[test]
    fn test_groups_by_timestamp() {
        let t0 = "2025-03-01T00:00:00Z";
        let t1 = "2025-03-01T00:00:01Z";
        let mut src = source(&[
            line("a", t0),
            line("b", t0),
            line("a", t1),
            line("b", t1),
            line("c", t1),
        ]);

        let first = src.next_cycle().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].market_id.as_str(), "b");

        let second = src.next_cycle().unwrap().unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|s| s.timestamp == second[0].timestamp));

        assert!(src.next_cycle().unwrap().is_none());
        assert!(src.next_cycle().unwrap().is_none());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let t0 = "2025-03-01T00:00:00Z";
        let mut src = source(&[
            line("a", t0),
            "{not json".to_string(),
            String::new(),
            line("b", t0),
        ]);

        let cycle = src.next_cycle().unwrap().unwrap();
        assert_eq!(cycle.len(), 2);
        assert_eq!(src.skipped(), 1);
    }

    #[test]
    fn test_empty_input() {
        let mut src = source(&[]);
        assert!(src.next_cycle().unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonLinesSource::open(dir.path().join("missing.jsonl"))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Source(_)));
    }

    #[test]
    fn test_vec_source_in_order() {
        let mut src = VecSource::new(vec![vec![], vec![]]);
        assert!(src.next_cycle().unwrap().is_some());
        assert!(src.next_cycle().unwrap().is_some());
        assert!(src.next_cycle().unwrap().is_none());
    }
}
