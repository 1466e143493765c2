//! JSON Lines file writer.
//!
//! Each line is a complete JSON object, so an interrupted write only loses
//! the line being written. Files rotate daily (`<prefix>_<YYYY-MM-DD>.jsonl`)
//! and are opened in append mode.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The file currently receiving rows.
struct DayFile {
    day: String,
    out: BufWriter<File>,
    lines: usize,
}

impl DayFile {
    fn open(path: &Path, day: &str) -> PersistenceResult<Self> {
        info!(path = %path.display(), "Opening JSON Lines file (append)");
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            day: day.to_string(),
            out: BufWriter::new(file),
            lines: 0,
        })
    }
}

/// Buffered, append-only JSON Lines writer for one record type.
pub struct JsonLinesWriter<R: Serialize> {
    dir: PathBuf,
    /// File name prefix, e.g. `signals`.
    prefix: String,
    pending: Vec<R>,
    /// Pending rows that trigger a flush.
    flush_at: usize,
    current: Option<DayFile>,
}

impl<R: Serialize> JsonLinesWriter<R> {
    /// Create a writer. The directory is created if missing.
    pub fn new(dir: impl AsRef<Path>, prefix: &str, flush_at: usize) -> PersistenceResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let flush_at = flush_at.max(1);
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            pending: Vec::with_capacity(flush_at),
            flush_at,
            current: None,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rows waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue a row, flushing once `flush_at` rows are pending.
    pub fn add_record(&mut self, record: R) -> PersistenceResult<()> {
        self.pending.push(record);
        if self.pending.len() >= self.flush_at {
            self.flush()?;
        }
        Ok(())
    }

    /// Path of the file for a day (`YYYY-MM-DD`).
    pub fn file_path(&self, day: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.jsonl", self.prefix, day))
    }

    /// Open today's file, rotating away from an older one.
    fn open_for(&mut self, today: &str) -> PersistenceResult<()> {
        if self.current.as_ref().is_some_and(|f| f.day != today) {
            self.finish_current();
        }
        if self.current.is_none() {
            self.current = Some(DayFile::open(&self.file_path(today), today)?);
        }
        Ok(())
    }

    fn finish_current(&mut self) {
        let Some(mut file) = self.current.take() else {
            return;
        };
        if let Err(e) = file.out.flush() {
            warn!(?e, prefix = %self.prefix, "Flush failed while closing file");
        }
        info!(
            prefix = %self.prefix,
            day = %file.day,
            lines = file.lines,
            "Closed JSON Lines file"
        );
    }

    /// Write pending rows to today's file.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.open_for(&today)?;
        let Some(file) = self.current.as_mut() else {
            return Err(PersistenceError::WriterUnavailable(self.prefix.clone()));
        };

        // Rows stay pending until the file has taken all of them.
        let mut encoded = Vec::new();
        for row in &self.pending {
            serde_json::to_writer(&mut encoded, row)?;
            encoded.push(b'\n');
        }
        file.out.write_all(&encoded)?;
        file.out.flush()?;

        let rows = self.pending.len();
        file.lines += rows;
        self.pending.clear();

        debug!(prefix = %self.prefix, day = %today, rows, "Flushed rows");
        Ok(())
    }

    /// Flush pending rows and close the file.
    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.finish_current();
        Ok(())
    }
}

impl<R: Serialize> Drop for JsonLinesWriter<R> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, prefix = %self.prefix, "Flush failed on drop");
        }
        self.finish_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize)]
    struct Row {
        id: i64,
        market_id: String,
    }

    fn row(id: i64) -> Row {
        Row {
            id,
            market_id: "tok-1".to_string(),
        }
    }

    /// Lines of the single file in `dir`.
    fn only_file_lines(dir: &Path) -> Vec<String> {
        let paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(paths.len(), 1, "expected exactly one file");
        std::fs::read_to_string(&paths[0])
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_rows_written_in_order() {
        let dir = TempDir::new().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "rows", 100).unwrap();

        for i in 0..5 {
            writer.add_record(row(i)).unwrap();
        }
        assert_eq!(writer.pending(), 5);
        writer.close().unwrap();

        let lines = only_file_lines(dir.path());
        assert_eq!(lines.len(), 5);
        let last: Row = serde_json::from_str(&lines[4]).unwrap();
        assert_eq!(last.id, 4);
        assert_eq!(last.market_id, "tok-1");
    }

    #[test]
    fn test_file_named_by_prefix_and_day() {
        let dir = TempDir::new().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "signals", 1).unwrap();
        writer.add_record(row(1)).unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let path = writer.file_path(&today);
        assert!(path.exists());
        assert!(path.ends_with(format!("signals_{today}.jsonl")));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        for run in 0..2 {
            let mut writer = JsonLinesWriter::new(dir.path(), "rows", 100).unwrap();
            writer.add_record(row(run)).unwrap();
            writer.add_record(row(run + 10)).unwrap();
            writer.close().unwrap();
        }
        assert_eq!(only_file_lines(dir.path()).len(), 4);
    }

    #[test]
    fn test_flush_threshold() {
        let dir = TempDir::new().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "rows", 2).unwrap();

        writer.add_record(row(0)).unwrap();
        assert_eq!(writer.pending(), 1);
        writer.add_record(row(1)).unwrap();
        assert_eq!(writer.pending(), 0);
        writer.add_record(row(2)).unwrap();
        assert_eq!(writer.pending(), 1);
    }

    #[test]
    fn test_drop_writes_pending_rows() {
        let dir = TempDir::new().unwrap();
        {
            let mut writer = JsonLinesWriter::new(dir.path(), "rows", 100).unwrap();
            writer.add_record(row(7)).unwrap();
        }
        assert_eq!(only_file_lines(dir.path()).len(), 1);
    }

    #[test]
    fn test_nothing_pending_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = JsonLinesWriter::<Row>::new(dir.path(), "rows", 100).unwrap();
        writer.flush().unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_flush_keeps_pending_rows() {
        let dir = TempDir::new().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "rows", 100).unwrap();
        writer.add_record(row(1)).unwrap();

        // a directory where today's file should be makes the open fail
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let path = writer.file_path(&today);
        std::fs::create_dir(&path).unwrap();

        assert!(writer.flush().is_err());
        assert_eq!(writer.pending(), 1);

        std::fs::remove_dir(&path).unwrap();
        writer.add_record(row(2)).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.pending(), 0);

        let lines = only_file_lines(dir.path());
        assert_eq!(lines.len(), 2);
        let first: Row = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.id, 1);
    }
}
