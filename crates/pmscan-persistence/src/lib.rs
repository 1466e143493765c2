//! Result persistence for pmscan.
//!
//! Records per-cycle outputs (snapshot metrics with screening, BotScores,
//! strategy signals) to daily JSON Lines files for offline analysis.

pub mod error;
pub mod records;
pub mod store;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use records::{BotScoreRecord, SignalRecord, SnapshotRecord};
pub use store::{PersistenceConfig, ResultStore};
pub use writer::JsonLinesWriter;
