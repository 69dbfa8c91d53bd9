//! Persistence layer.
//!
//! Durable bounded log of settled rounds, stored as a JSON array in a
//! single file and reloaded at coordinator startup. Deserialization
//! failures are non-fatal: a corrupt or unreadable file is treated as an
//! empty history so the scheduler always starts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::RoundRecord;

/// Default ledger file path.
pub const DEFAULT_HISTORY_FILE: &str = "round_history.json";

/// Default number of settled rounds retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Bounded, durable round-history ledger.
///
/// Insertion order is chronological order; the oldest record is evicted
/// when the limit is exceeded. Every append persists as a side effect.
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    records: Vec<RoundRecord>,
}

impl HistoryStore {
    /// Open the ledger at `path`, loading any prior records.
    ///
    /// Missing file means a fresh start; a file that fails to parse is
    /// logged and treated as empty rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let records = Self::load_from(&path, limit);
        Self {
            path,
            limit,
            records,
        }
    }

    fn load_from(path: &Path, limit: usize) -> Vec<RoundRecord> {
        if !path.exists() {
            info!(path = %path.display(), "No saved round history, starting fresh");
            return Vec::new();
        }

        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read round history, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<RoundRecord>>(&json) {
            Ok(mut records) => {
                if records.len() > limit {
                    records.drain(..records.len() - limit);
                }
                info!(
                    path = %path.display(),
                    rounds = records.len(),
                    "Round history loaded from disk"
                );
                records
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt round history, treating as empty");
                Vec::new()
            }
        }
    }

    /// Append a settled round, truncate to the retention limit, and persist.
    ///
    /// A persistence error leaves the in-memory ledger updated — callers
    /// log and continue (the scheduler never dies over storage).
    pub fn append(&mut self, record: RoundRecord) -> Result<()> {
        self.records.push(record);
        if self.records.len() > self.limit {
            let excess = self.records.len() - self.limit;
            self.records.drain(..excess);
        }
        self.save()
    }

    /// Snapshot of the current ledger, most-recent-last.
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)
            .context("Failed to serialise round history")?;
        std::fs::write(&self.path, &json)
            .with_context(|| format!("Failed to write round history to {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            rounds = self.records.len(),
            "Round history saved"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
