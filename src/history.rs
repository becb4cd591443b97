// src/history.rs
// Bounded download history, persisted as JSON. Downstream consumers read
// this; the orchestration layer only appends sanitized records.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of records kept, newest first.
pub const HISTORY_MAX_ENTRIES: usize = 250;

/// One finished download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub name: String,
    pub source_url: String,
}

/// In-memory history with JSON persistence. Load failures are tolerated
/// (a corrupt or missing file just means an empty history).
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: Vec::new(),
        }
    }

    pub fn load(path: PathBuf) -> Self {
        let records = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
                Ok(records) => records,
                Err(err) => {
                    warn!("ignoring unreadable history file {:?}: {}", path, err);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        let mut store = Self { path, records };
        store.truncate();
        store
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Record one finished output, newest first, dropping overflow.
    pub fn record(&mut self, output_path: &Path, source_url: &str) {
        let name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.records.insert(
            0,
            HistoryRecord {
                timestamp: Utc::now(),
                path: output_path.to_string_lossy().into_owned(),
                name,
                source_url: source_url.to_string(),
            },
        );
        self.truncate();
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn truncate(&mut self) {
        self.records.truncate(HISTORY_MAX_ENTRIES);
    }
}
