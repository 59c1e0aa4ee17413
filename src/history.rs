//! Persistent log of finished timer sessions.
//!
//! The whole log is one JSON record. Every mutation reads it, changes it and
//! writes it back; a single writer is assumed.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    format::{format_time, format_timestamp},
    storage::{save_json, Storage},
};

pub const HISTORY_KEY: &str = "history";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub remaining: u64,
    pub elapsed: u64,
    pub timestamp: i64,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLog {
    pub last_id: u64,
    pub entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn recent_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct HistoryStore<S: Storage> {
    storage: S,
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Current log, or an empty one when nothing is stored yet. Unreadable
    /// data is reported as [`Error::PersistenceCorrupt`].
    pub fn try_load(&self) -> Result<HistoryLog> {
        let text = match self.storage.load(HISTORY_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(HistoryLog::default()),
            Err(e) => return Err(Error::PersistenceCorrupt(e.to_string())),
        };

        serde_json::from_str(&text).map_err(|e| Error::PersistenceCorrupt(e.to_string()))
    }

    /// Current log, falling back to an empty one on any read failure.
    pub fn load(&self) -> HistoryLog {
        self.try_load().unwrap_or_else(|e| {
            warn!("Using empty history: {}", e);
            HistoryLog::default()
        })
    }

    pub fn add(&mut self, remaining: u64, elapsed: u64, timestamp: i64, label: &str) -> Result<u64> {
        let mut id = 0;
        self.update(|log| {
            log.last_id += 1;
            id = log.last_id;
            log.entries.push(HistoryEntry {
                id,
                remaining,
                elapsed,
                timestamp,
                label: label.to_string(),
            });
        })?;
        info!("Recorded history entry {}", id);
        Ok(id)
    }

    /// Removes the entry with `id`. Returns false if there was none.
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        let mut removed = false;
        self.update(|log| {
            if let Some(index) = log.entries.iter().position(|e| e.id == id) {
                log.entries.remove(index);
                removed = true;
            }
        })?;
        if !removed {
            warn!("No history entry with id {}", id);
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.save(&HistoryLog::default())?;
        info!("History cleared");
        Ok(())
    }

    /// Read-modify-write. An unreadable record aborts the change and is left
    /// untouched.
    fn update<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut HistoryLog),
    {
        let mut log = self.try_load()?;
        change(&mut log);
        self.save(&log)
    }

    fn save(&mut self, log: &HistoryLog) -> Result<()> {
        save_json(&mut self.storage, HISTORY_KEY, log)
    }
}

/// CSV export, most recent first.
pub fn export_csv(log: &HistoryLog) -> String {
    let mut csv = String::from("Timestamp,Label,Time Left,Elapsed\n");
    for entry in log.recent_first() {
        let label = if entry.label.contains(',') || entry.label.contains('"') {
            format!("\"{}\"", entry.label.replace('"', "\"\""))
        } else {
            entry.label.clone()
        };
        csv.push_str(&format!(
            "{},{},{},{}\n",
            format_timestamp(entry.timestamp),
            label,
            format_time(entry.remaining),
            format_time(entry.elapsed)
        ));
    }
    csv
}
