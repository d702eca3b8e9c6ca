//! Key-value snapshot persistence.
//!
//! The store keeps exactly one record (`issue-board-storage`) holding the
//! filters, the recency list and the last sync time. The simulated backend
//! keeps its own record (`mock-backend-storage`). Values are JSON.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::FilterState;

/// Record name for the persisted board state.
pub const BOARD_STATE_KEY: &str = "issue-board-storage";

/// Record name for the simulated backend's issue set.
pub const BACKEND_STATE_KEY: &str = "mock-backend-storage";

/// A named-record store that survives restarts.
pub trait SnapshotStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the underlying medium cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the underlying medium cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local snapshot store. Used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySnapshots {
    records: Mutex<HashMap<String, String>>,
}

impl MemorySnapshots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshots {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The subset of store state persisted across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBoard {
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub recently_accessed_ids: Vec<String>,
    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Load and decode a JSON record.
///
/// # Errors
///
/// Returns `Storage` on read failure or `Json` if the record is not valid JSON for `T`.
pub fn load_json<T: DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> Result<Option<T>> {
    match store.load(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and store a JSON record.
///
/// # Errors
///
/// Returns `Json` on encoding failure or `Storage` on write failure.
pub fn save_json<T: Serialize>(store: &dyn SnapshotStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.save(key, &raw)
}

/// Load the persisted board state, falling back to defaults when the record
/// is missing or unreadable.
#[must_use]
pub fn load_board_or_default(store: &dyn SnapshotStore) -> PersistedBoard {
    match load_json::<PersistedBoard>(store, BOARD_STATE_KEY) {
        Ok(Some(board)) => board,
        Ok(None) => PersistedBoard::default(),
        Err(e) => {
            tracing::warn!("Discarding unreadable board snapshot: {e}");
            PersistedBoard::default()
        }
    }
}
