//! JSON-file snapshot store
//!
//! The snapshot is small (one entry per in-flight ticket), so the whole map
//! is rewritten on every save: serialize to a temp file alongside the
//! target, then rename. A crash mid-save leaves the previous snapshot
//! intact.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{SnapshotStore, StoreError};
use crate::types::SnapshotMap;

/// On-disk format: the flat ticket→status map plus a bookkeeping stamp.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    tickets: SnapshotMap,
}

/// Snapshot persisted as a single JSON file.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<SnapshotMap, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No snapshot file yet, starting empty");
            return Ok(SnapshotMap::new());
        }

        let data = std::fs::read(&self.path).map_err(|e| StoreError::Storage(e.to_string()))?;
        // A corrupt file is surfaced, never silently reset: resetting would
        // re-notify every tracked ticket on the next run.
        let file: SnapshotFile =
            serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))?;

        info!(
            path = %self.path.display(),
            tickets = file.tickets.len(),
            "Loaded status snapshot"
        );
        Ok(file.tickets)
    }

    fn save(&self, snapshot: &SnapshotMap) -> Result<(), StoreError> {
        let file = SnapshotFile {
            last_updated: Some(Utc::now()),
            tickets: snapshot.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| StoreError::Storage(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Storage(e.to_string()))?;

        info!(
            path = %self.path.display(),
            tickets = snapshot.len(),
            "Status snapshot saved"
        );
        Ok(())
    }
}
