//! In-memory store for testing and minimal deployments
//!
//! Implements both `RecordStore` and `SnapshotStore`. Thread-safe via
//! `RwLock`. Not durable — contents are lost on drop. The snapshot side
//! carries a failure switch so persistence-failure handling is testable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::{RecordStore, SnapshotStore, StoreError};
use crate::types::{Brand, SnapshotMap, TicketStatus, WarrantyRecord};

/// In-memory record + snapshot store.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<WarrantyRecord>>,
    snapshot: RwLock<SnapshotMap>,
    fail_snapshot_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `SnapshotStore::save` fail, to exercise the
    /// persistence-failure path.
    pub fn fail_snapshot_saves(&self, fail: bool) {
        self.fail_snapshot_saves.store(fail, Ordering::SeqCst);
    }

    /// Test stand-in for the out-of-band staff status edit.
    pub fn set_status(&self, ticket_id: &str, status: TicketStatus) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let record = records
            .iter_mut()
            .find(|r| r.ticket_id == ticket_id)
            .ok_or_else(|| StoreError::TicketNotFound(ticket_id.to_string()))?;
        record.status = status;
        Ok(())
    }
}

impl RecordStore for InMemoryStore {
    fn list_records(&self, brand: Option<Brand>) -> Result<Vec<WarrantyRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|r| brand.is_none() || brand == Some(r.brand))
            .cloned()
            .collect())
    }

    fn append_record(&self, record: &WarrantyRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        if records.iter().any(|r| r.ticket_id == record.ticket_id) {
            return Err(StoreError::DuplicateTicketId(record.ticket_id.clone()));
        }
        records.push(record.clone());
        Ok(())
    }
}

impl SnapshotStore for InMemoryStore {
    fn load(&self) -> Result<SnapshotMap, StoreError> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(snapshot.clone())
    }

    fn save(&self, snapshot: &SnapshotMap) -> Result<(), StoreError> {
        if self.fail_snapshot_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("injected save failure".to_string()));
        }
        let mut stored = self
            .snapshot
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        *stored = snapshot.clone();
        Ok(())
    }
}
