//! Sled-backed record store
//!
//! One tree per brand partition, keyed by ticket id, JSON values. The
//! pipelines only list and append; `set_status` exists for the out-of-band
//! staff edit surface (CLI) and is deliberately not part of `RecordStore`.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use super::{RecordStore, StoreError};
use crate::types::{Brand, TicketStatus, WarrantyRecord};

/// Persistent record store on sled.
#[derive(Clone)]
pub struct SledRecordStore {
    db: Arc<sled::Db>,
}

impl SledRecordStore {
    /// Open or create the record database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref()).map_err(|e| StoreError::Storage(e.to_string()))?;
        tracing::info!(path = %path.as_ref().display(), "Record store opened");
        Ok(Self { db: Arc::new(db) })
    }

    fn tree(&self, brand: Brand) -> Result<sled::Tree, StoreError> {
        self.db
            .open_tree(brand.partition_name())
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn list_partition(&self, brand: Brand) -> Result<Vec<WarrantyRecord>, StoreError> {
        let tree = self.tree(brand)?;
        let mut records = Vec::new();
        for item in tree.iter() {
            let (key, value) = item.map_err(|e| StoreError::Storage(e.to_string()))?;
            match serde_json::from_slice::<WarrantyRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // One corrupt row must not hide the rest of the partition.
                    warn!(
                        partition = brand.partition_name(),
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping undecodable record"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Find a record by ticket id, searching every partition.
    pub fn find(&self, ticket_id: &str) -> Result<Option<WarrantyRecord>, StoreError> {
        for brand in Brand::ALL {
            let tree = self.tree(brand)?;
            if let Some(value) = tree
                .get(ticket_id.as_bytes())
                .map_err(|e| StoreError::Storage(e.to_string()))?
            {
                let record = serde_json::from_slice::<WarrantyRecord>(&value)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Out-of-band staff edit: move a ticket to a new status.
    ///
    /// Returns the updated record. The pipelines never call this; status
    /// changes are observed on the next sync run, exactly as spreadsheet
    /// edits were.
    pub fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
    ) -> Result<WarrantyRecord, StoreError> {
        let mut record = self
            .find(ticket_id)?
            .ok_or_else(|| StoreError::TicketNotFound(ticket_id.to_string()))?;

        record.status = status;
        let value =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tree = self.tree(record.brand)?;
        tree.insert(ticket_id.as_bytes(), value)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        tree.flush().map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(record)
    }
}

impl RecordStore for SledRecordStore {
    fn list_records(&self, brand: Option<Brand>) -> Result<Vec<WarrantyRecord>, StoreError> {
        match brand {
            Some(brand) => self.list_partition(brand),
            None => {
                let mut all = Vec::new();
                for brand in Brand::ALL {
                    all.extend(self.list_partition(brand)?);
                }
                Ok(all)
            }
        }
    }

    fn append_record(&self, record: &WarrantyRecord) -> Result<(), StoreError> {
        // Ticket ids are unique across the whole store, not per partition.
        if self.find(&record.ticket_id)?.is_some() {
            return Err(StoreError::DuplicateTicketId(record.ticket_id.clone()));
        }

        let value =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tree = self.tree(record.brand)?;
        tree.insert(record.ticket_id.as_bytes(), value)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        tree.flush().map_err(|e| StoreError::Storage(e.to_string()))?;

        tracing::debug!(
            ticket_id = %record.ticket_id,
            partition = record.brand.partition_name(),
            "Record appended"
        );
        Ok(())
    }
}
