//! Record and snapshot persistence
//!
//! Both pipelines consume storage through trait seams so they can run
//! unchanged against the production backends or in-memory fakes:
//! - `SledRecordStore`: warranty records, one sled tree per brand partition
//! - `JsonSnapshotStore`: status snapshot as an atomically-replaced JSON file
//! - `InMemoryStore`: implements both traits, for tests and minimal
//!   deployments

mod memory;
mod records;
mod snapshot;

pub use memory::InMemoryStore;
pub use records::SledRecordStore;
pub use snapshot::JsonSnapshotStore;

use crate::types::{Brand, SnapshotMap, WarrantyRecord};

/// Storage errors shared by both stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("duplicate ticket id: {0}")]
    DuplicateTicketId(String),

    #[error("ticket not found: {0}")]
    TicketNotFound(String),
}

/// Store of warranty records, partitioned by brand.
///
/// Implementations must be thread-safe (`Send + Sync`). Record creation is
/// the only mutation the pipelines perform; status edits happen out-of-band
/// (staff tooling) and are merely read back here.
pub trait RecordStore: Send + Sync {
    /// List records, optionally scoped to one brand partition.
    fn list_records(&self, brand: Option<Brand>) -> Result<Vec<WarrantyRecord>, StoreError>;

    /// Append a new record.
    ///
    /// Fails with `DuplicateTicketId` if the ticket id already exists in
    /// any partition; ids are unique across the whole store.
    fn append_record(&self, record: &WarrantyRecord) -> Result<(), StoreError>;
}

/// Store of the status-tracking snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the last persisted snapshot. A store that has never been
    /// written yields an empty map.
    fn load(&self) -> Result<SnapshotMap, StoreError>;

    /// Replace the persisted snapshot. Must be atomic: a failed save leaves
    /// the previous snapshot readable.
    fn save(&self, snapshot: &SnapshotMap) -> Result<(), StoreError>;
}
