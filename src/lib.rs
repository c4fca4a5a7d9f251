//! garantias: warranty ticket intake and status notification automation
//!
//! Two run-to-completion batch pipelines over a shared record store and a
//! persisted status snapshot:
//!
//! - **Intake**: webhook payload → duplicate check → ticket creation →
//!   confirmation emails. A duplicate verdict suppresses creation and
//!   notification entirely.
//! - **Status sync**: record store → status diff against the last snapshot
//!   → one client email per notifiable transition → snapshot persistence
//!   (terminal tickets are pruned).
//!
//! Storage and delivery are trait seams (`store::RecordStore`,
//! `store::SnapshotStore`, `notify::Notifier`) so both pipelines run
//! unchanged against sled + SMTP in production and against in-memory fakes
//! in tests.

pub mod config;
pub mod intake;
pub mod notify;
pub mod status;
pub mod store;
pub mod types;

// Re-export the pipeline surface
pub use config::Settings;
pub use intake::{process_submission, DedupVerdict, DuplicateChecker, IntakeOutcome};
pub use status::{diff_statuses, run_status_sync, DiffOutcome, StatusChange};

// Re-export storage and notification seams
pub use notify::{Notifier, NotifyError};
pub use store::{RecordStore, SnapshotStore, StoreError};

// Re-export core domain types
pub use types::{Brand, SnapshotMap, TicketStatus, WarrantyRecord, WarrantySubmission};
