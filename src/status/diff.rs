//! Status-change detection between scheduled runs
//!
//! Pure diff of the current ticket statuses against the persisted snapshot.
//! Guarantees:
//! - each distinct transition into a notifiable status is reported exactly
//!   once across runs (unchanged statuses never re-notify)
//! - untouched `Recibida` tickets never enter the snapshot
//! - terminal tickets leave the snapshot once their notification is owed
//!   or was already sent
//!
//! The caller owns all side effects: sending the notifications and
//! persisting the returned snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::types::{Brand, SnapshotMap, TicketStatus, WarrantyRecord};

/// Current state of one ticket as read from the record store.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub ticket_id: String,
    pub email: String,
    pub brand: Brand,
    pub status: TicketStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<&WarrantyRecord> for StatusRow {
    fn from(record: &WarrantyRecord) -> Self {
        Self {
            ticket_id: record.ticket_id.clone(),
            email: record.client_email.clone(),
            brand: record.brand,
            status: record.status,
            submitted_at: record.submitted_at,
        }
    }
}

/// One client notification owed for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub ticket_id: String,
    pub email: String,
    pub brand: Brand,
    /// Last status the snapshot knew, `None` for first-time observations.
    pub previous: Option<TicketStatus>,
    pub current: TicketStatus,
}

/// Result of diffing one run's rows against the previous snapshot.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Notifications owed this run, in input order.
    pub changes: Vec<StatusChange>,
    /// The snapshot to persist after the notifications are attempted.
    pub snapshot: SnapshotMap,
}

/// Diff current ticket rows against the previously persisted snapshot.
///
/// Rows missing a ticket id or email cannot be notified and are excluded
/// entirely: they neither produce changes nor touch the snapshot. A ticket
/// id appearing more than once is evaluated on first occurrence only.
/// Entries for tickets absent from `rows` are carried through unchanged.
pub fn diff_statuses(rows: &[StatusRow], previous: &SnapshotMap) -> DiffOutcome {
    let mut snapshot = previous.clone();
    let mut changes = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for row in rows {
        if row.ticket_id.trim().is_empty() || row.email.trim().is_empty() {
            debug!(
                ticket_id = %row.ticket_id,
                "Skipping row without ticket id or email"
            );
            continue;
        }
        if !seen.insert(row.ticket_id.as_str()) {
            warn!(ticket_id = %row.ticket_id, "Duplicate ticket id in input, ignoring repeat");
            continue;
        }

        let prev = snapshot.get(&row.ticket_id).copied();
        let changed = prev != Some(row.status);

        if changed && row.status.is_notifiable() {
            changes.push(StatusChange {
                ticket_id: row.ticket_id.clone(),
                email: row.email.clone(),
                brand: row.brand,
                previous: prev,
                current: row.status,
            });
        }

        if row.status.is_terminal() {
            // Notified now (changed) or on a previous run (unchanged entry):
            // either way the ticket needs no further tracking.
            snapshot.remove(&row.ticket_id);
        } else if row.status == TicketStatus::Recibida {
            // Track a regression to the baseline so a later re-transition
            // notifies again, but never start tracking an untouched ticket.
            if prev.is_some() {
                snapshot.insert(row.ticket_id.clone(), TicketStatus::Recibida);
            }
        } else {
            snapshot.insert(row.ticket_id.clone(), row.status);
        }
    }

    DiffOutcome { changes, snapshot }
}
