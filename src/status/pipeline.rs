//! Status-sync pipeline - scheduled run over the record store
//!
//! Processing sequence for one run:
//!
//! ```text
//! STEP 1: Read all records
//! STEP 2: Recency filter (tracking window)
//! STEP 3: Diff against the persisted snapshot
//! STEP 4: Send one email per transition (sequential)
//! STEP 5: Drop snapshot entries for tickets deleted from the store
//! STEP 6: Persist the snapshot (fatal on failure)
//! STEP 7: Admin summary
//! ```
//!
//! A failed send is logged per ticket and the snapshot entry advances
//! anyway; one failed attempt is preferred to a notify-storm on every
//! later run. A failed snapshot save after sends is fatal: the caller must
//! know the next run may duplicate notifications.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use super::diff::{diff_statuses, StatusRow};
use crate::config::TrackingConfig;
use crate::notify::{FailedNotification, Notifier, RunSummary};
use crate::store::{RecordStore, SnapshotStore};

/// Run one status-sync pass. Returns the run summary on success.
pub async fn run_status_sync(
    records: &dyn RecordStore,
    snapshots: &dyn SnapshotStore,
    notifier: &dyn Notifier,
    tracking: &TrackingConfig,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let all_records = records
        .list_records(None)
        .context("reading records for status sync")?;
    info!(total = all_records.len(), "Read records from store");

    let cutoff = now - Duration::days(tracking.window_days);
    let rows: Vec<StatusRow> = all_records
        .iter()
        .filter(|r| r.submitted_at >= cutoff)
        .map(StatusRow::from)
        .collect();
    if rows.len() < all_records.len() {
        info!(
            skipped = all_records.len() - rows.len(),
            window_days = tracking.window_days,
            "Tickets outside the tracking window were not diffed"
        );
    }

    let previous = snapshots.load().context("loading status snapshot")?;
    let outcome = diff_statuses(&rows, &previous);
    info!(
        tickets = rows.len(),
        changes = outcome.changes.len(),
        "Status diff complete"
    );

    let mut summary = RunSummary {
        tickets_seen: rows.len(),
        changes_detected: outcome.changes.len(),
        ..Default::default()
    };

    for change in &outcome.changes {
        match notifier
            .status_update(&change.ticket_id, &change.email, change.brand, change.current)
            .await
        {
            Ok(()) => {
                summary.sent += 1;
                info!(
                    ticket_id = %change.ticket_id,
                    status = %change.current,
                    "Status notification sent"
                );
            }
            Err(e) => {
                // The snapshot entry still advances: one logged failure,
                // no repeat attempt on the next run.
                summary.failed += 1;
                summary.failed_tickets.push(FailedNotification {
                    ticket_id: change.ticket_id.clone(),
                    status: change.current,
                    error: e.to_string(),
                });
                error!(
                    ticket_id = %change.ticket_id,
                    stage = "status_update",
                    status = %change.current,
                    error = %e,
                    "Status notification failed"
                );
            }
        }
    }

    // Entries whose ticket vanished from the store entirely are dead weight;
    // entries merely outside the tracking window stay untouched.
    let live_ids: HashSet<&str> = all_records.iter().map(|r| r.ticket_id.as_str()).collect();
    let mut snapshot = outcome.snapshot;
    let before = snapshot.len();
    snapshot.retain(|id, _| live_ids.contains(id.as_str()));
    if snapshot.len() < before {
        info!(
            removed = before - snapshot.len(),
            "Dropped snapshot entries for deleted tickets"
        );
    }

    snapshots
        .save(&snapshot)
        .context("persisting status snapshot after notifications; the next run may duplicate them")?;

    if let Err(e) = notifier.admin_summary(&summary).await {
        warn!(error = %e, "Admin summary email failed");
    }

    info!(
        sent = summary.sent,
        failed = summary.failed,
        "Status sync complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{RecordingNotifier, SentMessage};
    use crate::store::{InMemoryStore, RecordStore};
    use crate::types::{Brand, TicketStatus, WarrantyRecord};

    fn make_record(id: &str, status: TicketStatus, age_days: i64) -> WarrantyRecord {
        WarrantyRecord {
            ticket_id: id.to_string(),
            brand: Brand::Conway,
            status,
            submitted_at: Utc::now() - Duration::days(age_days),
            client_email: format!("{id}@example.com"),
            client_name: "Taller".to_string(),
            tax_id: String::new(),
            product_model: "SN123".to_string(),
            product_size: String::new(),
            manufacture_year: String::new(),
            product_condition: String::new(),
            issue_description: "ruido".to_string(),
            proposed_solution: String::new(),
        }
    }

    #[tokio::test]
    async fn notifies_transitions_and_persists_snapshot() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        store
            .append_record(&make_record("t1", TicketStatus::Tramitada, 1))
            .unwrap();

        let summary = run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await
        .expect("sync");

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            crate::store::SnapshotStore::load(&store).unwrap().get("t1"),
            Some(&TicketStatus::Tramitada)
        );
        // One status update + the admin summary.
        assert_eq!(notifier.status_updates().len(), 1);
        assert!(notifier
            .sent()
            .iter()
            .any(|m| matches!(m, SentMessage::AdminSummary { sent: 1, failed: 0 })));
    }

    #[tokio::test]
    async fn tickets_outside_window_are_not_diffed() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        store
            .append_record(&make_record("t-old", TicketStatus::Tramitada, 120))
            .unwrap();

        let summary = run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await
        .expect("sync");

        assert_eq!(summary.tickets_seen, 0);
        assert_eq!(summary.sent, 0);
        assert!(notifier.status_updates().is_empty());
    }

    #[tokio::test]
    async fn failed_send_still_advances_snapshot() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        notifier.fail_status_updates(true);
        store
            .append_record(&make_record("t1", TicketStatus::Tramitada, 1))
            .unwrap();

        let summary = run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await
        .expect("sync must not abort on send failures");

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_tickets[0].ticket_id, "t1");
        // Entry advanced regardless, so the next run stays silent.
        assert_eq!(
            crate::store::SnapshotStore::load(&store).unwrap().get("t1"),
            Some(&TicketStatus::Tramitada)
        );

        notifier.fail_status_updates(false);
        let second = run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await
        .expect("second sync");
        assert_eq!(second.sent, 0);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn snapshot_save_failure_is_fatal() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        store
            .append_record(&make_record("t1", TicketStatus::Tramitada, 1))
            .unwrap();
        store.fail_snapshot_saves(true);

        let result = run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await;

        let err = result.expect_err("save failure must surface");
        assert!(err.to_string().contains("persisting status snapshot"));
        // The notification itself went out before the failure.
        assert_eq!(notifier.status_updates().len(), 1);
    }

    #[tokio::test]
    async fn deleted_tickets_leave_the_snapshot() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();

        // A stale entry for a ticket that no longer exists in the store.
        let mut stale = crate::types::SnapshotMap::new();
        stale.insert("t-gone".to_string(), TicketStatus::Tramitada);
        crate::store::SnapshotStore::save(&store, &stale).unwrap();

        store
            .append_record(&make_record("t1", TicketStatus::Tramitada, 1))
            .unwrap();

        run_status_sync(
            &store,
            &store,
            &notifier,
            &TrackingConfig::default(),
            Utc::now(),
        )
        .await
        .expect("sync");

        let saved = crate::store::SnapshotStore::load(&store).unwrap();
        assert!(!saved.contains_key("t-gone"));
        assert!(saved.contains_key("t1"));
    }
}
