//! Warranty Lifecycle Integration Tests
//!
//! Exercises both pipelines end to end against the in-memory store and the
//! recording notifier: intake with duplicate suppression, the full
//! Recibida → Tramitada → Aceptada notification lifecycle, idempotence
//! across runs, and persistence-failure surfacing.

use chrono::Utc;
use serde_json::{json, Value};

use garantias::config::TrackingConfig;
use garantias::intake::{process_submission, DedupConfig, IntakeOutcome};
use garantias::notify::{RecordingNotifier, SentMessage};
use garantias::status::run_status_sync;
use garantias::store::{InMemoryStore, RecordStore, SnapshotStore};
use garantias::types::TicketStatus;

fn webhook_payload(email: &str, model: &str, issue: &str) -> Value {
    json!({
        "eventType": "form-submission",
        "fields": {
            "Empresa": "Bicis Taller S.L.",
            "NIF/CIF/VAT": "B12345678",
            "Email": email,
            "Marca del Producto": "Conway",
            "Modelo": model,
            "Talla": "M",
            "Descripción del problema": issue
        }
    })
}

async fn intake_ticket(store: &InMemoryStore, notifier: &RecordingNotifier, payload: &Value) -> String {
    let report = process_submission(payload, store, notifier, &DedupConfig::default())
        .await
        .expect("intake");
    match report.outcome {
        IntakeOutcome::Created { ticket_id } => ticket_id,
        IntakeOutcome::SuppressedDuplicate { .. } => panic!("expected a fresh ticket"),
    }
}

async fn sync(store: &InMemoryStore, notifier: &RecordingNotifier) -> garantias::notify::RunSummary {
    run_status_sync(store, store, notifier, &TrackingConfig::default(), Utc::now())
        .await
        .expect("status sync")
}

#[tokio::test]
async fn full_lifecycle_notifies_each_transition_exactly_once() {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();

    let payload = webhook_payload("taller@example.com", "Cairon C 2.0 500", "ruido de frenos");
    let ticket_id = intake_ticket(&store, &notifier, &payload).await;

    // Freshly created tickets are Recibida: the first sync is silent.
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.changes_detected, 0);
    assert!(notifier.status_updates().is_empty());

    // Staff move the ticket forward: exactly one notification.
    store.set_status(&ticket_id, TicketStatus::Tramitada).unwrap();
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 1);
    assert_eq!(
        notifier.status_updates().last(),
        Some(&SentMessage::StatusUpdate {
            ticket_id: ticket_id.clone(),
            email: "taller@example.com".to_string(),
            status: TicketStatus::Tramitada,
        })
    );

    // No change since: the next run is silent (idempotence).
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 0);
    assert_eq!(notifier.status_updates().len(), 1);

    // Terminal transition: one notification, then the ticket is pruned.
    store.set_status(&ticket_id, TicketStatus::Aceptada).unwrap();
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 1);
    assert!(!SnapshotStore::load(&store).unwrap().contains_key(&ticket_id));

    // Still terminal on the following run: silence.
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 0);
    assert_eq!(notifier.status_updates().len(), 2);
}

#[tokio::test]
async fn resubmitted_claim_is_suppressed_as_duplicate() {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();

    let payload = webhook_payload("taller@example.com", "SN123", "brake noise");
    let original = intake_ticket(&store, &notifier, &payload).await;

    // Same client, same product, paraphrased issue text.
    let retry = webhook_payload("taller@example.com", "SN123", "brakes are noisy");
    let report = process_submission(&retry, &store, &notifier, &DedupConfig::default())
        .await
        .expect("intake");

    match report.outcome {
        IntakeOutcome::SuppressedDuplicate { ticket_id, score } => {
            assert_eq!(ticket_id, original);
            assert!(score >= 0.75, "near-identical claim must clear the threshold, got {score}");
        }
        IntakeOutcome::Created { .. } => panic!("resubmission must be suppressed"),
    }
    assert_eq!(store.list_records(None).unwrap().len(), 1);
}

#[tokio::test]
async fn first_observation_already_terminal_is_notified_then_pruned() {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();

    let ticket_id = intake_ticket(
        &store,
        &notifier,
        &webhook_payload("b@y.com", "AS2 Pro", "no carga"),
    )
    .await;

    // Desk resolves the claim before the first sync ever saw Tramitada.
    store.set_status(&ticket_id, TicketStatus::Denegada).unwrap();

    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 1);
    assert_eq!(
        notifier.status_updates().last(),
        Some(&SentMessage::StatusUpdate {
            ticket_id: ticket_id.clone(),
            email: "b@y.com".to_string(),
            status: TicketStatus::Denegada,
        })
    );
    assert!(SnapshotStore::load(&store).unwrap().is_empty());

    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 0);
}

#[tokio::test]
async fn snapshot_save_failure_surfaces_after_notifications() {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();

    let ticket_id = intake_ticket(
        &store,
        &notifier,
        &webhook_payload("c@z.com", "GFX", "grieta en vaina"),
    )
    .await;
    store.set_status(&ticket_id, TicketStatus::Tramitada).unwrap();
    store.fail_snapshot_saves(true);

    let result = run_status_sync(
        &store,
        &store,
        &notifier,
        &TrackingConfig::default(),
        Utc::now(),
    )
    .await;

    // The email went out, the save failed, and the caller hears about it.
    // At-least-once delivery is the accepted risk here.
    assert!(result.is_err());
    assert_eq!(notifier.status_updates().len(), 1);

    // Recovery: once saves work again, the same transition notifies once
    // more (the snapshot never recorded it) and then goes quiet.
    store.fail_snapshot_saves(false);
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 1);
    let summary = sync(&store, &notifier).await;
    assert_eq!(summary.sent, 0);
}
