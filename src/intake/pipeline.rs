//! Intake pipeline - webhook payload to stored ticket
//!
//! Processing sequence for one submission:
//!
//! ```text
//! PHASE 1: Webhook parsing (graceful per-field degradation)
//! PHASE 2: Duplicate check (gates everything below)
//! PHASE 3: Ticket creation (UUID v4, Recibida, append to store)
//! PHASE 4: Client confirmation email
//! PHASE 5: Admin alert email
//! ```
//!
//! A duplicate verdict suppresses phases 3-5 entirely. Email failures in
//! phases 4-5 are logged and reflected in the report without aborting the
//! run; a store failure in phase 3 is fatal.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dedup::{DedupConfig, DedupScope, DedupVerdict, DuplicateChecker};
use super::webhook::{looks_like_email, parse_submission, WebhookError};
use crate::notify::Notifier;
use crate::store::{RecordStore, StoreError};
use crate::types::WarrantyRecord;

/// Intake pipeline errors
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("webhook payload: {0}")]
    Webhook(#[from] WebhookError),

    #[error("submission carries no recognizable brand")]
    UnknownBrand,

    #[error("record store: {0}")]
    Store(#[from] StoreError),
}

/// What the pipeline decided for one submission.
#[derive(Debug, Clone)]
pub enum IntakeOutcome {
    /// A new ticket was created.
    Created { ticket_id: String },
    /// The submission duplicates an existing ticket; nothing was created
    /// and no emails were sent.
    SuppressedDuplicate { ticket_id: String, score: f64 },
}

/// Full report of one intake run.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    pub outcome: IntakeOutcome,
    pub confirmation_sent: bool,
    pub admin_notified: bool,
}

/// Process one webhook payload end to end.
pub async fn process_submission(
    payload: &Value,
    records: &dyn RecordStore,
    notifier: &dyn Notifier,
    config: &DedupConfig,
) -> Result<IntakeReport, IntakeError> {
    let submission = parse_submission(payload)?;
    let brand = submission.brand.ok_or(IntakeError::UnknownBrand)?;

    if !looks_like_email(&submission.client_email) {
        warn!(
            email = %submission.client_email,
            "Client email looks implausible, confirmation may bounce"
        );
    }

    // The checker skips foreign partitions itself under Brand scope, but
    // listing only the relevant partition keeps large stores cheap.
    let existing = match config.scope {
        DedupScope::Brand => records.list_records(Some(brand))?,
        DedupScope::Global => records.list_records(None)?,
    };

    let checker = DuplicateChecker::new(config.clone());
    match checker.check(&submission, &existing) {
        DedupVerdict::Duplicate {
            ticket_id,
            score,
            factors,
        } => {
            warn!(
                duplicate_of = %ticket_id,
                score = %format!("{score:.3}"),
                threshold = config.threshold,
                "Duplicate submission detected, intake suppressed"
            );
            for factor in &factors {
                info!(
                    field = factor.field,
                    score = %format!("{:.3}", factor.score),
                    weight = factor.weight,
                    "Duplicate factor"
                );
            }
            return Ok(IntakeReport {
                outcome: IntakeOutcome::SuppressedDuplicate { ticket_id, score },
                confirmation_sent: false,
                admin_notified: false,
            });
        }
        DedupVerdict::Unique { best_score } => {
            info!(
                best_score = %format!("{best_score:.3}"),
                existing = existing.len(),
                "No duplicate found"
            );
        }
    }

    let ticket_id = Uuid::new_v4().to_string();
    let record = WarrantyRecord::from_submission(submission, brand, ticket_id.clone(), Utc::now());
    records.append_record(&record)?;
    info!(ticket_id = %ticket_id, brand = %brand, "Ticket created");

    let confirmation_sent = match notifier.intake_confirmation(&record).await {
        Ok(()) => true,
        Err(e) => {
            error!(ticket_id = %ticket_id, stage = "intake_confirmation", error = %e, "Confirmation email failed");
            false
        }
    };

    let admin_notified = match notifier.intake_admin_alert(&record).await {
        Ok(()) => true,
        Err(e) => {
            error!(ticket_id = %ticket_id, stage = "intake_admin_alert", error = %e, "Admin alert failed");
            false
        }
    };

    Ok(IntakeReport {
        outcome: IntakeOutcome::Created { ticket_id },
        confirmation_sent,
        admin_notified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{RecordingNotifier, SentMessage};
    use crate::store::InMemoryStore;
    use crate::types::Brand;
    use serde_json::json;

    fn payload(email: &str, model: &str, issue: &str) -> Value {
        json!({
            "fields": {
                "Empresa": "Bicis Taller S.L.",
                "Email": email,
                "Marca del Producto": "Conway",
                "Modelo": model,
                "Descripción del problema": issue
            }
        })
    }

    #[tokio::test]
    async fn unique_submission_creates_ticket_and_notifies() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();

        let report = process_submission(
            &payload("a@x.com", "Cairon C 2.0 500", "ruido en la transmisión"),
            &store,
            &notifier,
            &DedupConfig::default(),
        )
        .await
        .expect("intake");

        let ticket_id = match report.outcome {
            IntakeOutcome::Created { ticket_id } => ticket_id,
            IntakeOutcome::SuppressedDuplicate { .. } => panic!("expected creation"),
        };
        assert!(report.confirmation_sent);
        assert!(report.admin_notified);

        let stored = store.list_records(Some(Brand::Conway)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ticket_id, ticket_id);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], SentMessage::IntakeConfirmation { ticket_id: t, .. } if *t == ticket_id));
        assert!(matches!(&sent[1], SentMessage::IntakeAdminAlert { ticket_id: t } if *t == ticket_id));
    }

    #[tokio::test]
    async fn duplicate_submission_is_suppressed() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        let config = DedupConfig::default();

        let first = process_submission(
            &payload("a@x.com", "SN123", "ruido de frenos"),
            &store,
            &notifier,
            &config,
        )
        .await
        .expect("first intake");
        let first_id = match first.outcome {
            IntakeOutcome::Created { ticket_id } => ticket_id,
            IntakeOutcome::SuppressedDuplicate { .. } => panic!("first must create"),
        };

        let second = process_submission(
            &payload("a@x.com", "SN123", "ruido de frenos"),
            &store,
            &notifier,
            &config,
        )
        .await
        .expect("second intake");

        match second.outcome {
            IntakeOutcome::SuppressedDuplicate { ticket_id, score } => {
                assert_eq!(ticket_id, first_id);
                assert_eq!(score, 1.0);
            }
            IntakeOutcome::Created { .. } => panic!("resubmission must be suppressed"),
        }
        assert!(!second.confirmation_sent);
        assert!(!second.admin_notified);

        // Still exactly one record, exactly two emails (from the first run).
        assert_eq!(store.list_records(None).unwrap().len(), 1);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn missing_brand_is_an_intake_error() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        let bad = json!({ "fields": { "Email": "a@x.com" } });

        let result =
            process_submission(&bad, &store, &notifier, &DedupConfig::default()).await;
        assert!(matches!(result, Err(IntakeError::UnknownBrand)));
        assert!(store.list_records(None).unwrap().is_empty());
    }
}
