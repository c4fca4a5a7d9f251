//! Client and admin email notifications
//!
//! The pipelines talk to a `Notifier` trait so delivery stays swappable:
//! - `SmtpNotifier`: production delivery over SMTPS (lettre)
//! - `RecordingNotifier`: captures every send for assertions in tests
//!
//! Per-notification outcomes are reported to the caller; the notifier never
//! retries on its own.

mod smtp;

pub use smtp::SmtpNotifier;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{Brand, TicketStatus, WarrantyRecord};

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid mailbox `{address}`: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("message build failed: {0}")]
    Message(String),

    #[error("smtp transport: {0}")]
    Transport(String),

    #[error("notifier misconfigured: {0}")]
    Config(String),
}

/// Outcome of one status-sync run, for the desk summary email.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Tickets that entered the diff after filtering.
    pub tickets_seen: usize,
    /// Transitions that required a notification.
    pub changes_detected: usize,
    pub sent: usize,
    pub failed: usize,
    pub failed_tickets: Vec<FailedNotification>,
}

/// One notification that could not be delivered this run.
#[derive(Debug, Clone)]
pub struct FailedNotification {
    pub ticket_id: String,
    pub status: TicketStatus,
    pub error: String,
}

/// Outbound notification seam.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the client their ticket entered `new_status`.
    async fn status_update(
        &self,
        ticket_id: &str,
        email: &str,
        brand: Brand,
        new_status: TicketStatus,
    ) -> Result<(), NotifyError>;

    /// Confirm a freshly created ticket to the client.
    async fn intake_confirmation(&self, record: &WarrantyRecord) -> Result<(), NotifyError>;

    /// Alert the desk that a new claim arrived.
    async fn intake_admin_alert(&self, record: &WarrantyRecord) -> Result<(), NotifyError>;

    /// Send the end-of-run summary to the desk.
    async fn admin_summary(&self, summary: &RunSummary) -> Result<(), NotifyError>;
}

/// A message captured by `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    StatusUpdate {
        ticket_id: String,
        email: String,
        status: TicketStatus,
    },
    IntakeConfirmation {
        ticket_id: String,
        email: String,
    },
    IntakeAdminAlert {
        ticket_id: String,
    },
    AdminSummary {
        sent: usize,
        failed: usize,
    },
}

/// Notifier that records every send instead of delivering it.
///
/// The failure switch makes `status_update` fail, to exercise the
/// per-ticket failure path without a mail server.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail_status_updates: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Status updates only, in order.
    pub fn status_updates(&self) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| matches!(m, SentMessage::StatusUpdate { .. }))
            .collect()
    }

    fn record(&self, message: SentMessage) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn status_update(
        &self,
        ticket_id: &str,
        email: &str,
        _brand: Brand,
        new_status: TicketStatus,
    ) -> Result<(), NotifyError> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("injected send failure".to_string()));
        }
        self.record(SentMessage::StatusUpdate {
            ticket_id: ticket_id.to_string(),
            email: email.to_string(),
            status: new_status,
        });
        Ok(())
    }

    async fn intake_confirmation(&self, record: &WarrantyRecord) -> Result<(), NotifyError> {
        self.record(SentMessage::IntakeConfirmation {
            ticket_id: record.ticket_id.clone(),
            email: record.client_email.clone(),
        });
        Ok(())
    }

    async fn intake_admin_alert(&self, record: &WarrantyRecord) -> Result<(), NotifyError> {
        self.record(SentMessage::IntakeAdminAlert {
            ticket_id: record.ticket_id.clone(),
        });
        Ok(())
    }

    async fn admin_summary(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        self.record(SentMessage::AdminSummary {
            sent: summary.sent,
            failed: summary.failed,
        });
        Ok(())
    }
}
