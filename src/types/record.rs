//! Warranty records and parsed form submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Brand, TicketStatus};

/// One warranty claim as stored in the record store.
///
/// `ticket_id` and `submitted_at` are set once at creation and never change.
/// `status` is mutated out-of-band by staff; the intake pipeline never
/// writes it after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarrantyRecord {
    pub ticket_id: String,
    pub brand: Brand,
    pub status: TicketStatus,
    pub submitted_at: DateTime<Utc>,
    pub client_email: String,
    pub client_name: String,
    #[serde(default)]
    pub tax_id: String,
    pub product_model: String,
    #[serde(default)]
    pub product_size: String,
    #[serde(default)]
    pub manufacture_year: String,
    #[serde(default)]
    pub product_condition: String,
    pub issue_description: String,
    #[serde(default)]
    pub proposed_solution: String,
}

impl WarrantyRecord {
    /// Build a fresh `Recibida` record from a parsed submission.
    ///
    /// The caller supplies the ticket id (already checked for uniqueness)
    /// and the intake timestamp.
    pub fn from_submission(
        submission: WarrantySubmission,
        brand: Brand,
        ticket_id: String,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            brand,
            status: TicketStatus::Recibida,
            submitted_at,
            client_email: submission.client_email,
            client_name: submission.client_name,
            tax_id: submission.tax_id,
            product_model: submission.product_model,
            product_size: submission.product_size,
            manufacture_year: submission.manufacture_year,
            product_condition: submission.product_condition,
            issue_description: submission.issue_description,
            proposed_solution: submission.proposed_solution,
        }
    }
}

/// A parsed form submission that has not been assigned a ticket yet.
///
/// Every field the form omitted is the empty string; the webhook parser
/// degrades malformed values instead of failing (a single bad field must
/// not block intake).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarrantySubmission {
    /// `None` when the form carried no recognizable brand.
    pub brand: Option<Brand>,
    pub client_email: String,
    pub client_name: String,
    pub tax_id: String,
    pub product_model: String,
    pub product_size: String,
    pub manufacture_year: String,
    pub product_condition: String,
    pub issue_description: String,
    pub proposed_solution: String,
}
