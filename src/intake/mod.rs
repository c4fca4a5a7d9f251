//! Intake pipeline: webhook payload → duplicate check → stored ticket
//!
//! - `webhook`: payload parsing with per-field graceful degradation
//! - `similarity` / `dedup`: the duplicate-detection decision function
//! - `pipeline`: orchestration (create ticket, send confirmations)

mod dedup;
mod pipeline;
pub mod similarity;
mod webhook;

pub use dedup::{
    DedupConfig, DedupScope, DedupVerdict, DuplicateChecker, FactorScore, FieldWeights,
};
pub use pipeline::{process_submission, IntakeError, IntakeOutcome, IntakeReport};
pub use webhook::{looks_like_email, parse_submission, WebhookError};
