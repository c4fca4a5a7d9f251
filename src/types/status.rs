//! Ticket lifecycle statuses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Persisted tracking state: `ticket_id → last observed status`.
///
/// Absence of an entry means "not yet tracked" or "terminal and pruned".
pub type SnapshotMap = BTreeMap<String, TicketStatus>;

/// Lifecycle status of a warranty ticket.
///
/// Staff move tickets forward out-of-band; this system only ever reads the
/// status. Expected forward order:
/// `Recibida` → `Tramitada` → `Aceptada` | `Denegada`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum TicketStatus {
    /// Intake baseline. Never triggers a client notification on its own.
    #[default]
    Recibida,
    /// Under review by the warranty desk.
    Tramitada,
    /// Claim accepted. Terminal.
    Aceptada,
    /// Claim denied. Terminal.
    Denegada,
}

impl TicketStatus {
    /// Stored spelling, matching the original spreadsheet vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Recibida => "Recibida",
            TicketStatus::Tramitada => "Tramitada",
            TicketStatus::Aceptada => "Aceptada",
            TicketStatus::Denegada => "Denegada",
        }
    }

    /// Parse from staff/CLI input (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "recibida" => Some(TicketStatus::Recibida),
            "tramitada" => Some(TicketStatus::Tramitada),
            "aceptada" => Some(TicketStatus::Aceptada),
            "denegada" => Some(TicketStatus::Denegada),
            _ => None,
        }
    }

    /// Whether entering this status must notify the client.
    pub fn is_notifiable(self) -> bool {
        !matches!(self, TicketStatus::Recibida)
    }

    /// Whether this status ends the ticket lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Aceptada | TicketStatus::Denegada)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
