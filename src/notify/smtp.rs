//! SMTP delivery over lettre
//!
//! Plain-text Spanish notifications, one per lifecycle event. Wording is
//! deliberately minimal: the desk owns the full template set elsewhere,
//! and this module only guarantees the ticket id, brand and status reach
//! the client.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{Notifier, NotifyError, RunSummary};
use crate::config::{CompanyConfig, SmtpConfig};
use crate::types::{Brand, TicketStatus, WarrantyRecord};

/// Production notifier: SMTPS relay with username/password auth.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin: Option<Mailbox>,
    company: String,
}

impl SmtpNotifier {
    /// Build the notifier from configuration.
    ///
    /// Fails fast on an unusable configuration (missing host, unparseable
    /// sender) instead of failing per message mid-run.
    pub fn from_config(smtp: &SmtpConfig, company: &CompanyConfig) -> Result<Self, NotifyError> {
        if smtp.host.is_empty() {
            return Err(NotifyError::Config("smtp.host is not set".to_string()));
        }

        let from_address = if smtp.from.is_empty() {
            &smtp.username
        } else {
            &smtp.from
        };
        let from = parse_mailbox(from_address)?;

        let admin = if company.admin_email.is_empty() {
            None
        } else {
            Some(parse_mailbox(&company.admin_email)?)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from,
            admin,
            company: company.name.clone(),
        })
    }

    async fn deliver(&self, to: Mailbox, subject: &str, body: String) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }

    fn admin_mailbox(&self) -> Result<Mailbox, NotifyError> {
        self.admin
            .clone()
            .ok_or_else(|| NotifyError::Config("company.admin_email is not set".to_string()))
    }
}

/// Subject line for a status transition, matching the desk's vocabulary.
fn subject_for(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Recibida => "Confirmación de Solicitud de Garantía",
        TicketStatus::Tramitada => "Actualización de Garantía - En Tramitación",
        TicketStatus::Aceptada => "Garantía Aceptada - Siguiente Paso",
        TicketStatus::Denegada => "Resolución de Garantía - Información Importante",
    }
}

fn status_body(company: &str, ticket_id: &str, brand: Brand, status: TicketStatus) -> String {
    let situation = match status {
        TicketStatus::Recibida => "ha sido registrada",
        TicketStatus::Tramitada => "se encuentra en tramitación",
        TicketStatus::Aceptada => "ha sido ACEPTADA",
        TicketStatus::Denegada => "no ha podido ser aprobada",
    };
    format!(
        "Estimado cliente,\n\n\
         Su solicitud de garantía {situation}.\n\n\
         Ticket: {ticket_id}\n\
         Marca: {brand}\n\
         Estado actual: {status}\n\n\
         Conserve su número de ticket para futuras consultas.\n\n\
         Saludos cordiales,\n\
         El equipo de {company}\n"
    )
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn status_update(
        &self,
        ticket_id: &str,
        email: &str,
        brand: Brand,
        new_status: TicketStatus,
    ) -> Result<(), NotifyError> {
        let to = parse_mailbox(email)?;
        let body = status_body(&self.company, ticket_id, brand, new_status);
        self.deliver(to, subject_for(new_status), body).await?;
        info!(ticket_id, email, status = %new_status, "Status update email sent");
        Ok(())
    }

    async fn intake_confirmation(&self, record: &WarrantyRecord) -> Result<(), NotifyError> {
        let to = parse_mailbox(&record.client_email)?;
        let body = status_body(
            &self.company,
            &record.ticket_id,
            record.brand,
            TicketStatus::Recibida,
        );
        self.deliver(to, subject_for(TicketStatus::Recibida), body)
            .await?;
        info!(ticket_id = %record.ticket_id, "Intake confirmation email sent");
        Ok(())
    }

    async fn intake_admin_alert(&self, record: &WarrantyRecord) -> Result<(), NotifyError> {
        let to = self.admin_mailbox()?;
        let subject = format!("Nueva solicitud de garantía - {}", record.brand);
        let body = format!(
            "Nueva solicitud de garantía recibida.\n\n\
             Ticket: {}\n\
             Marca: {}\n\
             Empresa: {}\n\
             Email: {}\n\
             Modelo: {}\n\n\
             Problema:\n{}\n",
            record.ticket_id,
            record.brand,
            record.client_name,
            record.client_email,
            record.product_model,
            record.issue_description,
        );
        self.deliver(to, &subject, body).await?;
        info!(ticket_id = %record.ticket_id, "Intake admin alert sent");
        Ok(())
    }

    async fn admin_summary(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        let to = self.admin_mailbox()?;
        let mut body = format!(
            "Resumen diario de notificaciones de estado de garantía.\n\n\
             Tickets evaluados: {}\n\
             Cambios detectados: {}\n\
             Enviadas correctamente: {}\n\
             Fallidas: {}\n",
            summary.tickets_seen, summary.changes_detected, summary.sent, summary.failed,
        );
        if !summary.failed_tickets.is_empty() {
            body.push_str("\nNotificaciones fallidas:\n");
            for failure in &summary.failed_tickets {
                body.push_str(&format!(
                    "- {} ({}): {}\n",
                    failure.ticket_id, failure.status, failure.error
                ));
            }
        }
        self.deliver(to, "Estado de Garantía - Resumen Diario", body)
            .await?;
        info!(sent = summary.sent, failed = summary.failed, "Admin summary sent");
        Ok(())
    }
}
