//! Ticket delivery emails.

use crate::providers::EmailProvider;
use crate::types::Ticket;
use tracing::{info, warn};

/// Sends one email per issued ticket.
///
/// The purchaser's email (the first ticket) also lists every other ticket of
/// the group. Delivery failures are logged and counted, never retried, and
/// never undo issuance.
#[derive(Debug, Clone)]
pub struct TicketMailer<E> {
    provider: E,
    base_url: String,
    event_name: String,
}

impl<E: EmailProvider> TicketMailer<E> {
    /// Create a mailer linking tickets under `base_url`.
    pub fn new(provider: E, base_url: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            event_name: event_name.into(),
        }
    }

    /// Subject line of every ticket email.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("{} Tickets", self.event_name)
    }

    /// HTML body for the ticket at `index` of an issued set.
    #[must_use]
    pub fn render(&self, tickets: &[Ticket], index: usize) -> String {
        let Some(ticket) = tickets.get(index) else {
            return String::new();
        };
        let mut body = format!(
            "<p>Hey {},</p><p>Here's your tickets for {}:</p><p>",
            ticket.holder.first_name, self.event_name
        );
        body.push_str(&ticket.html(&self.base_url));
        if index == 0 {
            for other in &tickets[1..] {
                body.push_str(&other.html(&self.base_url));
            }
        }
        body.push_str("</p><p>See you there!</p>");
        body
    }

    /// Email every holder of an issued set. Returns how many emails were
    /// accepted by the provider.
    pub async fn notify(&self, tickets: &[Ticket]) -> usize {
        let subject = self.subject();
        let mut delivered = 0;

        for (index, ticket) in tickets.iter().enumerate() {
            if ticket.holder.email.is_empty() {
                warn!(ticket_id = %ticket.id, "Ticket holder has no email address, skipping");
                metrics::counter!("notification.failures").increment(1);
                continue;
            }

            let body = self.render(tickets, index);
            match self.provider.send_email(&ticket.holder.email, &subject, &body).await {
                Ok(()) => {
                    delivered += 1;
                    info!(ticket_id = %ticket.id, to = %ticket.holder.email, "Ticket email sent");
                }
                Err(e) => {
                    metrics::counter!("notification.failures").increment(1);
                    warn!(
                        ticket_id = %ticket.id,
                        to = %ticket.holder.email,
                        error = %e,
                        "Failed to send ticket email"
                    );
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockEmailProvider;
    use crate::types::{Contact, TicketId};
    use chrono::Utc;

    const BASE: &str = "https://gala.example.org";

    fn ticket(id: &str, first: &str, email: &str) -> Ticket {
        Ticket {
            id: TicketId(id.into()),
            purchase_request_id: Some(1),
            holder: Contact {
                first_name: first.into(),
                last_name: "Doe".into(),
                email: email.into(),
                ..Contact::default()
            },
            created_at: Utc::now(),
        }
    }

    fn group() -> Vec<Ticket> {
        vec![
            ticket("one-two-three", "Jane", "jane@example.com"),
            ticket("four-five-six", "John", "john@example.com"),
        ]
    }

    #[test]
    fn test_first_ticket_lists_whole_group() {
        let mailer = TicketMailer::new(MockEmailProvider::new(), BASE, "Year End Gala");
        let body = mailer.render(&group(), 0);

        assert_eq!(
            body,
            "<p>Hey Jane,</p><p>Here's your tickets for Year End Gala:</p><p>\
             Jane Doe <a href=\"https://gala.example.org/ticket/one-two-three\">https://gala.example.org/ticket/one-two-three</a><br>\
             John Doe <a href=\"https://gala.example.org/ticket/four-five-six\">https://gala.example.org/ticket/four-five-six</a><br>\
             </p><p>See you there!</p>"
        );
    }

    #[test]
    fn test_member_ticket_lists_only_own() {
        let mailer = TicketMailer::new(MockEmailProvider::new(), BASE, "Year End Gala");
        let body = mailer.render(&group(), 1);

        assert!(body.starts_with("<p>Hey John,</p>"));
        assert!(body.contains("four-five-six"));
        assert!(!body.contains("one-two-three"));
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_others() {
        let provider = MockEmailProvider::new();
        provider.fail_for("jane@example.com");
        let mailer = TicketMailer::new(provider.clone(), BASE, "Year End Gala");

        let delivered = mailer.notify(&group()).await;

        assert_eq!(delivered, 1);
        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "john@example.com");
        assert_eq!(sent[0].subject, "Year End Gala Tickets");
    }

    #[tokio::test]
    async fn test_blank_member_email_skipped() {
        let provider = MockEmailProvider::new();
        let mailer = TicketMailer::new(provider.clone(), BASE, "Year End Gala");
        let tickets = vec![ticket("a-b-c", "Jane", "jane@example.com"), ticket("d-e-f", "", "")];

        assert_eq!(mailer.notify(&tickets).await, 1);
        assert_eq!(provider.sent().len(), 1);
    }
}
