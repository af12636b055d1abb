//! SMTP email provider implementation using Lettre.

use crate::config::EmailConfig;
use crate::error::{Result, TicketsError};
use crate::providers::EmailProvider;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP email provider using Lettre.
///
/// # Configuration
///
/// - `smtp_server`: SMTP relay address (e.g., "smtp.gmail.com")
/// - `smtp_port`: usually 587 for STARTTLS
/// - `smtp_username` / `smtp_password`: relay credentials
/// - `from_email` / `from_name`: sender
#[derive(Clone)]
pub struct SmtpEmailProvider {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl SmtpEmailProvider {
    /// Create a provider from the email section of the configuration.
    #[must_use]
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            smtp_server: config.smtp_server.clone(),
            smtp_port: config.smtp_port,
            credentials: Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Build a fresh transport per message; the relay connection is not pooled.
    fn build_transport(&self) -> Result<SmtpTransport> {
        let transport = SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| TicketsError::Delivery(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build();
        Ok(transport)
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    fn build_message(&self, to: &str, subject: &str, html_body: &str) -> Result<Message> {
        Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| TicketsError::Delivery(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| TicketsError::Delivery(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| TicketsError::Delivery(format!("Failed to build email: {e}")))
    }
}

impl std::fmt::Debug for SmtpEmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailProvider")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("from_email", &self.from_email)
            .finish_non_exhaustive()
    }
}

impl EmailProvider for SmtpEmailProvider {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let email = self.build_message(to, subject, html_body)?;
        let mailer = self.build_transport()?;

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| TicketsError::Delivery(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| TicketsError::Delivery(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailProviderKind;

    fn provider() -> SmtpEmailProvider {
        SmtpEmailProvider::new(&EmailConfig {
            provider: EmailProviderKind::Smtp,
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
            smtp_username: "user".into(),
            smtp_password: "pass".into(),
            from_email: "gala@example.com".into(),
            from_name: "Year End Gala".into(),
        })
    }

    #[test]
    fn test_invalid_recipient_rejected_before_sending() {
        let result = provider().build_message("not an address", "Tickets", "<p>hi</p>");
        assert!(matches!(result, Err(TicketsError::Delivery(_))));
    }

    #[test]
    fn test_message_builds() {
        assert!(provider()
            .build_message("ada@example.com", "Tickets", "<p>hi</p>")
            .is_ok());
        assert!(!format!("{:?}", provider()).contains("pass"));
    }
}
