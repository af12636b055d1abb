//! Provider selected at startup from configuration.

use crate::config::{EmailConfig, EmailProviderKind};
use crate::error::Result;
use crate::providers::{ConsoleEmailProvider, EmailProvider, SmtpEmailProvider};

/// Either SMTP delivery or console logging, chosen by `EMAIL_PROVIDER`.
#[derive(Debug, Clone)]
pub enum ConfiguredEmailProvider {
    /// Real delivery
    Smtp(SmtpEmailProvider),
    /// Development logging
    Console(ConsoleEmailProvider),
}

impl ConfiguredEmailProvider {
    /// Build the configured provider.
    #[must_use]
    pub fn from_config(config: &EmailConfig) -> Self {
        match config.provider {
            EmailProviderKind::Smtp => Self::Smtp(SmtpEmailProvider::new(config)),
            EmailProviderKind::Console => Self::Console(ConsoleEmailProvider::new()),
        }
    }
}

impl EmailProvider for ConfiguredEmailProvider {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        match self {
            Self::Smtp(provider) => provider.send_email(to, subject, html_body).await,
            Self::Console(provider) => provider.send_email(to, subject, html_body).await,
        }
    }
}
