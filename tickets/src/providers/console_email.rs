//! Console email provider for development.

use crate::error::Result;
use crate::providers::EmailProvider;
use tracing::info;

/// Logs emails instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEmailProvider;

impl ConsoleEmailProvider {
    /// Create a new console email provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EmailProvider for ConsoleEmailProvider {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(to = %to, subject = %subject, "📧 Ticket email (development mode)");
        println!("\n=== EMAIL to {to} ===");
        println!("Subject: {subject}\n");
        println!("{html_body}");
        println!("=====================\n");
        Ok(())
    }
}
