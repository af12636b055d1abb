//! Mock email provider for testing.

use crate::error::{Result, TicketsError};
use crate::providers::EmailProvider;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// A delivered (recorded) email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

#[derive(Debug, Default)]
struct MockEmailState {
    sent: Vec<SentEmail>,
    failing_recipients: Vec<String>,
}

/// Mock email provider.
///
/// Records every delivery. Recipients registered with
/// [`MockEmailProvider::fail_for`] get a [`TicketsError::Delivery`] instead.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockEmailProvider {
    state: Arc<Mutex<MockEmailState>>,
}

impl MockEmailProvider {
    /// Create a provider that accepts every email.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject deliveries to `recipient`.
    pub fn fail_for(&self, recipient: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_recipients.push(recipient.into());
        }
    }

    /// Emails accepted so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.state
            .lock()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }
}

impl EmailProvider for MockEmailProvider {
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self
            .state
            .lock()
            .map_err(|_| TicketsError::Delivery("Mutex lock failed".to_string()))
            .and_then(|mut state| {
                if state.failing_recipients.iter().any(|r| r == to) {
                    return Err(TicketsError::Delivery(format!("mailbox {to} unavailable")));
                }
                state.sent.push(SentEmail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    html_body: html_body.to_string(),
                });
                Ok(())
            });
        async move { result }
    }
}
