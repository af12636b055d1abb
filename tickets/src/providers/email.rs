//! Email provider trait.

use crate::error::Result;
use std::future::Future;

/// Email provider.
///
/// Abstracts over the delivery mechanism (SMTP, console, test recorder).
pub trait EmailProvider: Send + Sync {
    /// Send an HTML email.
    ///
    /// # Arguments
    ///
    /// - `to`: Recipient email address
    /// - `subject`: Subject line
    /// - `html_body`: HTML body
    ///
    /// # Errors
    ///
    /// Returns [`crate::TicketsError::Delivery`] if:
    /// - An address cannot be parsed
    /// - The transport rejects the message
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
