//! Error types for the invoicing session client.

use thiserror::Error;

/// Result type alias for invoicing operations.
pub type Result<T> = std::result::Result<T, InvoicingError>;

/// Errors that can occur when talking to the external invoicing service.
///
/// Every variant except [`InvoicingError::Remote`] on a single write is fatal
/// for a reconciliation cycle; the next cycle starts over with a fresh session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoicingError {
    /// Login was rejected (bad credentials or session refused).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Navigation or subunit lookup failed after login.
    #[error("Bootstrap failed at {stage}: {reason}")]
    Bootstrap {
        /// Which bootstrap resource failed (`navigation` or `subunits`)
        stage: &'static str,
        /// Failure description
        reason: String,
    },

    /// Network-level failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Service answered 200 with `success: false` in the body.
    #[error("Remote error: {title}: {message}")]
    Remote {
        /// `error_title` from the response body
        title: String,
        /// `error_message` from the response body
        message: String,
    },

    /// Service answered with a non-success status.
    #[error("Unexpected status {status} from {endpoint}: {body}")]
    UnexpectedStatus {
        /// Endpoint that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body could not be decoded.
    #[error("Response parsing failed: {0}")]
    Parse(String),
}

impl InvoicingError {
    /// Returns `true` for network-level failures, timeouts included.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Builds a transport or timeout error from a `reqwest` failure.
    pub(crate) fn from_reqwest(endpoint: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(endpoint.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Why a merchant invoice number could not be decoded into a purchase request id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceNumberError {
    /// Not exactly two whitespace-separated tokens.
    #[error("expected 2 tokens, found {0}")]
    WrongTokenCount(usize),

    /// First token is not the purchase request prefix.
    #[error("unexpected prefix {0:?}")]
    WrongPrefix(String),

    /// Second token is not an integer.
    #[error("invalid purchase request id {0:?}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(InvoicingError::Transport("reset".into()).is_transport());
        assert!(InvoicingError::Timeout("/list".into()).is_transport());
        assert!(!InvoicingError::Auth("bad password".into()).is_transport());
        assert!(
            !InvoicingError::Remote {
                title: "Oops".into(),
                message: "nope".into()
            }
            .is_transport()
        );
    }
}
