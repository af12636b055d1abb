//! Error types for ticket sales and reconciliation.

use crate::types::{PurchaseRequestId, Ticket, TicketId};
use invoice_tickets_invoicing::InvoicingError;
use thiserror::Error;

/// Result type alias for ticketing operations.
pub type Result<T> = std::result::Result<T, TicketsError>;

/// Errors raised by the store, the sale flow and the reconciliation loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TicketsError {
    /// Invoicing service failure (auth, transport, remote).
    #[error(transparent)]
    Invoicing(#[from] InvoicingError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Requested record does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of record
        resource: &'static str,
        /// Identifier looked up
        id: String,
    },

    /// Input rejected by validation.
    #[error("{0}")]
    Validation(String),

    /// Ticket issuance aborted part way.
    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// Email could not be built or sent.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TicketsError {
    /// Shorthand for [`TicketsError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Issuing tickets for a purchase request failed, either while persisting a
/// ticket or in the association step that follows.
///
/// `created` lists the tickets persisted before the failure; none of them is
/// associated with the purchase request. They are discarded again, and
/// `orphaned` names any the discard could not remove.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Issuing tickets for purchase request {purchase_request_id} failed after {} ticket(s): {reason}", created.len())]
pub struct IssuanceError {
    /// Purchase request being issued
    pub purchase_request_id: PurchaseRequestId,
    /// Tickets persisted before the failure
    pub created: Vec<Ticket>,
    /// Ids of persisted tickets still left in the store without an owner
    pub orphaned: Vec<TicketId>,
    /// Underlying failure
    pub reason: String,
}
