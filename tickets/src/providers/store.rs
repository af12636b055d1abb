//! Ticket store trait.

use crate::error::Result;
use crate::types::{
    Contact, NewPurchaseRequest, PromoCode, PurchaseRequest, PurchaseRequestId, Ticket, TicketId,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Persistence for purchase requests, tickets and promo codes.
///
/// Every operation is individually atomic. Nothing spans operations, so
/// callers must tolerate a failure between two writes (see
/// [`crate::issuance::issue_tickets`]).
pub trait TicketStore: Send + Sync {
    /// All purchase requests with their associated tickets, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn list_purchase_requests(&self) -> impl Future<Output = Result<Vec<PurchaseRequest>>> + Send;

    /// Purchase requests with no associated tickets and no cancellation
    /// marker, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn unresolved_purchase_requests(
        &self,
    ) -> impl Future<Output = Result<Vec<PurchaseRequest>>> + Send;

    /// Fetch a purchase request with its tickets.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TicketsError::NotFound`] if no such purchase request
    /// exists.
    fn get_purchase_request(
        &self,
        id: PurchaseRequestId,
    ) -> impl Future<Output = Result<PurchaseRequest>> + Send;

    /// Persist a new purchase request and assign its id.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    fn create_purchase_request(
        &self,
        request: NewPurchaseRequest,
        charged_cents: i64,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PurchaseRequest>> + Send;

    /// Persist a single ticket.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails (including a duplicate id).
    fn create_ticket(&self, ticket: &Ticket) -> impl Future<Output = Result<()>> + Send;

    /// Whether a ticket with this id has been persisted.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn ticket_exists(&self, id: &TicketId) -> impl Future<Output = Result<bool>> + Send;

    /// Fetch a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TicketsError::NotFound`] if no such ticket exists.
    fn get_ticket(&self, id: &TicketId) -> impl Future<Output = Result<Ticket>> + Send;

    /// Every ticket, associated or not, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_tickets(&self) -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Replace the holder details of a ticket and return the updated ticket.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TicketsError::NotFound`] if no such ticket exists.
    fn update_ticket_holder(
        &self,
        id: &TicketId,
        holder: &Contact,
    ) -> impl Future<Output = Result<Ticket>> + Send;

    /// Delete tickets by id, associated or not. Unknown ids are ignored.
    /// Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn delete_tickets(&self, ids: &[TicketId]) -> impl Future<Output = Result<usize>> + Send;

    /// Delete those of `ids` that are not associated with any purchase
    /// request. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn discard_unassociated_tickets(
        &self,
        ids: &[TicketId],
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Attach previously persisted tickets to their purchase request in one
    /// update. Either every ticket is attached or none is.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn associate_tickets(
        &self,
        purchase_request_id: PurchaseRequestId,
        ticket_ids: &[TicketId],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Number of tickets persisted, associated or not.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn count_tickets(&self) -> impl Future<Output = Result<usize>> + Send;

    /// Record that the purchase request's invoice was canceled.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn mark_canceled(
        &self,
        purchase_request_id: PurchaseRequestId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Look up a promo code. Exhausted codes (count 0) are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_promo_code(&self, code: &str) -> impl Future<Output = Result<Option<PromoCode>>> + Send;

    /// Consume one redemption of a promo code; the count never drops below 0.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn redeem_promo_code(&self, code: &str) -> impl Future<Output = Result<()>> + Send;

    /// All promo codes, exhausted ones included, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_promo_codes(&self) -> impl Future<Output = Result<Vec<PromoCode>>> + Send;

    /// Insert or replace a promo code.
    ///
    /// # Errors
    ///
    /// Returns error if the upsert fails.
    fn save_promo_code(&self, promo: &PromoCode) -> impl Future<Output = Result<()>> + Send;
}
