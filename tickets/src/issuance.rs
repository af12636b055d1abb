//! Ticket issuance for paid purchase requests.
//!
//! Tickets are persisted one by one without an owner and then attached to
//! their purchase request in a single association step. A purchase request
//! counts as issued only once that step succeeds. On any failure the tickets
//! persisted so far are discarded and the request remains unresolved, so a
//! retry starts from a clean slate and failed attempts never use up capacity.
//! Tickets the discard itself could not remove stay behind unassociated for
//! an operator to clean up.

use crate::error::{IssuanceError, TicketsError};
use crate::providers::TicketStore;
use crate::types::{PurchaseRequest, Ticket, TicketId};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Words per generated ticket id.
pub const TICKET_ID_WORDS: u8 = 3;

/// Separator between words of a ticket id.
pub const TICKET_ID_SEPARATOR: &str = "-";

/// Draws attempted before giving up on finding an unused id.
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Generate an unused human-readable ticket id such as
/// `"mostly-brave-heron"`.
///
/// `taken` holds ids already claimed by the batch being issued.
///
/// # Errors
///
/// Returns [`TicketsError::Validation`] if no unused id was found within
/// [`MAX_ID_ATTEMPTS`] draws, or the store's error if the lookup fails.
pub async fn generate_ticket_id<S: TicketStore>(
    store: &S,
    taken: &[TicketId],
) -> Result<TicketId, TicketsError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let Some(candidate) = petname::petname(TICKET_ID_WORDS, TICKET_ID_SEPARATOR) else {
            continue;
        };
        let candidate = TicketId(candidate);
        if taken.contains(&candidate) || store.ticket_exists(&candidate).await? {
            debug!(ticket_id = %candidate, "Ticket id collision, drawing again");
            continue;
        }
        return Ok(candidate);
    }
    Err(TicketsError::Validation(format!(
        "No unused ticket id after {MAX_ID_ATTEMPTS} attempts"
    )))
}

/// Issue the full ticket set for a paid purchase request: one ticket for an
/// individual, four for a group (purchaser first).
///
/// # Errors
///
/// Returns [`IssuanceError`] carrying every ticket persisted before the
/// failure, and which of them could not be discarded again.
pub async fn issue_tickets<S: TicketStore>(
    store: &S,
    request: &PurchaseRequest,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>, IssuanceError> {
    let mut created: Vec<Ticket> = Vec::with_capacity(request.party_type.ticket_count());

    for holder in request.holders() {
        let taken: Vec<TicketId> = created.iter().map(|t| t.id.clone()).collect();
        let ticket = match generate_ticket_id(store, &taken).await {
            Ok(id) => Ticket {
                id,
                purchase_request_id: None,
                holder,
                created_at: now,
            },
            Err(e) => return Err(abort(store, request, created, &e).await),
        };

        if let Err(e) = store.create_ticket(&ticket).await {
            return Err(abort(store, request, created, &e).await);
        }
        created.push(ticket);
    }

    let ids: Vec<TicketId> = created.iter().map(|t| t.id.clone()).collect();
    if let Err(e) = store.associate_tickets(request.id, &ids).await {
        return Err(abort(store, request, created, &e).await);
    }

    for ticket in &mut created {
        ticket.purchase_request_id = Some(request.id);
    }
    Ok(created)
}

async fn abort<S: TicketStore>(
    store: &S,
    request: &PurchaseRequest,
    created: Vec<Ticket>,
    error: &TicketsError,
) -> IssuanceError {
    let ids: Vec<TicketId> = created.iter().map(|t| t.id.clone()).collect();
    let orphaned = if ids.is_empty() {
        Vec::new()
    } else {
        match store.discard_unassociated_tickets(&ids).await {
            Ok(discarded) => {
                debug!(purchase_request_id = request.id, discarded, "Discarded partial ticket set");
                Vec::new()
            }
            Err(discard_error) => {
                warn!(
                    purchase_request_id = request.id,
                    orphaned_tickets = ?ids,
                    error = %discard_error,
                    "Could not discard partial ticket set; tickets left unassociated"
                );
                ids
            }
        }
    };

    warn!(
        purchase_request_id = request.id,
        persisted = created.len(),
        error = %error,
        "Ticket issuance aborted"
    );
    IssuanceError {
        purchase_request_id: request.id,
        created,
        orphaned,
        reason: error.to_string(),
    }
}
