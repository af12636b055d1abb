//! Admin views: purchase requests annotated with invoice status, event
//! totals and the raw invoice list.

use crate::error::Result;
use crate::providers::TicketStore;
use crate::types::PurchaseRequest;
use invoice_tickets_invoicing::directory::{index_by_purchase_request, status_label, NO_INVOICE};
use invoice_tickets_invoicing::{Invoice, InvoiceConnector, InvoiceService};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A purchase request with its current invoice status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequestStatus {
    /// The purchase request
    #[serde(flatten)]
    pub purchase_request: PurchaseRequest,
    /// `"<STATE> - <DELIVERY>"`, or `NO_INVOICE`
    pub status: String,
    /// Matching invoice, if one was found
    pub invoice: Option<Invoice>,
}

/// List every purchase request with its invoice status.
///
/// If the invoicing service cannot be reached every entry is reported as
/// `NO_INVOICE` rather than failing the listing.
///
/// # Errors
///
/// Returns error only if the store cannot be read.
pub async fn purchase_request_statuses<C, S>(
    connector: &C,
    store: &S,
) -> Result<Vec<PurchaseRequestStatus>>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let requests = store.list_purchase_requests().await?;

    let mut index = match fetch_invoices(connector).await {
        Ok(invoices) => index_by_purchase_request(invoices),
        Err(e) => {
            warn!(error = %e, "Invoicing service unavailable, reporting {NO_INVOICE}");
            HashMap::new()
        }
    };

    Ok(requests
        .into_iter()
        .map(|purchase_request| {
            let invoice = index.remove(&purchase_request.id);
            PurchaseRequestStatus {
                status: status_label(invoice.as_ref()),
                purchase_request,
                invoice,
            }
        })
        .collect())
}

async fn fetch_invoices<C: InvoiceConnector>(
    connector: &C,
) -> invoice_tickets_invoicing::Result<Vec<Invoice>> {
    connector.connect().await?.list_invoices().await
}

/// Every invoice in the merchant account, unrelated ones included.
///
/// # Errors
///
/// Returns [`crate::TicketsError::Invoicing`] if the service cannot be
/// reached or rejects the listing.
pub async fn all_invoices<C: InvoiceConnector>(connector: &C) -> Result<Vec<Invoice>> {
    Ok(fetch_invoices(connector).await?)
}

/// Event totals for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    /// Tickets in the store, associated or not
    pub tickets: usize,
    /// Purchase requests submitted, canceled ones included
    pub purchase_requests: usize,
    /// People the purchase requests cover: one per individual, four per group
    pub people: usize,
}

/// Count tickets, purchase requests and the people they cover.
///
/// # Errors
///
/// Returns error if the store cannot be read.
pub async fn event_stats<S: TicketStore>(store: &S) -> Result<EventStats> {
    let tickets = store.count_tickets().await?;
    let requests = store.list_purchase_requests().await?;
    Ok(EventStats {
        tickets,
        purchase_requests: requests.len(),
        people: requests.iter().map(|r| r.party_type.ticket_count()).sum(),
    })
}
