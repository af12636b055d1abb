//! HTTP handlers.

use super::error::ApiError;
use super::state::AppState;
use crate::issuance::generate_ticket_id;
use crate::listing::{
    all_invoices, event_stats, purchase_request_statuses, EventStats, PurchaseRequestStatus,
};
use crate::providers::TicketStore;
use crate::sale::{PriceDetails, Purchase};
use crate::types::{
    Contact, NewPurchaseRequest, PartyType, PromoCode, Ticket, TicketDetails, TicketId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use invoice_tickets_invoicing::{Invoice, InvoiceConnector};
use serde::Deserialize;
use tracing::info;

/// Liveness check.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Public ticket lookup.
///
/// ```text
/// GET /api/ticket/:id
/// ```
///
/// # Errors
///
/// 404 if no ticket has this id.
pub async fn get_ticket<C, S>(
    State(state): State<AppState<C, S>>,
    Path(id): Path<String>,
) -> Result<Json<TicketDetails>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let ticket = state.store.get_ticket(&TicketId(id)).await?;
    Ok(Json(ticket.into()))
}

/// Query string of a price enquiry.
#[derive(Debug, Default, Deserialize)]
pub struct DetailsQuery {
    /// Promo code to try
    #[serde(default)]
    pub code: Option<String>,
    /// Free-form party type, e.g. `"Group of 4"`
    #[serde(default, rename = "type")]
    pub party_type: Option<String>,
}

/// Price estimate.
///
/// ```text
/// GET /api/details?code=EARLY&type=Individual
/// ```
///
/// # Errors
///
/// 500 if the promo code lookup fails.
pub async fn details<C, S>(
    State(state): State<AppState<C, S>>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<PriceDetails>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let party_type = PartyType::from_raw(query.party_type.as_deref().unwrap_or_default());
    let details = state.sale.details(query.code.as_deref(), party_type).await?;
    Ok(Json(details))
}

/// Body of a purchase.
#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    /// Purchaser
    #[serde(flatten)]
    pub contact: Contact,
    /// Free-form party type; anything mentioning `Group` is a group
    #[serde(default, rename = "type")]
    pub party_type: String,
    /// Additional group members
    #[serde(default)]
    pub group_members: Vec<Contact>,
    /// Promo code
    #[serde(default)]
    pub promo_code: Option<String>,
}

impl From<BuyRequest> for NewPurchaseRequest {
    fn from(body: BuyRequest) -> Self {
        Self {
            contact: body.contact,
            party_type: PartyType::from_raw(&body.party_type),
            group_members: body.group_members,
            promo_code: body.promo_code,
        }
    }
}

/// Submit a purchase request and send its invoice.
///
/// ```text
/// POST /api/buy
/// ```
///
/// # Errors
///
/// - 400 for invalid input, sold out, or an unknown promo code
/// - 502 if the invoice could not be created
pub async fn buy<C, S>(
    State(state): State<AppState<C, S>>,
    Json(body): Json<BuyRequest>,
) -> Result<(StatusCode, Json<Purchase>), ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let purchase = state.sale.purchase(body.into(), Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Every purchase request with its invoice status.
///
/// ```text
/// GET /api/purchase-requests
/// ```
///
/// # Errors
///
/// 500 if the store cannot be read. An unreachable invoicing service is not
/// an error; entries report `NO_INVOICE`.
pub async fn list_purchase_requests<C, S>(
    State(state): State<AppState<C, S>>,
) -> Result<Json<Vec<PurchaseRequestStatus>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let statuses = purchase_request_statuses(state.connector.as_ref(), state.store.as_ref()).await?;
    Ok(Json(statuses))
}

/// Every promo code.
///
/// ```text
/// GET /api/promo-codes
/// ```
///
/// # Errors
///
/// 500 if the store cannot be read.
pub async fn list_promo_codes<C, S>(
    State(state): State<AppState<C, S>>,
) -> Result<Json<Vec<PromoCode>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    Ok(Json(state.store.list_promo_codes().await?))
}

/// Create or replace a promo code.
///
/// ```text
/// POST /api/promo-codes
/// ```
///
/// # Errors
///
/// 400 for an empty code or a percentage outside `0..=1`.
pub async fn save_promo_code<C, S>(
    State(state): State<AppState<C, S>>,
    Json(promo): Json<PromoCode>,
) -> Result<Json<Vec<PromoCode>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    if promo.id.trim().is_empty() {
        return Err(ApiError::bad_request("Promo code id is required"));
    }
    if !(0.0..=1.0).contains(&promo.percent) {
        return Err(ApiError::bad_request("Promo code percent must be between 0 and 1"));
    }
    state.store.save_promo_code(&promo).await?;
    Ok(Json(state.store.list_promo_codes().await?))
}

/// Ticket, purchase request and head counts.
///
/// ```text
/// GET /api/stats
/// ```
///
/// # Errors
///
/// 500 if the store cannot be read.
pub async fn stats<C, S>(State(state): State<AppState<C, S>>) -> Result<Json<EventStats>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    Ok(Json(event_stats(state.store.as_ref()).await?))
}

/// Every invoice in the merchant account, as the invoicing service reports it.
///
/// ```text
/// GET /api/invoices
/// ```
///
/// # Errors
///
/// 502 if the invoicing service cannot be reached.
pub async fn list_invoices<C, S>(
    State(state): State<AppState<C, S>>,
) -> Result<Json<Vec<Invoice>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    Ok(Json(all_invoices(state.connector.as_ref()).await?))
}

/// Every ticket, associated or not.
///
/// ```text
/// GET /api/tickets
/// ```
///
/// # Errors
///
/// 500 if the store cannot be read.
pub async fn list_tickets<C, S>(
    State(state): State<AppState<C, S>>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    Ok(Json(state.store.list_tickets().await?))
}

/// Issue a ticket by hand, outside any purchase request. The id is
/// generated. Responds with every ticket.
///
/// ```text
/// POST /api/tickets
/// ```
///
/// # Errors
///
/// 500 if no id could be generated or the store write fails.
pub async fn create_ticket<C, S>(
    State(state): State<AppState<C, S>>,
    Json(holder): Json<Contact>,
) -> Result<(StatusCode, Json<Vec<Ticket>>), ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let store = state.store.as_ref();
    let id = generate_ticket_id(store, &[])
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let ticket = Ticket {
        id,
        purchase_request_id: None,
        holder,
        created_at: Utc::now(),
    };
    store.create_ticket(&ticket).await?;
    info!(ticket_id = %ticket.id, "Ticket created by operator");
    Ok((StatusCode::CREATED, Json(store.list_tickets().await?)))
}

/// Body of a ticket holder correction.
#[derive(Debug, Deserialize)]
pub struct TicketUpdate {
    /// Ticket to change
    pub id: TicketId,
    /// New holder details
    #[serde(flatten)]
    pub holder: Contact,
}

/// Correct a ticket's holder details. Responds with every ticket.
///
/// ```text
/// PATCH /api/tickets
/// ```
///
/// # Errors
///
/// 404 if no ticket has this id.
pub async fn update_ticket<C, S>(
    State(state): State<AppState<C, S>>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    state
        .store
        .update_ticket_holder(&update.id, &update.holder)
        .await?;
    Ok(Json(state.store.list_tickets().await?))
}

/// Delete tickets by id. Unknown ids are ignored. Responds with every
/// remaining ticket.
///
/// ```text
/// DELETE /api/tickets
/// ["calmly-happy-otter", ...]
/// ```
///
/// # Errors
///
/// 500 if the store write fails.
pub async fn delete_tickets<C, S>(
    State(state): State<AppState<C, S>>,
    Json(ids): Json<Vec<TicketId>>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
    C: InvoiceConnector,
    S: TicketStore,
{
    let removed = state.store.delete_tickets(&ids).await?;
    info!(requested = ids.len(), removed, "Tickets deleted by operator");
    Ok(Json(state.store.list_tickets().await?))
}
