//! Router configuration.

use super::auth::{require_admin, AdminCredentials};
use super::handlers;
use super::state::AppState;
use crate::providers::TicketStore;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use invoice_tickets_invoicing::InvoiceConnector;
use tower_http::trace::TraceLayer;

/// Routes open to the public: health, ticket lookup, pricing, purchase.
pub fn public_routes<C, S>() -> Router<AppState<C, S>>
where
    C: InvoiceConnector + 'static,
    S: TicketStore + 'static,
{
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/ticket/:id", get(handlers::get_ticket::<C, S>))
        .route("/api/details", get(handlers::details::<C, S>))
        .route("/api/buy", post(handlers::buy::<C, S>))
}

/// Operator routes, unauthenticated. [`build_router`] guards them.
pub fn admin_routes<C, S>() -> Router<AppState<C, S>>
where
    C: InvoiceConnector + 'static,
    S: TicketStore + 'static,
{
    Router::new()
        .route(
            "/api/purchase-requests",
            get(handlers::list_purchase_requests::<C, S>),
        )
        .route(
            "/api/promo-codes",
            get(handlers::list_promo_codes::<C, S>).post(handlers::save_promo_code::<C, S>),
        )
        .route(
            "/api/tickets",
            get(handlers::list_tickets::<C, S>)
                .post(handlers::create_ticket::<C, S>)
                .patch(handlers::update_ticket::<C, S>)
                .delete(handlers::delete_tickets::<C, S>),
        )
        .route("/api/stats", get(handlers::stats::<C, S>))
        .route("/api/invoices", get(handlers::list_invoices::<C, S>))
}

/// Build the complete router, with the admin routes behind basic auth.
pub fn build_router<C, S>(state: AppState<C, S>, admin: AdminCredentials) -> Router
where
    C: InvoiceConnector + 'static,
    S: TicketStore + 'static,
{
    let admin = admin_routes().route_layer(middleware::from_fn_with_state(admin, require_admin));

    public_routes()
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
