//! Shared state for HTTP handlers.

use crate::providers::TicketStore;
use crate::sale::SaleService;
use invoice_tickets_invoicing::InvoiceConnector;
use std::sync::Arc;

/// Application state handed to every handler.
pub struct AppState<C, S> {
    /// Sale flow
    pub sale: Arc<SaleService<C, S>>,
    /// Ticket store
    pub store: Arc<S>,
    /// Invoicing sessions for admin listings
    pub connector: Arc<C>,
}

impl<C: InvoiceConnector, S: TicketStore> AppState<C, S> {
    /// Create application state.
    #[must_use]
    pub fn new(sale: SaleService<C, S>, store: S, connector: C) -> Self {
        Self {
            sale: Arc::new(sale),
            store: Arc::new(store),
            connector: Arc::new(connector),
        }
    }
}

impl<C, S> Clone for AppState<C, S> {
    fn clone(&self) -> Self {
        Self {
            sale: Arc::clone(&self.sale),
            store: Arc::clone(&self.store),
            connector: Arc::clone(&self.connector),
        }
    }
}
