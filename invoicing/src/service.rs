//! Invoicing service traits.
//!
//! The reconciliation loop and the sale flow depend on these traits rather
//! than on [`InvoiceClient`] directly, so tests can swap in
//! [`crate::mocks::MockInvoicing`].
//!
//! [`InvoiceConnector::connect`] returns a fresh, independently authenticated
//! service every time it is called. Callers hold the returned value for one
//! unit of work (a poll cycle, an HTTP request) and never share it.

use crate::client::InvoiceClient;
use crate::error::Result;
use crate::session::{Credentials, Endpoints};
use crate::types::{Invoice, InvoiceCreateRequest};
use std::future::Future;
use std::time::Duration;

/// Operations available on an authenticated invoicing session.
pub trait InvoiceService: Send + Sync {
    /// List every invoice of the merchant's unit.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures.
    fn list_invoices(&self) -> impl Future<Output = Result<Vec<Invoice>>> + Send;

    /// Create and send an invoice.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures.
    fn create_invoice(
        &self,
        request: InvoiceCreateRequest,
    ) -> impl Future<Output = Result<Invoice>> + Send;

    /// Cancel the invoice with `token`.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures.
    fn cancel_invoice(&self, token: &str) -> impl Future<Output = Result<Option<Invoice>>> + Send;
}

/// Produces authenticated invoicing sessions.
pub trait InvoiceConnector: Send + Sync {
    /// Session type handed out by [`InvoiceConnector::connect`].
    type Service: InvoiceService;

    /// Authenticate and bootstrap a new session.
    ///
    /// # Errors
    ///
    /// Returns authentication, bootstrap or transport failures.
    fn connect(&self) -> impl Future<Output = Result<Self::Service>> + Send;
}

impl InvoiceService for InvoiceClient {
    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        Self::list_invoices(self).await
    }

    async fn create_invoice(&self, request: InvoiceCreateRequest) -> Result<Invoice> {
        Self::create_invoice(self, request).await
    }

    async fn cancel_invoice(&self, token: &str) -> Result<Option<Invoice>> {
        Self::cancel_invoice(self, token).await
    }
}

/// Connector that logs in with account credentials.
#[derive(Debug, Clone)]
pub struct SessionConnector {
    credentials: Credentials,
    endpoints: Endpoints,
    timeout: Duration,
}

impl SessionConnector {
    /// Create a connector for the production endpoints.
    #[must_use]
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        Self {
            credentials,
            endpoints: Endpoints::squareup(),
            timeout,
        }
    }

    /// Use different endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl InvoiceConnector for SessionConnector {
    type Service = InvoiceClient;

    async fn connect(&self) -> Result<InvoiceClient> {
        InvoiceClient::connect(&self.credentials, self.endpoints.clone(), self.timeout).await
    }
}
