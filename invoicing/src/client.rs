//! Invoice operations over a bootstrapped session.

use crate::error::{InvoicingError, Result};
use crate::session::{Credentials, Endpoints, Identity, Session};
use crate::types::{
    Invoice, InvoiceCancelRequest, InvoiceCreateRequest, InvoiceListRequest, InvoiceListResponse,
    InvoiceResponse,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::info;

/// Number of invoices requested per list call; large enough to mean "all".
pub const LIST_COUNT: u64 = 10_000_000;

/// Invoicing client: an authenticated session plus its merchant identity.
#[derive(Clone)]
pub struct InvoiceClient {
    session: Session,
    identity: Identity,
}

impl InvoiceClient {
    /// Log in and bootstrap in one step.
    ///
    /// # Errors
    ///
    /// Returns the first authentication, bootstrap or transport failure.
    pub async fn connect(
        credentials: &Credentials,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let session = Session::authenticate(credentials, endpoints, timeout).await?;
        let identity = session.bootstrap().await?;
        Ok(Self::new(session, identity))
    }

    /// Wrap an existing session and identity.
    #[must_use]
    pub const fn new(session: Session, identity: Identity) -> Self {
        Self { session, identity }
    }

    /// Merchant identity used to sign requests.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Every invoice of the bootstrapped unit.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures.
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let request = InvoiceListRequest {
            count: LIST_COUNT,
            unit_token: self.identity.unit_token.clone(),
        };
        let endpoint = self.session.endpoints().invoice_list.clone();
        let response: InvoiceListResponse = self.post(&endpoint, &request).await?;
        Ok(response.invoice)
    }

    /// Create and send an invoice for the bootstrapped unit.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures, or
    /// [`InvoicingError::Parse`] if the response carries no invoice.
    pub async fn create_invoice(&self, mut request: InvoiceCreateRequest) -> Result<Invoice> {
        request.unit_token.clone_from(&self.identity.unit_token);
        let endpoint = self.session.endpoints().invoice_create.clone();
        let response: InvoiceResponse = self.post(&endpoint, &request).await?;
        let invoice = response
            .invoice
            .ok_or_else(|| InvoicingError::Parse("create response carried no invoice".into()))?;
        info!(
            invoice_token = %invoice.token,
            merchant_invoice_number = %invoice.merchant_invoice_number,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Cancel an invoice without notifying its recipients.
    ///
    /// # Errors
    ///
    /// Returns transport, remote, status or parse failures.
    pub async fn cancel_invoice(&self, token: &str) -> Result<Option<Invoice>> {
        let request = InvoiceCancelRequest {
            token: token.to_string(),
            send_email_to_recipients: false,
        };
        let endpoint = self.session.endpoints().invoice_cancel.clone();
        let response: InvoiceResponse = self.post(&endpoint, &request).await?;
        info!(invoice_token = %token, "Invoice canceled");
        Ok(response.invoice)
    }

    async fn post<B, R>(&self, endpoint: &str, payload: &B) -> Result<R>
    where
        B: serde::Serialize,
        R: DeserializeOwned,
    {
        let (body, status) = self
            .session
            .signed_request(Some(&self.identity), endpoint, Some(payload), Method::POST)
            .await?;

        if status != StatusCode::OK {
            return Err(InvoicingError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| InvoicingError::Parse(e.to_string()))
    }
}
