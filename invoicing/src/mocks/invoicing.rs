//! Mock invoicing service.

use crate::directory::invoice_number;
use crate::error::{InvoicingError, Result};
use crate::service::{InvoiceConnector, InvoiceService};
use crate::types::{Invoice, InvoiceCreateRequest, InvoiceState};
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockState {
    invoices: Vec<Invoice>,
    created: Vec<InvoiceCreateRequest>,
    canceled: Vec<String>,
    connects: usize,
    connect_error: Option<InvoicingError>,
    list_error: Option<InvoicingError>,
    cancel_error: Option<InvoicingError>,
}

/// Mock invoicing service.
///
/// Serves a scripted invoice list and records every write. Cancellations are
/// recorded but do not change the invoice list, so a test can replay the
/// same external state across cycles. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockInvoicing {
    state: Arc<Mutex<MockState>>,
}

impl MockInvoicing {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock serving `invoices`.
    #[must_use]
    pub fn with_invoices(invoices: Vec<Invoice>) -> Self {
        let mock = Self::new();
        mock.set_invoices(invoices);
        mock
    }

    /// Replace the served invoice list.
    pub fn set_invoices(&self, invoices: Vec<Invoice>) {
        if let Ok(mut state) = self.state.lock() {
            state.invoices = invoices;
        }
    }

    /// Make every subsequent `connect` fail with `error`.
    pub fn fail_connect(&self, error: Option<InvoicingError>) {
        if let Ok(mut state) = self.state.lock() {
            state.connect_error = error;
        }
    }

    /// Make every subsequent `list_invoices` fail with `error`.
    pub fn fail_list(&self, error: Option<InvoicingError>) {
        if let Ok(mut state) = self.state.lock() {
            state.list_error = error;
        }
    }

    /// Make every subsequent `cancel_invoice` fail with `error`.
    pub fn fail_cancel(&self, error: Option<InvoicingError>) {
        if let Ok(mut state) = self.state.lock() {
            state.cancel_error = error;
        }
    }

    /// Tokens passed to `cancel_invoice`, in call order.
    #[must_use]
    pub fn canceled(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.canceled.clone())
            .unwrap_or_default()
    }

    /// Requests passed to `create_invoice`, in call order.
    #[must_use]
    pub fn created(&self) -> Vec<InvoiceCreateRequest> {
        self.state
            .lock()
            .map(|state| state.created.clone())
            .unwrap_or_default()
    }

    /// Number of successful and failed `connect` calls.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.lock().map(|state| state.connects).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| InvoicingError::Transport("Mutex lock failed".to_string()))
    }
}

/// Invoice in `state` for purchase request `id`, token `inv_<id>`.
#[must_use]
pub fn invoice_for(id: i64, state: InvoiceState) -> Invoice {
    Invoice {
        token: format!("inv_{id}"),
        merchant_invoice_number: invoice_number(id),
        state,
        delivery_status: "SENT".to_string(),
        ..Invoice::default()
    }
}

impl InvoiceConnector for MockInvoicing {
    type Service = Self;

    fn connect(&self) -> impl Future<Output = Result<Self>> + Send {
        let result = self.lock().and_then(|mut state| {
            state.connects += 1;
            state.connect_error.clone().map_or(Ok(()), Err)
        });
        let service = self.clone();
        async move { result.map(|()| service) }
    }
}

impl InvoiceService for MockInvoicing {
    fn list_invoices(&self) -> impl Future<Output = Result<Vec<Invoice>>> + Send {
        let result = self.lock().and_then(|state| match &state.list_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.invoices.clone()),
        });
        async move { result }
    }

    fn create_invoice(
        &self,
        request: InvoiceCreateRequest,
    ) -> impl Future<Output = Result<Invoice>> + Send {
        let result = self.lock().map(|mut state| {
            let invoice = Invoice {
                token: format!("inv_created_{}", state.created.len() + 1),
                merchant_invoice_number: request.merchant_invoice_number.clone(),
                state: InvoiceState::Unpaid,
                delivery_status: "SENT".to_string(),
                payer_name: request.payer.display_name.clone(),
                payer_email: request.payer.email.clone(),
                requested_money: Some(request.requested_money.clone()),
                due_on: Some(request.due_on),
                ..Invoice::default()
            };
            state.created.push(request);
            state.invoices.push(invoice.clone());
            invoice
        });
        async move { result }
    }

    fn cancel_invoice(&self, token: &str) -> impl Future<Output = Result<Option<Invoice>>> + Send {
        let result = self.lock().and_then(|mut state| {
            if let Some(error) = &state.cancel_error {
                return Err(error.clone());
            }
            state.canceled.push(token.to_string());
            Ok(state.invoices.iter().find(|i| i.token == token).cloned())
        });
        async move { result }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_records_without_mutating_list() {
        let mock = MockInvoicing::with_invoices(vec![invoice_for(3, InvoiceState::Unpaid)]);
        let service = mock.connect().await.unwrap();

        let canceled = service.cancel_invoice("inv_3").await.unwrap();
        assert_eq!(canceled.unwrap().token, "inv_3");
        assert_eq!(mock.canceled(), vec!["inv_3".to_string()]);
        assert_eq!(
            service.list_invoices().await.unwrap()[0].state,
            InvoiceState::Unpaid
        );
    }

    #[tokio::test]
    async fn test_scripted_connect_failure() {
        let mock = MockInvoicing::new();
        mock.fail_connect(Some(InvoicingError::Auth("bad password".into())));

        assert!(matches!(mock.connect().await, Err(InvoicingError::Auth(_))));
        assert_eq!(mock.connects(), 1);
    }
}
