//! Mapping external invoices back to local purchase requests.
//!
//! The service has no structured metadata field, so the purchase request id
//! travels in the free-text merchant invoice number as `"PurchaseRequest <id>"`.
//! [`decode_invoice_number`] is the only place that format is parsed.

use crate::error::InvoiceNumberError;
use crate::types::Invoice;
use std::collections::HashMap;
use tracing::debug;

/// Literal first token of our invoice numbers.
pub const INVOICE_NUMBER_PREFIX: &str = "PurchaseRequest";

/// Status shown for purchase requests without a matching invoice.
pub const NO_INVOICE: &str = "NO_INVOICE";

/// Encode a purchase request id as a merchant invoice number.
#[must_use]
pub fn invoice_number(purchase_request_id: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX} {purchase_request_id}")
}

/// Decode a merchant invoice number into a purchase request id.
///
/// # Errors
///
/// Returns an [`InvoiceNumberError`] unless the input is exactly two
/// whitespace-separated tokens, `PurchaseRequest` followed by an integer.
pub fn decode_invoice_number(number: &str) -> Result<i64, InvoiceNumberError> {
    let tokens: Vec<&str> = number.split_whitespace().collect();
    let [prefix, id] = tokens.as_slice() else {
        return Err(InvoiceNumberError::WrongTokenCount(tokens.len()));
    };
    if *prefix != INVOICE_NUMBER_PREFIX {
        return Err(InvoiceNumberError::WrongPrefix((*prefix).to_string()));
    }
    id.parse()
        .map_err(|_| InvoiceNumberError::InvalidId((*id).to_string()))
}

/// Index invoices by the purchase request they were created for.
///
/// Invoices whose number does not decode are skipped. If two invoices decode
/// to the same id, the later one in list order wins.
#[must_use]
pub fn index_by_purchase_request(invoices: Vec<Invoice>) -> HashMap<i64, Invoice> {
    let mut index = HashMap::with_capacity(invoices.len());
    for invoice in invoices {
        match decode_invoice_number(&invoice.merchant_invoice_number) {
            Ok(id) => {
                index.insert(id, invoice);
            }
            Err(e) => {
                debug!(
                    invoice_token = %invoice.token,
                    merchant_invoice_number = %invoice.merchant_invoice_number,
                    reason = %e,
                    "Skipping unrelated invoice"
                );
            }
        }
    }
    index
}

/// `"<STATE> - <DELIVERY_STATUS>"` for a matched invoice, `"NO_INVOICE"` otherwise.
#[must_use]
pub fn status_label(invoice: Option<&Invoice>) -> String {
    invoice.map_or_else(
        || NO_INVOICE.to_string(),
        |invoice| format!("{} - {}", invoice.state, invoice.delivery_status),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::InvoiceState;

    fn invoice(number: &str, token: &str) -> Invoice {
        Invoice {
            token: token.to_string(),
            merchant_invoice_number: number.to_string(),
            state: InvoiceState::Unpaid,
            delivery_status: "SENT".to_string(),
            ..Invoice::default()
        }
    }

    #[test]
    fn test_decode_valid_numbers() {
        assert_eq!(decode_invoice_number("PurchaseRequest 42"), Ok(42));
        assert_eq!(decode_invoice_number("PurchaseRequest   7"), Ok(7));
        assert_eq!(decode_invoice_number(" PurchaseRequest 0 "), Ok(0));
    }

    #[test]
    fn test_decode_rejects_malformed_numbers() {
        let cases = [
            ("", InvoiceNumberError::WrongTokenCount(0)),
            ("PurchaseRequest", InvoiceNumberError::WrongTokenCount(1)),
            ("PurchaseRequest 1 2", InvoiceNumberError::WrongTokenCount(3)),
            ("Random Thing", InvoiceNumberError::WrongPrefix("Random".into())),
            ("purchaserequest 5", InvoiceNumberError::WrongPrefix("purchaserequest".into())),
            ("PurchaseRequest42 5", InvoiceNumberError::WrongPrefix("PurchaseRequest42".into())),
            ("PurchaseRequest abc", InvoiceNumberError::InvalidId("abc".into())),
            ("PurchaseRequest 4.2", InvoiceNumberError::InvalidId("4.2".into())),
            (
                "PurchaseRequest 99999999999999999999",
                InvoiceNumberError::InvalidId("99999999999999999999".into()),
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(decode_invoice_number(input), Err(expected), "input {input:?}");
        }
    }

    #[test]
    fn test_encode_decode_same_id() {
        for id in [1, 42, 7_000_001] {
            assert_eq!(decode_invoice_number(&invoice_number(id)), Ok(id));
        }
    }

    #[test]
    fn test_index_skips_unrelated_invoices() {
        let index = index_by_purchase_request(vec![
            invoice("PurchaseRequest 42", "inv_42"),
            invoice("Random Thing", "inv_random"),
            invoice("Donation 3", "inv_donation"),
            invoice("PurchaseRequest 7", "inv_7"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index[&42].token, "inv_42");
        assert_eq!(index[&7].token, "inv_7");
    }

    #[test]
    fn test_index_later_duplicate_wins() {
        let index = index_by_purchase_request(vec![
            invoice("PurchaseRequest 9", "first"),
            invoice("PurchaseRequest 9", "second"),
        ]);
        assert_eq!(index[&9].token, "second");
    }

    #[test]
    fn test_index_independent_of_order() {
        let mut invoices = vec![
            invoice("PurchaseRequest 1", "a"),
            invoice("PurchaseRequest 2", "b"),
            invoice("nope", "c"),
        ];
        let forward = index_by_purchase_request(invoices.clone());
        invoices.reverse();
        let backward = index_by_purchase_request(invoices);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_status_label() {
        let paid = Invoice {
            state: InvoiceState::Paid,
            delivery_status: "SENT".into(),
            ..Invoice::default()
        };
        assert_eq!(status_label(Some(&paid)), "PAID - SENT");
        assert_eq!(status_label(None), "NO_INVOICE");
    }
}
