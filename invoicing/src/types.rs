//! Wire types for the invoicing service.
//!
//! Only the fields the reconciliation engine reads or writes are modelled;
//! unknown fields are ignored on decode.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login form payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Application-level status embedded in otherwise successful responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteStatus {
    /// `false` when the service rejected the request
    #[serde(default)]
    pub success: Option<bool>,
    /// Short error title
    #[serde(default)]
    pub error_title: String,
    /// Human-readable error message
    #[serde(default)]
    pub error_message: String,
}

/// Response of the navigation resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigationResponse {
    /// Merchant display identifier
    #[serde(default)]
    pub merchant: String,
    /// Merchant token used to sign later requests
    #[serde(default)]
    pub token: String,
}

/// A business unit of the merchant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    /// Unit contact email
    #[serde(default)]
    pub email: String,
    /// Unit nickname
    #[serde(default)]
    pub nickname: String,
    /// Unit token
    #[serde(default)]
    pub token: String,
    /// Whether the unit is active
    #[serde(default)]
    pub unit_active: bool,
}

/// Response of the subunits resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubunitsResponse {
    /// Units of the merchant, default unit first
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Invoice list request.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListRequest {
    /// Maximum number of invoices to return
    pub count: u64,
    /// Unit whose invoices are listed
    pub unit_token: String,
}

/// Invoice list response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListResponse {
    /// Pagination cursor (unused, the list request asks for everything)
    #[serde(default)]
    pub next_cursor: String,
    /// Invoices
    #[serde(default)]
    pub invoice: Vec<Invoice>,
}

/// Invoice create/cancel response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceResponse {
    /// Whether the service accepted the request
    #[serde(default)]
    pub success: bool,
    /// Resulting invoice
    #[serde(default)]
    pub invoice: Option<Invoice>,
}

/// Invoice cancel request.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceCancelRequest {
    /// Invoice token
    pub token: String,
    /// Whether the payer is told about the cancellation
    pub send_email_to_recipients: bool,
}

/// Invoice payment state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceState {
    /// Payer has paid
    Paid,
    /// Sent and awaiting payment
    Unpaid,
    /// Canceled by the merchant
    Canceled,
    /// Any state the engine does not act on
    Other(String),
}

impl InvoiceState {
    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "PAID",
            Self::Unpaid => "UNPAID",
            Self::Canceled => "CANCELED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for InvoiceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PAID" => Self::Paid,
            "UNPAID" => Self::Unpaid,
            "CANCELED" => Self::Canceled,
            _ => Self::Other(s),
        }
    }
}

impl From<InvoiceState> for String {
    fn from(state: InvoiceState) -> Self {
        state.as_str().to_string()
    }
}

impl Default for InvoiceState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount of money in integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents
    pub amount: i64,
    /// ISO 4217 currency code
    pub currency_code: String,
}

impl Money {
    /// Creates an amount in cents.
    #[must_use]
    pub fn cents(amount: i64, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }
}

/// Invoice payer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    /// Name shown on the invoice
    #[serde(default)]
    pub display_name: String,
    /// Where the invoice is sent
    #[serde(default)]
    pub email: String,
    /// Customer token, assigned by the service
    #[serde(default)]
    pub token: Option<String>,
}

/// Calendar due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDate {
    /// 1-based day
    pub day_of_month: u32,
    /// 1-based month
    pub month_of_year: u32,
    /// Year
    pub year: i32,
}

impl From<NaiveDate> for DueDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            day_of_month: date.day(),
            month_of_year: date.month(),
            year: date.year(),
        }
    }
}

/// Timestamp as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTime {
    /// Microseconds since the Unix epoch
    #[serde(default)]
    pub instant_usec: u64,
    /// Offset of the merchant's timezone in minutes
    #[serde(default)]
    pub timezone_offset_min: i32,
    /// Timezone names
    #[serde(default)]
    pub tz_name: Vec<String>,
}

impl InvoiceTime {
    /// Converts to a UTC timestamp, `None` if out of range.
    #[must_use]
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.instant_usec)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
    }
}

/// An invoice owned by the external service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invoice {
    /// Invoice token
    pub token: String,
    /// Free-text invoice number, `"PurchaseRequest <id>"` for ours
    pub merchant_invoice_number: String,
    /// Payment state
    pub state: InvoiceState,
    /// Delivery status (e.g. `SENT`)
    pub delivery_status: String,
    /// Invoice title
    pub invoice_name: String,
    /// Payer name
    pub payer_name: String,
    /// Payer email
    pub payer_email: String,
    /// Amount requested
    pub requested_money: Option<Money>,
    /// Due date
    pub due_on: Option<DueDate>,
    /// Creation timestamp
    pub created_at: Option<InvoiceTime>,
    /// Unit that owns the invoice
    pub unit_token: String,
}

/// Breakdown of amounts on a cart or line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amounts {
    /// Discounts applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_money: Option<Money>,
    /// Gross sales
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_sales_money: Option<Money>,
    /// Unit price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_variation_price_money: Option<Money>,
    /// Unit price times quantity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_variation_price_times_quantity_money: Option<Money>,
    /// Tax
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_money: Option<Money>,
    /// Tip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_money: Option<Money>,
    /// Total
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_money: Option<Money>,
}

/// Options selected on a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOptions {
    /// Item-level discounts
    pub discount: Vec<serde_json::Value>,
    /// Item-level fees
    pub fee: Vec<serde_json::Value>,
}

/// Line item configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Selected options
    pub selected_options: SelectedOptions,
    /// `CUSTOM_AMOUNT` for free-form items
    pub backing_type: String,
    /// Unit price
    pub item_variation_price_money: Money,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Quantity, as a decimal string
    pub quantity: String,
    /// Note shown on the line
    pub custom_note: String,
    /// Line configuration
    pub configuration: Configuration,
    /// Line amounts
    pub amounts: Amounts,
}

/// Cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItems {
    /// Items
    pub itemization: Vec<Item>,
    /// Cart-level fees
    pub fee: Vec<serde_json::Value>,
    /// Cart-level discounts
    pub discount: Vec<serde_json::Value>,
}

/// Invoice cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart totals
    pub amounts: Amounts,
    /// Cart lines
    pub line_items: LineItems,
}

/// Invoice create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceCreateRequest {
    /// Extra recipients (always empty)
    pub additional_recipient_email: Vec<serde_json::Value>,
    /// Cart
    pub cart: Cart,
    /// Invoice description
    pub description: String,
    /// Due date
    pub due_on: DueDate,
    /// Invoice title
    pub invoice_name: String,
    /// Free-text invoice number
    pub merchant_invoice_number: String,
    /// Payer
    pub payer: Payer,
    /// Amount requested
    pub requested_money: Money,
    /// Create as draft instead of sending
    pub is_draft: bool,
    /// Filled in from the bootstrapped identity
    pub unit_token: String,
}

impl InvoiceCreateRequest {
    /// Builds a sent (non-draft) invoice with a single custom-amount line.
    #[must_use]
    pub fn custom_amount(
        invoice_name: impl Into<String>,
        note: impl Into<String>,
        merchant_invoice_number: impl Into<String>,
        payer: Payer,
        amount: Money,
        due_on: DueDate,
    ) -> Self {
        let none = Money::cents(0, amount.currency_code.clone());
        let item = Item {
            quantity: "1".to_string(),
            custom_note: note.into(),
            configuration: Configuration {
                selected_options: SelectedOptions::default(),
                backing_type: "CUSTOM_AMOUNT".to_string(),
                item_variation_price_money: amount.clone(),
            },
            amounts: Amounts {
                discount_money: Some(none.clone()),
                gross_sales_money: Some(amount.clone()),
                item_variation_price_money: Some(amount.clone()),
                item_variation_price_times_quantity_money: Some(amount.clone()),
                tax_money: Some(none.clone()),
                total_money: Some(amount.clone()),
                ..Amounts::default()
            },
        };

        Self {
            additional_recipient_email: Vec::new(),
            cart: Cart {
                amounts: Amounts {
                    discount_money: Some(none.clone()),
                    tax_money: Some(none.clone()),
                    tip_money: Some(none),
                    total_money: Some(amount.clone()),
                    ..Amounts::default()
                },
                line_items: LineItems {
                    itemization: vec![item],
                    ..LineItems::default()
                },
            },
            description: String::new(),
            due_on,
            invoice_name: invoice_name.into(),
            merchant_invoice_number: merchant_invoice_number.into(),
            payer,
            requested_money: amount,
            is_draft: false,
            unit_token: String::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_decodes_with_unknown_fields() {
        let json = r#"{
            "token": "inv_1",
            "merchant_invoice_number": "PurchaseRequest 42",
            "state": "PAID",
            "delivery_status": "SENT",
            "tipping_enabled": false,
            "created_at": {"instant_usec": 1700000000000000, "timezone_offset_min": -480, "tz_name": ["America/Vancouver"]}
        }"#;
        let invoice: Invoice = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.token, "inv_1");
        assert_eq!(invoice.state, InvoiceState::Paid);
        assert_eq!(
            invoice.created_at.unwrap().to_utc().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_unknown_state_is_preserved() {
        let state: InvoiceState = serde_json::from_str(r#""PARTIALLY_PAID""#).unwrap();
        assert_eq!(state, InvoiceState::Other("PARTIALLY_PAID".to_string()));
        assert_eq!(state.to_string(), "PARTIALLY_PAID");
    }

    #[test]
    fn test_custom_amount_request_shape() {
        let due = DueDate::from(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        let request = InvoiceCreateRequest::custom_amount(
            "Gala Tickets",
            "Gala Ticket - Individual",
            "PurchaseRequest 7",
            Payer {
                display_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                token: None,
            },
            Money::cents(2500, "CAD"),
            due,
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["merchant_invoice_number"], "PurchaseRequest 7");
        assert_eq!(value["requested_money"]["amount"], 2500);
        assert_eq!(value["due_on"]["month_of_year"], 3);
        assert_eq!(value["is_draft"], false);
        assert_eq!(
            value["cart"]["line_items"]["itemization"][0]["configuration"]["backing_type"],
            "CUSTOM_AMOUNT"
        );
        assert!(value["cart"]["amounts"].get("gross_sales_money").is_none());
    }
}
