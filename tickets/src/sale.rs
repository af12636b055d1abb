//! Sale flow: price estimates, purchase requests and their invoices.

use crate::config::PricingConfig;
use crate::error::{Result, TicketsError};
use crate::providers::TicketStore;
use crate::types::{Contact, NewPurchaseRequest, PartyType, PromoCode, PurchaseRequest, GROUP_SIZE};
use chrono::{DateTime, Duration, Utc};
use invoice_tickets_invoicing::directory::invoice_number;
use invoice_tickets_invoicing::types::{Money, Payer};
use invoice_tickets_invoicing::{Invoice, InvoiceConnector, InvoiceCreateRequest, InvoiceService};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Price in cents for a party type, after an optional promo code.
///
/// Groups always pay the group price. Individuals pay
/// `base * (1 - percent) - amount`, never less than zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn price_estimate(
    pricing: &PricingConfig,
    party_type: PartyType,
    promo: Option<&PromoCode>,
) -> i64 {
    match (party_type, promo) {
        (PartyType::Group, _) => pricing.group_cents,
        (PartyType::Individual, None) => pricing.individual_cents,
        (PartyType::Individual, Some(promo)) => {
            let discounted = (pricing.individual_cents as f64 * (1.0 - promo.percent)).round() as i64;
            (discounted - promo.amount_cents).max(0)
        }
    }
}

/// `1234` -> `"12.34"`.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

/// Answer to a price enquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDetails {
    /// Promo code that would be applied, if any
    pub promo_code: Option<PromoCode>,
    /// Price as a decimal string, e.g. `"25.00"`
    pub price: String,
}

/// A created purchase request and the invoice sent for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Stored purchase request
    pub purchase_request: PurchaseRequest,
    /// Invoice created on the invoicing service
    pub invoice: Invoice,
}

fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && domain.contains('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate_contact(contact: &Contact, who: &str) -> Result<()> {
    let required = [
        ("first name", &contact.first_name),
        ("last name", &contact.last_name),
        ("email", &contact.email),
        ("phone number", &contact.phone_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(TicketsError::Validation(format!("{who} {field} is required")));
    }
    if !is_email(&contact.email) {
        return Err(TicketsError::Validation(format!(
            "{who} email {:?} is not a valid address",
            contact.email
        )));
    }
    Ok(())
}

/// Check a submitted purchase request's own fields.
///
/// Groups need exactly three additional members, each with a name and a
/// valid email. Individuals must not list members.
///
/// # Errors
///
/// Returns [`TicketsError::Validation`] describing the first problem.
pub fn validate_request(request: &NewPurchaseRequest) -> Result<()> {
    validate_contact(&request.contact, "Purchaser")?;

    match request.party_type {
        PartyType::Individual if !request.group_members.is_empty() => Err(
            TicketsError::Validation("Individual purchases cannot list group members".into()),
        ),
        PartyType::Individual => Ok(()),
        PartyType::Group => {
            if request.group_members.len() != GROUP_SIZE - 1 {
                return Err(TicketsError::Validation(format!(
                    "Group purchases need {} additional members, got {}",
                    GROUP_SIZE - 1,
                    request.group_members.len()
                )));
            }
            for (i, member) in request.group_members.iter().enumerate() {
                let who = format!("Group member {}", i + 2);
                if member.first_name.trim().is_empty() || member.last_name.trim().is_empty() {
                    return Err(TicketsError::Validation(format!("{who} name is required")));
                }
                if !is_email(&member.email) {
                    return Err(TicketsError::Validation(format!(
                        "{who} email {:?} is not a valid address",
                        member.email
                    )));
                }
            }
            Ok(())
        }
    }
}

/// Creates purchase requests and invoices them.
#[derive(Debug, Clone)]
pub struct SaleService<C, S> {
    connector: C,
    store: S,
    pricing: PricingConfig,
    currency: String,
    event_name: String,
}

impl<C: InvoiceConnector, S: TicketStore> SaleService<C, S> {
    /// Create a sale service.
    pub fn new(
        connector: C,
        store: S,
        pricing: PricingConfig,
        currency: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            store,
            pricing,
            currency: currency.into(),
            event_name: event_name.into(),
        }
    }

    /// Pricing in effect.
    #[must_use]
    pub const fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Promo code (individuals only) and price for a prospective purchase.
    ///
    /// Unknown or exhausted codes are not an error here; the full price is
    /// quoted instead.
    ///
    /// # Errors
    ///
    /// Returns error if the promo code lookup fails.
    pub async fn details(&self, code: Option<&str>, party_type: PartyType) -> Result<PriceDetails> {
        let promo_code = match (party_type, code) {
            (PartyType::Individual, Some(code)) if !code.is_empty() => {
                self.store.find_promo_code(code).await?
            }
            _ => None,
        };
        let price = price_estimate(&self.pricing, party_type, promo_code.as_ref());
        Ok(PriceDetails {
            promo_code,
            price: format_cents(price),
        })
    }

    /// Validate, price and persist a purchase request, redeem its promo
    /// code, then create and send its invoice (due one day after `now`).
    ///
    /// # Errors
    ///
    /// - [`TicketsError::Validation`] for bad input, sold-out capacity or an
    ///   unknown promo code; nothing is persisted.
    /// - Store errors.
    /// - [`TicketsError::Invoicing`] if the invoice could not be created. The
    ///   purchase request is already stored and will show `NO_INVOICE`.
    pub async fn purchase(
        &self,
        mut request: NewPurchaseRequest,
        now: DateTime<Utc>,
    ) -> Result<Purchase> {
        request.promo_code = request.promo_code.filter(|code| !code.trim().is_empty());
        validate_request(&request)?;

        let needed = request.party_type.ticket_count();
        let sold = self.store.count_tickets().await?;
        if sold + needed > self.pricing.max_tickets {
            return Err(TicketsError::Validation(format!(
                "Sorry, there are {} tickets available. This event may be sold out, or you need to check back later.",
                self.pricing.max_tickets.saturating_sub(sold)
            )));
        }

        let promo = match &request.promo_code {
            Some(code) => Some(
                self.store
                    .find_promo_code(code)
                    .await?
                    .ok_or_else(|| TicketsError::Validation(format!("Invalid promo code: {code}")))?,
            ),
            None => None,
        };

        let charged_cents = price_estimate(&self.pricing, request.party_type, promo.as_ref());
        let party_type = request.party_type;
        let stored = self
            .store
            .create_purchase_request(request, charged_cents, now)
            .await?;
        info!(
            purchase_request_id = stored.id,
            party_type = %party_type,
            charged = %format_cents(charged_cents),
            "Purchase request created"
        );

        if let Some(code) = &stored.promo_code {
            self.store.redeem_promo_code(code).await?;
        }

        let invoice = self
            .send_invoice(&stored, now)
            .await
            .inspect_err(|e| {
                error!(purchase_request_id = stored.id, error = %e, "Failed to create invoice");
            })?;

        Ok(Purchase {
            purchase_request: stored,
            invoice,
        })
    }

    async fn send_invoice(&self, request: &PurchaseRequest, now: DateTime<Utc>) -> Result<Invoice> {
        let amount = Money::cents(request.charged_cents, self.currency.clone());
        let payer = Payer {
            display_name: request.contact.display_name(),
            email: request.contact.email.clone(),
            token: None,
        };
        let create = InvoiceCreateRequest::custom_amount(
            format!("{} Tickets", self.event_name),
            format!("{} Ticket - {}", self.event_name, request.party_type),
            invoice_number(request.id),
            payer,
            amount,
            (now + Duration::days(1)).date_naive().into(),
        );

        let service = self.connector.connect().await?;
        let invoice = service.create_invoice(create).await?;
        info!(
            purchase_request_id = request.id,
            invoice = %invoice.token,
            "Invoice created"
        );
        Ok(invoice)
    }
}
