//! Domain types: purchase requests, promo codes, tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned purchase request identifier.
pub type PurchaseRequestId = i64;

/// Number of tickets a group purchase yields.
pub const GROUP_SIZE: usize = 4;

/// Who a purchase request buys for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyType {
    /// One ticket
    #[default]
    Individual,
    /// Purchaser plus three group members
    Group,
}

impl PartyType {
    /// Tickets issued for this party type.
    #[must_use]
    pub const fn ticket_count(self) -> usize {
        match self {
            Self::Individual => 1,
            Self::Group => GROUP_SIZE,
        }
    }

    /// Parse the free-form type sent by the sale form; anything mentioning
    /// `Group` is a group.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        if raw.contains("Group") {
            Self::Group
        } else {
            Self::Individual
        }
    }

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Group => "Group",
        }
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact fields of a purchaser, group member or ticket holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// First name
    #[serde(default)]
    pub first_name: String,
    /// Last name
    #[serde(default)]
    pub last_name: String,
    /// Phone number
    #[serde(default)]
    pub phone_number: String,
    /// Email address
    #[serde(default)]
    pub email: String,
}

impl Contact {
    /// `"First Last"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Where a purchase request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// No tickets and no cancellation yet
    Unresolved,
    /// Tickets issued and associated
    Issued,
    /// Stale invoice canceled
    Canceled,
}

/// A submitted intent to buy tickets, pending payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Store-assigned id
    pub id: PurchaseRequestId,
    /// Purchaser
    #[serde(flatten)]
    pub contact: Contact,
    /// Individual or group
    pub party_type: PartyType,
    /// Up to three additional group members
    pub group_members: Vec<Contact>,
    /// Promo code applied at purchase time
    pub promo_code: Option<String>,
    /// Amount invoiced, in cents
    pub charged_cents: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Set once the stale invoice has been canceled
    pub canceled_at: Option<DateTime<Utc>>,
    /// Tickets associated after payment
    pub tickets: Vec<Ticket>,
}

impl PurchaseRequest {
    /// Current outcome; issued wins over canceled if both were ever recorded.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if !self.tickets.is_empty() {
            Outcome::Issued
        } else if self.canceled_at.is_some() {
            Outcome::Canceled
        } else {
            Outcome::Unresolved
        }
    }

    /// Ticket holders in issuance order: the purchaser first, then exactly
    /// three group members for groups (missing members yield blank contacts).
    #[must_use]
    pub fn holders(&self) -> Vec<Contact> {
        let mut holders = vec![self.contact.clone()];
        if self.party_type == PartyType::Group {
            holders.extend(
                self.group_members
                    .iter()
                    .cloned()
                    .chain(std::iter::repeat(Contact::default()))
                    .take(GROUP_SIZE - 1),
            );
        }
        holders
    }
}

/// Fields supplied by the sale flow when creating a purchase request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseRequest {
    /// Purchaser
    #[serde(flatten)]
    pub contact: Contact,
    /// Individual or group
    #[serde(default)]
    pub party_type: PartyType,
    /// Additional group members
    #[serde(default)]
    pub group_members: Vec<Contact>,
    /// Promo code to redeem
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// A discount code with a limited number of redemptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// The code itself
    pub id: String,
    /// Fractional discount, `0.25` is 25% off
    pub percent: f64,
    /// Flat discount in cents, applied after the percentage
    pub amount_cents: i64,
    /// Remaining redemptions, never negative
    pub count: i32,
}

/// Human-readable ticket identifier, e.g. `"calmly-happy-otter"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl TicketId {
    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued ticket. Only the holder details change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Globally unique id
    pub id: TicketId,
    /// Owning purchase request; `None` until associated
    pub purchase_request_id: Option<PurchaseRequestId>,
    /// Holder
    #[serde(flatten)]
    pub holder: Contact,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Access link for this ticket.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/ticket/{}", base_url.trim_end_matches('/'), self.id)
    }

    /// `First Last <a href="url">url</a><br>`
    #[must_use]
    pub fn html(&self, base_url: &str) -> String {
        let url = self.url(base_url);
        format!(
            r#"{} <a href="{url}">{url}</a><br>"#,
            self.holder.display_name()
        )
    }
}

/// Public ticket lookup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    /// Ticket id
    pub id: TicketId,
    /// Holder first name
    pub first_name: String,
    /// Holder last name
    pub last_name: String,
    /// Holder phone number
    pub phone_number: String,
    /// Holder email
    pub email: String,
}

impl From<Ticket> for TicketDetails {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            first_name: ticket.holder.first_name,
            last_name: ticket.holder.last_name,
            phone_number: ticket.holder.phone_number,
            email: ticket.holder.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: TicketId(id.to_string()),
            purchase_request_id: None,
            holder: Contact {
                first_name: "first".into(),
                last_name: "last".into(),
                ..Contact::default()
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ticket_url() {
        assert_eq!(
            ticket("test").url("http://tickets.example.org/"),
            "http://tickets.example.org/ticket/test"
        );
    }

    #[test]
    fn test_ticket_html() {
        assert_eq!(
            ticket("test").html("http://tickets.example.org"),
            r#"first last <a href="http://tickets.example.org/ticket/test">http://tickets.example.org/ticket/test</a><br>"#
        );
    }

    #[test]
    fn test_party_type_from_raw() {
        assert_eq!(PartyType::from_raw("Group of 4 ($80)"), PartyType::Group);
        assert_eq!(PartyType::from_raw("Individual ($25)"), PartyType::Individual);
        assert_eq!(PartyType::from_raw(""), PartyType::Individual);
    }

    #[test]
    fn test_group_holders_always_four() {
        let request = PurchaseRequest {
            id: 1,
            contact: Contact {
                first_name: "Ada".into(),
                ..Contact::default()
            },
            party_type: PartyType::Group,
            group_members: vec![Contact {
                first_name: "Grace".into(),
                ..Contact::default()
            }],
            promo_code: None,
            charged_cents: 8000,
            created_at: Utc::now(),
            canceled_at: None,
            tickets: Vec::new(),
        };

        let holders = request.holders();
        assert_eq!(holders.len(), 4);
        assert_eq!(holders[0].first_name, "Ada");
        assert_eq!(holders[1].first_name, "Grace");
        assert_eq!(holders[3], Contact::default());
        assert_eq!(request.outcome(), Outcome::Unresolved);
    }
}
