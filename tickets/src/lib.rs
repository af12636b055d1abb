//! # Invoice-reconciled ticket sales
//!
//! Sells event tickets and settles them against an external invoicing
//! service reached through [`invoice_tickets_invoicing`].
//!
//! - [`sale`]: price estimates, purchase requests, invoice creation
//! - [`reconcile`]: the polling loop that issues tickets for paid invoices
//!   and cancels stale unpaid ones
//! - [`issuance`]: ticket id generation and persistence
//! - [`notification`]: ticket emails
//! - [`listing`]: admin view of purchase requests with invoice status
//! - [`api`]: HTTP surface
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use invoice_tickets::config::ReconcileConfig;
//! use invoice_tickets::mocks::{InMemoryTicketStore, MockEmailProvider};
//! use invoice_tickets::notification::TicketMailer;
//! use invoice_tickets::reconcile::Reconciler;
//! use invoice_tickets_invoicing::mocks::MockInvoicing;
//!
//! # async fn example() -> Result<(), invoice_tickets::TicketsError> {
//! let reconciler = Reconciler::new(
//!     MockInvoicing::new(),
//!     InMemoryTicketStore::new(),
//!     TicketMailer::new(MockEmailProvider::new(), "https://tickets.example.org", "Year End Gala"),
//!     ReconcileConfig::default(),
//! );
//! let report = reconciler.run_cycle(Utc::now()).await?;
//! println!("issued {} ticket(s)", report.tickets_issued);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod issuance;
pub mod listing;
pub mod metrics;
pub mod notification;
pub mod providers;
pub mod reconcile;
pub mod sale;
pub mod stores;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::Config;
pub use error::{IssuanceError, Result, TicketsError};
pub use reconcile::{CycleReport, Decision, Reconciler};
pub use sale::SaleService;
