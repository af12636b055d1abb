//! # Invoicing session client
//!
//! Client for an invoicing service that offers no public API. Access works
//! by impersonating a browser: the login page seeds a cookie jar, the login
//! form is posted, and every later call echoes the scraped `_js_csrf` cookie
//! as a header together with the merchant token read during bootstrap.
//!
//! ## Example
//!
//! ```no_run
//! use invoice_tickets_invoicing::{Credentials, InvoiceConnector, InvoiceService, SessionConnector};
//! use invoice_tickets_invoicing::directory::index_by_purchase_request;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = SessionConnector::new(
//!     Credentials::new("ops@example.com".into(), "secret".into()),
//!     Duration::from_secs(30),
//! );
//!
//! // One session per unit of work
//! let service = connector.connect().await?;
//! let index = index_by_purchase_request(service.list_invoices().await?);
//! println!("{} invoices belong to purchase requests", index.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`session`]: login, CSRF capture, bootstrap, signed requests
//! - [`client`]: invoice list/create/cancel over a bootstrapped session
//! - [`directory`]: decoding invoice numbers back to purchase requests
//! - [`service`]: traits the rest of the system programs against

pub mod client;
pub mod directory;
pub mod error;
pub mod service;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use client::InvoiceClient;
pub use error::{InvoiceNumberError, InvoicingError, Result};
pub use service::{InvoiceConnector, InvoiceService, SessionConnector};
pub use session::{Credentials, Endpoints, Identity, Session};
pub use types::{Invoice, InvoiceCreateRequest, InvoiceState};
