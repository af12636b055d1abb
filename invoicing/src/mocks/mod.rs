//! Mock implementations for testing.
//!
//! In-memory stand-ins for the invoicing service, usable from unit and
//! integration tests of dependent crates.

pub mod invoicing;

pub use invoicing::{invoice_for, MockInvoicing};
