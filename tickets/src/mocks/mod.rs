//! In-memory providers for tests.
//!
//! Enabled by the `test-utils` feature (on by default).

pub mod email;
pub mod store;

pub use email::{MockEmailProvider, SentEmail};
pub use store::InMemoryTicketStore;
