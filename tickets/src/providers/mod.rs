//! Providers for the ticket system's external dependencies.
//!
//! The reconciliation loop, the sale flow and the HTTP handlers depend on
//! these traits. Production wires in [`crate::stores::PostgresTicketStore`]
//! and [`SmtpEmailProvider`]; tests use the in-memory versions from
//! [`crate::mocks`].

pub mod configured_email;
pub mod console_email;
pub mod email;
pub mod smtp_email;
pub mod store;

pub use configured_email::ConfiguredEmailProvider;
pub use console_email::ConsoleEmailProvider;
pub use email::EmailProvider;
pub use smtp_email::SmtpEmailProvider;
pub use store::TicketStore;
