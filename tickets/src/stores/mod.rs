//! Store implementations.

pub mod postgres;

pub use postgres::PostgresTicketStore;
