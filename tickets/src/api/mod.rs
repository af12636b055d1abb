//! HTTP surface.
//!
//! - `GET /health`
//! - `GET /api/ticket/:id`
//! - `GET /api/details?code=&type=`
//! - `POST /api/buy`
//!
//! Admin routes require HTTP basic auth:
//!
//! - `GET /api/purchase-requests`
//! - `GET|POST /api/promo-codes`
//! - `GET|POST|PATCH|DELETE /api/tickets`
//! - `GET /api/stats`
//! - `GET /api/invoices`

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::AdminCredentials;
pub use error::ApiError;
pub use routes::{admin_routes, build_router, public_routes};
pub use state::AppState;
