//! Request middleware.
//!
//! `logging` wraps everything so rejected requests are logged too; `auth`
//! sits just outside the routes and the fallback.

pub mod auth;
pub mod logging;

pub use auth::require_bearer;
pub use logging::log_requests;
