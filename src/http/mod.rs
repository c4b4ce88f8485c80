//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → middleware/logging.rs (request/response log lines, metrics)
//!     → middleware/auth.rs (bearer token check)
//!     → handlers.rs (parse, call storage, build body)
//!     → response.rs (map failures to status + JSON error)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer, RequestUuid, X_REQUEST_ID};
