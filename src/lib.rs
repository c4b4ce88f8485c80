//! Circuit breaker registry service library.
//!
//! An authenticated HTTP API over a concurrent in-memory registry of
//! per-device circuit breaker records.

// Core subsystems
pub mod config;
pub mod http;
pub mod model;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::BreakerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use storage::{MapStorage, Storage};
