//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port set)
//! - Require the bearer token
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BreakerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::BreakerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api.server_host must not be empty")]
    MissingServerHost,

    #[error("api.server_port must not be 0")]
    MissingServerPort,

    #[error("api.auth_key must not be empty")]
    MissingAuthKey,

    #[error("{0} must be greater than 0")]
    ZeroValue(&'static str),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api.server_host.trim().is_empty() {
        errors.push(ValidationError::MissingServerHost);
    }
    if config.api.server_port == 0 {
        errors.push(ValidationError::MissingServerPort);
    }
    if config.api.auth_key.is_empty() {
        errors.push(ValidationError::MissingAuthKey);
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("api.request_timeout_secs"));
    }
    if config.api.graceful_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("api.graceful_timeout_secs"));
    }
    if config.api.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("api.max_body_size"));
    }
    if config.defaults.page_size == 0 {
        errors.push(ValidationError::ZeroValue("defaults.page_size"));
    }

    let level = &config.observability.log_level;
    if tracing::Level::from_str(level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(level.clone()));
    }

    let metrics_address = &config.observability.metrics_address;
    if config.observability.metrics_enabled && metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
