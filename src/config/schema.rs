//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config file.
//! Every section has defaults so a minimal file only needs `api.auth_key`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration for the circuit breaker service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakerConfig {
    /// HTTP API settings.
    pub api: ApiConfig,

    /// Values used when a request leaves a field unset.
    pub defaults: EntryDefaults,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server_host: String,

    pub server_port: u16,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on draining in-flight requests at shutdown, in seconds.
    pub graceful_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Shared bearer token every request must present.
    pub auth_key: AuthKey,
}

impl ApiConfig {
    /// `host:port` the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            request_timeout_secs: 30,
            graceful_timeout_secs: 10,
            max_body_size: 1024 * 1024, // 1MB
            auth_key: AuthKey::default(),
        }
    }
}

/// Defaults applied to listing and to fields omitted from an update.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EntryDefaults {
    /// Page size of the list route when `pageSize` is absent.
    pub page_size: usize,

    pub errors_threshold: u32,

    pub reset_timeout_ms: u64,

    pub errors_cnt_reset_timeout_ms: u64,
}

impl Default for EntryDefaults {
    fn default() -> Self {
        Self {
            page_size: 10,
            errors_threshold: 5,
            reset_timeout_ms: 60_000,
            errors_cnt_reset_timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Bearer token that never shows up in logs.
///
/// `Debug`, `Display` and `Serialize` all render `***`; only
/// [`expose`](Self::expose) yields the real value.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey(Arc<str>);

impl AuthKey {
    const REDACTED: &'static str = "***";

    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AuthKey {
    fn default() -> Self {
        Self(Arc::from(""))
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

impl fmt::Display for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

impl Serialize for AuthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(Self::REDACTED)
    }
}

impl<'de> Deserialize<'de> for AuthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(AuthKey::new)
    }
}
