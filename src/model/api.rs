//! Transport shapes for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EntryDefaults;
use crate::model::entry::{CircuitBreakerEntry, CircuitState, DeviceId};

/// Body of `PUT /circuit-breaker/{deviceID}/config`.
///
/// Omitted fields fall back to the configured [`EntryDefaults`]. A
/// body-supplied `deviceID` is accepted but always overridden by the path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    #[serde(rename = "deviceID")]
    pub device_id: Option<DeviceId>,
    pub state: Option<CircuitState>,
    pub errors_threshold: Option<u32>,
    pub errors_cnt_reset_timeout_ms: Option<u64>,
    pub reset_timeout_ms: Option<u64>,
}

impl ConfigUpdateRequest {
    /// Build the full replacement entry for `device_id`.
    ///
    /// `last_changed` carries over from `previous` while the state stays the
    /// same, and is stamped with `now` otherwise.
    pub fn into_entry(
        self,
        device_id: DeviceId,
        previous: Option<&CircuitBreakerEntry>,
        defaults: &EntryDefaults,
        now: DateTime<Utc>,
    ) -> CircuitBreakerEntry {
        let state = self.state.unwrap_or_default();
        let (prior_state, prior_changed) =
            previous.map_or((state, now), |prev| (prev.state, prev.last_changed));

        let mut entry = CircuitBreakerEntry {
            device_id,
            state: prior_state,
            last_changed: prior_changed,
            errors_threshold: self.errors_threshold.unwrap_or(defaults.errors_threshold),
            errors_cnt_reset_timeout_ms: self
                .errors_cnt_reset_timeout_ms
                .unwrap_or(defaults.errors_cnt_reset_timeout_ms),
            reset_timeout_ms: self.reset_timeout_ms.unwrap_or(defaults.reset_timeout_ms),
        };
        entry.transition_to(state, now);
        entry
    }
}

/// The threshold settings of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerThresholds {
    pub errors_threshold: u32,
    pub errors_cnt_reset_timeout_ms: u64,
    pub reset_timeout_ms: u64,
}

/// Response of the update-config route: the stored entry plus its thresholds
/// under `config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdateResponse {
    #[serde(flatten)]
    pub entry: CircuitBreakerEntry,
    pub config: BreakerThresholds,
}

impl From<CircuitBreakerEntry> for ConfigUpdateResponse {
    fn from(entry: CircuitBreakerEntry) -> Self {
        let config = BreakerThresholds {
            errors_threshold: entry.errors_threshold,
            errors_cnt_reset_timeout_ms: entry.errors_cnt_reset_timeout_ms,
            reset_timeout_ms: entry.reset_timeout_ms,
        };
        Self { entry, config }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,
    pub new_state: CircuitState,
}

/// One offset window over the full listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub circuit_breakers: Vec<CircuitBreakerEntry>,
}

impl PaginatedResponse {
    /// Slice `page` (1-based) of `page_size` items out of `all`.
    ///
    /// Pages past the end yield an empty list. `page_size` must be non-zero.
    pub fn from_offset(all: Vec<CircuitBreakerEntry>, page: usize, page_size: usize) -> Self {
        let total_items = all.len();
        let total_pages = total_items.div_ceil(page_size);

        let start = page
            .saturating_sub(1)
            .saturating_mul(page_size)
            .min(total_items);
        let end = start.saturating_add(page_size).min(total_items);

        let circuit_breakers = all.into_iter().skip(start).take(end - start).collect();

        Self {
            page,
            page_size,
            total_items,
            total_pages,
            circuit_breakers,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
