//! Circuit breaker entry and its lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary key of the registry.
pub type DeviceId = u64;

/// Lifecycle state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CircuitState {
    /// Requests pass through.
    #[default]
    Closed,
    /// Requests are blocked.
    Open,
    /// Limited requests probe the device's health.
    HalfOpen,
}

/// Returned when a wire value does not name a known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown circuit state {0}")]
pub struct UnknownState(pub u8);

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl From<CircuitState> for u8 {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl TryFrom<u8> for CircuitState {
    type Error = UnknownState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CircuitState::Closed),
            1 => Ok(CircuitState::Open),
            2 => Ok(CircuitState::HalfOpen),
            other => Err(UnknownState(other)),
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration and state for a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerEntry {
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,

    pub state: CircuitState,

    /// Timestamp of the last state change.
    pub last_changed: DateTime<Utc>,

    /// Number of errors that should trip the breaker.
    pub errors_threshold: u32,

    /// Window after which the error count resets, in milliseconds.
    pub errors_cnt_reset_timeout_ms: u64,

    /// Time an open breaker waits before probing, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl CircuitBreakerEntry {
    /// Move to `state`, stamping `last_changed` when the state actually changes.
    pub fn transition_to(&mut self, state: CircuitState, now: DateTime<Utc>) {
        if self.state != state {
            self.state = state;
            self.last_changed = now;
        }
    }

    /// Force the breaker closed. Always stamps `last_changed`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Closed;
        self.last_changed = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(state: CircuitState) -> CircuitBreakerEntry {
        CircuitBreakerEntry {
            device_id: 7,
            state,
            last_changed: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            errors_threshold: 5,
            errors_cnt_reset_timeout_ms: 10_000,
            reset_timeout_ms: 60_000,
        }
    }

    #[test]
    fn test_state_wire_format() {
        assert_eq!(serde_json::to_string(&CircuitState::Closed).unwrap(), "0");
        assert_eq!(serde_json::to_string(&CircuitState::Open).unwrap(), "1");
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "2");

        let state: CircuitState = serde_json::from_str("2").unwrap();
        assert_eq!(state, CircuitState::HalfOpen);
        assert!(serde_json::from_str::<CircuitState>("3").is_err());
        assert!(serde_json::from_str::<CircuitState>("\"open\"").is_err());
    }

    #[test]
    fn test_entry_field_names() {
        let value = serde_json::to_value(entry(CircuitState::Open)).unwrap();
        let obj = value.as_object().unwrap();

        for field in [
            "deviceID",
            "state",
            "lastChanged",
            "errorsThreshold",
            "errorsCntResetTimeoutMs",
            "resetTimeoutMs",
        ] {
            assert!(obj.contains_key(field), "missing field {}", field);
        }
        assert_eq!(obj["deviceID"], 7);
        assert_eq!(obj["state"], 1);
    }

    #[test]
    fn test_transition_stamps_only_on_change() {
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let mut e = entry(CircuitState::Closed);
        let before = e.last_changed;
        e.transition_to(CircuitState::Closed, later);
        assert_eq!(e.last_changed, before);

        e.transition_to(CircuitState::Open, later);
        assert_eq!(e.state, CircuitState::Open);
        assert_eq!(e.last_changed, later);
    }

    #[test]
    fn test_reset_always_stamps() {
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let mut e = entry(CircuitState::Closed);
        e.reset(later);
        assert_eq!(e.state, CircuitState::Closed);
        assert_eq!(e.last_changed, later);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
        assert_eq!(u8::from(CircuitState::Open), 1);
        assert_eq!(CircuitState::try_from(9), Err(UnknownState(9)));
    }
}
