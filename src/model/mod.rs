//! Record model.
//!
//! # Data Flow
//! ```text
//! PUT body (ConfigUpdateRequest)
//!     → into_entry() (key forced to path id, defaults applied)
//!     → CircuitBreakerEntry (stored canonical copy)
//!     → ConfigUpdateResponse / ResetResponse / PaginatedResponse
//! ```
//!
//! # Design Decisions
//! - `state` and the threshold fields are inert configuration; nothing here
//!   evaluates them
//! - States travel as integers on the wire (`0 | 1 | 2`)

pub mod api;
pub mod entry;

pub use api::{
    BreakerThresholds, ConfigUpdateRequest, ConfigUpdateResponse, ErrorResponse,
    PaginatedResponse, ResetResponse,
};
pub use entry::{CircuitBreakerEntry, CircuitState, DeviceId, UnknownState};
