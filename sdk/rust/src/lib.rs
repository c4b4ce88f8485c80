//! Client for the circuit breaker registry API.

mod client;

pub use client::{
    Breaker, BreakerClient, BreakerPage, ClientError, ConfigUpdate, ConfigUpdated, ResetResult,
    Thresholds,
};
