//! Keyed storage subsystem.
//!
//! # Data Flow
//! ```text
//! request handler
//!     → Storage<K, T> (trait object, injected at startup)
//!     → memory.rs (MapStorage: sharded concurrent map)
//!     → StorageError on failure (error.rs)
//! ```
//!
//! # Design Decisions
//! - Generic over key and record so a persistent backend can replace the
//!   in-memory one without touching the HTTP layer
//! - Every call takes a cancellation token and fails with
//!   [`StorageError::Cancelled`] once it fires
//! - Calls are atomic only with respect to themselves; no multi-key
//!   transactions

pub mod error;
pub mod memory;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::model::{CircuitBreakerEntry, DeviceId};

pub use error::{StorageError, StorageResult};
pub use memory::MapStorage;

/// Keyed CRUD and listing over records of type `T` identified by `K`.
#[async_trait]
pub trait Storage<K, T>: Send + Sync
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Release held resources. Idempotent.
    async fn shutdown(&self, ctx: &CancellationToken) -> StorageResult<()>;

    /// Liveness probe without side effects.
    async fn is_alive(&self, ctx: &CancellationToken) -> StorageResult<()>;

    /// Create the entry, or fully replace an existing one.
    async fn upsert_entry(&self, ctx: &CancellationToken, key: K, entry: T) -> StorageResult<()>;

    /// Create the entry only if `key` is absent.
    async fn add_new_entry(&self, ctx: &CancellationToken, key: K, entry: T) -> StorageResult<()>;

    async fn remove_entry(&self, ctx: &CancellationToken, key: &K) -> StorageResult<()>;

    async fn get_entry(&self, ctx: &CancellationToken, key: &K) -> StorageResult<T>;

    /// Every entry, in no particular order.
    async fn get_all_entries(&self, ctx: &CancellationToken) -> StorageResult<Vec<T>>;

    /// Up to `page_size` entries starting at the entry keyed `last_key`
    /// (inclusive) in the store's iteration order.
    async fn get_all_entries_paginated(
        &self,
        ctx: &CancellationToken,
        last_key: &K,
        page_size: usize,
    ) -> StorageResult<Vec<T>>;

    async fn get_all_primary_keys(&self, ctx: &CancellationToken) -> StorageResult<Vec<K>>;
}

/// The storage the HTTP layer is wired against.
pub type EntryStorage = dyn Storage<DeviceId, CircuitBreakerEntry>;
