use thiserror::Error;

/// Errors that any storage backend may surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend was used before it was opened.
    #[error("storage: not initialized")]
    NotInitialized,

    #[error("storage: entry not found")]
    NotFound,

    #[error("storage: entry already exists")]
    AlreadyExists,

    /// The caller's cancellation token fired before the call completed.
    #[error("storage: operation cancelled")]
    Cancelled,
}

pub type StorageResult<T> = Result<T, StorageError>;
