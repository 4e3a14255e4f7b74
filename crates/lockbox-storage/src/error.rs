//! Storage error types.
//!
//! Variants carry the key or path involved so a failure can be traced
//! without a debugger. Values are never included.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be opened or created at the given path.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Reading a key failed.
    #[error("failed to read key '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Writing a key failed.
    #[error("failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Deleting a key failed.
    #[error("failed to delete key '{key}': {reason}")]
    Delete { key: String, reason: String },

    /// Listing keys under a prefix failed.
    #[error("failed to list keys with prefix '{prefix}': {reason}")]
    List { prefix: String, reason: String },

    /// Beginning or committing a transaction failed.
    #[error("transaction failed: {reason}")]
    Transaction { reason: String },
}
