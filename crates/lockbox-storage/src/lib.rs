//! Persistence substrate for Lockbox.
//!
//! This crate defines the [`StorageBackend`] trait, a durable key to
//! byte-blob store that knows nothing about secrets, tokens, or encryption.
//! The vault engine in `lockbox-core` encrypts every secret payload before it
//! reaches this layer; the only plaintext values it ever writes are the
//! one-way root token digest and the self-encrypted unseal verifier.
//!
//! Two implementations are provided:
//!
//! - [`RedbBackend`]: durable default, backed by redb (feature `redb-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and throwaway dev servers

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;

/// A durable key-value store.
///
/// Keys are UTF-8 strings using `/` as a separator (`core/unseal-key`,
/// `secret/app/db`). Values are opaque bytes. Each `put` and `delete` must be
/// atomic per key: a concurrent reader sees either the old or the new value,
/// never a partial write.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a value, replacing any existing value under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.
    ///
    /// Returns `true` if a value was removed and `false` if the key was
    /// absent. Deleting a missing key is not an error at this layer; callers
    /// decide whether absence matters.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// List all keys that start with `prefix`, in ascending key order.
    ///
    /// An empty prefix lists every key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the underlying backend fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check whether a key exists.
    ///
    /// The default implementation calls [`get`](StorageBackend::get).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
