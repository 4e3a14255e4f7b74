//! Core library for Lockbox.
//!
//! Contains the vault engine ([`vault::Vault`]), the seal/unseal lifecycle,
//! AES-256-GCM secret encryption, and the in-memory token store. Persistence
//! goes through the `StorageBackend` trait from `lockbox-storage`; this
//! crate knows nothing about HTTP.

pub mod crypto;
pub mod error;
pub mod secret;
pub mod token;
pub mod vault;

pub use error::VaultError;
pub use secret::{Secret, SecretData};
pub use vault::{InitResult, Vault, VaultStatus};
