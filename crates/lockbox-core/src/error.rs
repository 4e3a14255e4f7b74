//! Error types for `lockbox-core`.
//!
//! One enum per layer. Lower layers convert into [`VaultError`], which is
//! the only error type the transport crates ever see. No variant carries key
//! or token material.

use chrono::{DateTime, Utc};
use lockbox_storage::StorageError;

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}

/// Errors from the token store.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No token with the given id is registered.
    #[error("invalid token")]
    Invalid,

    /// The token exists but its TTL has passed.
    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// Revocation target is not registered.
    #[error("token not found")]
    NotFound,
}

/// Errors surfaced by the vault engine.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The vault has never been initialized.
    #[error("vault is not initialized")]
    NotInitialized,

    /// `initialize` was called on an initialized vault.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The vault is sealed; no data-plane operation is possible.
    #[error("vault is sealed")]
    Sealed,

    /// `seal` was called on a sealed vault.
    #[error("vault is already sealed")]
    AlreadySealed,

    /// `unseal` was called on an unsealed vault.
    #[error("vault is already unsealed")]
    AlreadyUnsealed,

    /// The unseal key is not base64 of exactly 32 bytes.
    #[error("invalid unseal key format: {reason}")]
    InvalidUnsealKeyFormat { reason: String },

    /// The unseal key is well-formed but does not match the vault.
    #[error("invalid unseal key")]
    InvalidUnsealKey,

    /// The caller token is unknown.
    #[error("invalid token")]
    InvalidToken,

    /// The caller token has expired.
    #[error("token expired at {expired_at}")]
    TokenExpired { expired_at: DateTime<Utc> },

    /// The caller is authenticated but not allowed to do this.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// The candidate root token does not match the stored digest.
    #[error("invalid root token")]
    InvalidRootToken,

    /// A secret or token does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// A stored blob could not be decrypted or decoded.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// A payload could not be encoded or encrypted.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The request itself is invalid (bad path, negative TTL, bad duration).
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },
}

impl VaultError {
    /// Shorthand for [`VaultError::MalformedRequest`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }
}

impl From<TokenError> for VaultError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired { expired_at } => Self::TokenExpired { expired_at },
            TokenError::NotFound => Self::NotFound {
                resource: "token".to_owned(),
            },
        }
    }
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Encryption { reason } => Self::Encryption { reason },
            other @ (CryptoError::Decryption { .. } | CryptoError::CiphertextTooShort { .. }) => {
                Self::Decryption {
                    reason: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_map_to_auth_variants() {
        assert!(matches!(
            VaultError::from(TokenError::Invalid),
            VaultError::InvalidToken
        ));
        assert!(matches!(
            VaultError::from(TokenError::NotFound),
            VaultError::NotFound { .. }
        ));
        let now = Utc::now();
        assert!(matches!(
            VaultError::from(TokenError::Expired { expired_at: now }),
            VaultError::TokenExpired { expired_at } if expired_at == now
        ));
    }

    #[test]
    fn short_ciphertext_is_a_decryption_failure() {
        let err = VaultError::from(CryptoError::CiphertextTooShort {
            expected: 28,
            actual: 3,
        });
        assert!(matches!(err, VaultError::Decryption { .. }));
        assert!(err.to_string().contains("too short"));
    }
}
