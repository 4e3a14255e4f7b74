//! The vault engine.
//!
//! [`Vault`] owns the seal state and the master key, and is the only thing
//! the transport layer talks to. Every data-plane call follows the same
//! order: seal check, token validation, path validation, then cipher and
//! storage work.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Sealed <--unseal/seal--> Unsealed
//! ```
//!
//! `initialize` generates the master key and root token, persists the root
//! token digest and then the unseal verifier (the master key encrypted under
//! itself), and leaves the vault sealed. Every process starts sealed.
//!
//! # Locking
//!
//! State sits behind one `RwLock`. Lifecycle transitions take the write
//! lock; status and data-plane calls hold the read lock until they return,
//! so `seal` waits for in-flight secret operations to finish.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Duration;
use lockbox_storage::StorageBackend;
use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{
    Aes256GcmCipher, Cipher, EncryptionKey, KEY_LEN, generate_token_id, hash_token,
    verify_token_digest,
};
use crate::error::VaultError;
use crate::secret::{self, SECRET_PREFIX, Secret, SecretData};
use crate::token::TokenStore;

/// Storage key for the self-encrypted master key. Its presence marks the
/// vault as initialized.
const UNSEAL_KEY_PATH: &str = "core/unseal-key";

/// Storage key for the hex SHA-256 digest of the root token.
const ROOT_TOKEN_PATH: &str = "core/root-token";

/// Credentials returned once by [`Vault::initialize`].
pub struct InitResult {
    /// Root token, valid for 100 years in this process.
    pub root_token: String,
    /// Base64 of the 32-byte master key.
    pub unseal_key: String,
}

impl fmt::Debug for InitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitResult")
            .field("root_token", &"[REDACTED]")
            .field("unseal_key", &"[REDACTED]")
            .finish()
    }
}

impl Drop for InitResult {
    fn drop(&mut self) {
        self.root_token.zeroize();
        self.unseal_key.zeroize();
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VaultStatus {
    pub initialized: bool,
    pub sealed: bool,
}

struct VaultState {
    initialized: bool,
    master_key: Option<EncryptionKey>,
}

impl VaultState {
    fn is_sealed(&self) -> bool {
        self.master_key.is_none()
    }

    fn master_key(&self) -> Result<&EncryptionKey, VaultError> {
        self.master_key.as_ref().ok_or(VaultError::Sealed)
    }

    fn status(&self) -> VaultStatus {
        VaultStatus {
            initialized: self.initialized,
            sealed: self.is_sealed(),
        }
    }
}

/// The secrets engine.
pub struct Vault {
    storage: Arc<dyn StorageBackend>,
    cipher: Arc<dyn Cipher>,
    tokens: TokenStore,
    state: RwLock<VaultState>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    /// Open a vault over `storage` using AES-256-GCM.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the initialization marker cannot
    /// be read.
    pub async fn open(storage: Arc<dyn StorageBackend>) -> Result<Self, VaultError> {
        Self::with_cipher(storage, Arc::new(Aes256GcmCipher)).await
    }

    /// Open a vault with an explicit cipher.
    ///
    /// The vault always starts sealed. It counts as initialized when an
    /// unseal verifier is already persisted.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the initialization marker cannot
    /// be read.
    pub async fn with_cipher(
        storage: Arc<dyn StorageBackend>,
        cipher: Arc<dyn Cipher>,
    ) -> Result<Self, VaultError> {
        let initialized = storage.exists(UNSEAL_KEY_PATH).await?;
        info!(initialized, "vault opened (sealed)");
        Ok(Self {
            storage,
            cipher,
            tokens: TokenStore::new(),
            state: RwLock::new(VaultState {
                initialized,
                master_key: None,
            }),
        })
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> VaultStatus {
        self.state.read().await.status()
    }

    // ── lifecycle ────────────────────────────────────────────────────

    /// Initialize the vault. Only possible once per storage.
    ///
    /// The returned credentials are the only copy; neither the unseal key
    /// nor the root token is persisted in recoverable form. The vault stays
    /// sealed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::AlreadyInitialized`] if the vault was initialized before.
    /// - [`VaultError::Encryption`] if the verifier cannot be produced.
    /// - [`VaultError::Storage`] if persisting fails.
    pub async fn initialize(&self) -> Result<InitResult, VaultError> {
        let mut state = self.state.write().await;
        if state.initialized {
            return Err(VaultError::AlreadyInitialized);
        }

        let master_key = EncryptionKey::generate();
        let root_token = generate_token_id();
        let verifier = self.cipher.encrypt(&master_key, master_key.as_bytes())?;

        // The verifier is the initialized marker, so it goes last.
        self.storage
            .put(ROOT_TOKEN_PATH, hash_token(&root_token).as_bytes())
            .await?;
        self.storage.put(UNSEAL_KEY_PATH, &verifier).await?;

        self.tokens
            .issue(root_token.clone(), true, Duration::zero())
            .await;
        state.initialized = true;

        info!("vault initialized");

        Ok(InitResult {
            root_token,
            unseal_key: BASE64.encode(master_key.as_bytes()),
        })
    }

    /// Unseal with the base64 master key returned by [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotInitialized`] if the vault has not been initialized.
    /// - [`VaultError::AlreadyUnsealed`] if the vault is already unsealed.
    /// - [`VaultError::InvalidUnsealKeyFormat`] if `unseal_key` is not base64
    ///   of exactly 32 bytes.
    /// - [`VaultError::InvalidUnsealKey`] if the key does not match.
    /// - [`VaultError::Storage`] if the verifier cannot be read.
    pub async fn unseal(&self, unseal_key: &str) -> Result<VaultStatus, VaultError> {
        let mut state = self.state.write().await;
        if !state.initialized {
            return Err(VaultError::NotInitialized);
        }
        if !state.is_sealed() {
            return Err(VaultError::AlreadyUnsealed);
        }

        let candidate = decode_unseal_key(unseal_key)?;
        let verifier = self
            .storage
            .get(UNSEAL_KEY_PATH)
            .await?
            .ok_or(VaultError::NotInitialized)?;

        let recovered = Zeroizing::new(
            self.cipher
                .decrypt(&candidate, &verifier)
                .map_err(|_| VaultError::InvalidUnsealKey)?,
        );
        if !candidate.ct_eq_bytes(&recovered) {
            warn!("unseal verifier decrypted but did not match the candidate key");
            return Err(VaultError::InvalidUnsealKey);
        }

        state.master_key = Some(candidate);
        info!("vault unsealed");
        Ok(state.status())
    }

    /// Seal the vault and drop the master key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AlreadySealed`] if the vault is already sealed.
    pub async fn seal(&self) -> Result<VaultStatus, VaultError> {
        let mut state = self.state.write().await;
        // Dropping the key zeroizes it.
        let key = state.master_key.take().ok_or(VaultError::AlreadySealed)?;
        drop(key);
        info!("vault sealed");
        Ok(state.status())
    }

    /// Seal check followed by token validation. The returned guard keeps
    /// the vault unsealed until the caller is done.
    async fn authorize(&self, token: &str) -> Result<RwLockReadGuard<'_, VaultState>, VaultError> {
        let state = self.state.read().await;
        if state.is_sealed() {
            return Err(VaultError::Sealed);
        }
        self.tokens.validate(token).await?;
        Ok(state)
    }

    // ── secrets ──────────────────────────────────────────────────────

    /// Write `data` at `path`, replacing any existing secret.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`] if the vault is sealed.
    /// - [`VaultError::InvalidToken`] / [`VaultError::TokenExpired`] for a bad caller.
    /// - [`VaultError::MalformedRequest`] for an invalid path.
    /// - [`VaultError::Encryption`] / [`VaultError::Storage`] on failure.
    pub async fn write_secret(
        &self,
        token: &str,
        path: &str,
        data: SecretData,
    ) -> Result<(), VaultError> {
        self.write_secret_with_metadata(token, path, data, SecretData::new())
            .await
    }

    /// Write `data` and `metadata` at `path`, replacing any existing secret.
    ///
    /// # Errors
    ///
    /// Same as [`write_secret`](Self::write_secret).
    pub async fn write_secret_with_metadata(
        &self,
        token: &str,
        path: &str,
        data: SecretData,
        metadata: SecretData,
    ) -> Result<(), VaultError> {
        let state = self.authorize(token).await?;
        secret::validate_path(path)?;

        let plaintext = Zeroizing::new(
            serde_json::to_vec(&Secret::new(data, metadata)).map_err(|e| {
                VaultError::Encryption {
                    reason: format!("failed to encode secret: {e}"),
                }
            })?,
        );
        let blob = self.cipher.encrypt(state.master_key()?, &plaintext)?;
        self.storage.put(&secret::storage_key(path), &blob).await?;

        debug!(path, "secret written");
        Ok(())
    }

    /// Read the secret at `path`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`], [`VaultError::InvalidToken`], [`VaultError::TokenExpired`].
    /// - [`VaultError::MalformedRequest`] for an invalid path.
    /// - [`VaultError::NotFound`] if nothing is stored at `path`.
    /// - [`VaultError::Decryption`] if the stored blob is corrupt.
    pub async fn read_secret(&self, token: &str, path: &str) -> Result<Secret, VaultError> {
        let state = self.authorize(token).await?;
        secret::validate_path(path)?;

        let key = secret::storage_key(path);
        let blob = self
            .storage
            .get(&key)
            .await?
            .ok_or(VaultError::NotFound { resource: key })?;
        let plaintext = Zeroizing::new(self.cipher.decrypt(state.master_key()?, &blob)?);

        serde_json::from_slice(&plaintext).map_err(|e| VaultError::Decryption {
            reason: format!("stored secret is not valid: {e}"),
        })
    }

    /// Delete the secret at `path`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`], [`VaultError::InvalidToken`], [`VaultError::TokenExpired`].
    /// - [`VaultError::MalformedRequest`] for an invalid path.
    /// - [`VaultError::NotFound`] if nothing is stored at `path`.
    pub async fn delete_secret(&self, token: &str, path: &str) -> Result<(), VaultError> {
        let _state = self.authorize(token).await?;
        secret::validate_path(path)?;

        let key = secret::storage_key(path);
        if !self.storage.delete(&key).await? {
            return Err(VaultError::NotFound { resource: key });
        }
        debug!(path, "secret deleted");
        Ok(())
    }

    /// List secret paths starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`], [`VaultError::InvalidToken`], [`VaultError::TokenExpired`].
    /// - [`VaultError::MalformedRequest`] for an invalid prefix.
    pub async fn list_secrets(&self, token: &str, prefix: &str) -> Result<Vec<String>, VaultError> {
        let _state = self.authorize(token).await?;
        secret::validate_prefix(prefix)?;

        let keys = self.storage.list(&secret::storage_key(prefix)).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(SECRET_PREFIX).map(str::to_owned))
            .filter(|k| !k.is_empty())
            .collect())
    }

    // ── tokens ───────────────────────────────────────────────────────

    /// Issue a new non-root token valid for `ttl`. Only root may do this.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`], [`VaultError::InvalidToken`], [`VaultError::TokenExpired`].
    /// - [`VaultError::PermissionDenied`] if `caller` is not a root token.
    /// - [`VaultError::MalformedRequest`] if `ttl` is negative.
    pub async fn create_token(&self, caller: &str, ttl: Duration) -> Result<String, VaultError> {
        let _state = self.authorize(caller).await?;
        if !self.tokens.is_root(caller).await {
            return Err(VaultError::PermissionDenied {
                reason: "only root tokens can create tokens".to_owned(),
            });
        }
        if ttl < Duration::zero() {
            return Err(VaultError::malformed("token ttl must not be negative"));
        }

        let id = generate_token_id();
        let token = self.tokens.issue(id.clone(), false, ttl).await;
        info!(expires_at = %token.expires_at, "token created");
        Ok(id)
    }

    /// Re-admit the root token after a restart.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`] if the vault is sealed.
    /// - [`VaultError::InvalidRootToken`] if `candidate` does not match the
    ///   stored digest, or no digest exists.
    pub async fn authenticate_root_token(&self, candidate: &str) -> Result<(), VaultError> {
        let state = self.state.read().await;
        if state.is_sealed() {
            return Err(VaultError::Sealed);
        }

        let digest = self
            .storage
            .get(ROOT_TOKEN_PATH)
            .await?
            .ok_or(VaultError::InvalidRootToken)?;
        if !verify_token_digest(candidate, &digest) {
            return Err(VaultError::InvalidRootToken);
        }

        self.tokens.issue(candidate, true, Duration::zero()).await;
        info!("root token authenticated");
        Ok(())
    }

    /// Revoke `target`. Any token may revoke itself; revoking another token
    /// requires root.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Sealed`], [`VaultError::InvalidToken`], [`VaultError::TokenExpired`].
    /// - [`VaultError::PermissionDenied`] for a non-root caller revoking another token.
    /// - [`VaultError::NotFound`] if `target` is not registered.
    pub async fn revoke_token(&self, caller: &str, target: &str) -> Result<(), VaultError> {
        let _state = self.authorize(caller).await?;
        if caller != target && !self.tokens.is_root(caller).await {
            return Err(VaultError::PermissionDenied {
                reason: "only root tokens can revoke other tokens".to_owned(),
            });
        }
        self.tokens.revoke(target).await?;
        info!("token revoked");
        Ok(())
    }

    /// Evict expired tokens. Returns how many were removed.
    pub async fn purge_expired_tokens(&self) -> usize {
        let removed = self.tokens.purge_expired().await;
        if removed > 0 {
            debug!(removed, "expired tokens purged");
        }
        removed
    }
}

fn decode_unseal_key(encoded: &str) -> Result<EncryptionKey, VaultError> {
    let decoded = Zeroizing::new(BASE64.decode(encoded).map_err(|e| {
        VaultError::InvalidUnsealKeyFormat {
            reason: format!("not valid base64: {e}"),
        }
    })?);
    let mut bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
        VaultError::InvalidUnsealKeyFormat {
            reason: format!("expected {KEY_LEN} bytes, got {}", decoded.len()),
        }
    })?;
    let key = EncryptionKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}
