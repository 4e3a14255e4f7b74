//! Volatile token registry.
//!
//! Tokens live only in process memory and are gone after a restart. The
//! root token can be re-admitted through
//! [`Vault::authenticate_root_token`](crate::vault::Vault::authenticate_root_token),
//! which checks it against the persisted digest.
//!
//! Expiry is lazy: [`TokenStore::validate`] reports an expired token but
//! never removes it. [`TokenStore::purge_expired`] does the eviction and is
//! driven by a periodic sweep in the server.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::TokenError;

/// Lifetime given to a root token issued with a zero TTL.
const ROOT_TOKEN_LIFETIME_DAYS: i64 = 365 * 100;

/// A registered token.
#[derive(Clone)]
pub struct Token {
    /// Bearer id presented by callers.
    pub id: String,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// When the token stops validating.
    pub expires_at: DateTime<Utc>,
    /// Whether this is a root token.
    pub is_root: bool,
}

impl Token {
    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("is_root", &self.is_root)
            .finish()
    }
}

/// Concurrent map of token id to [`Token`].
#[derive(Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, Token>>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`, replacing any existing entry with the same id.
    ///
    /// A root token issued with a zero `ttl` is valid for 100 years.
    pub async fn issue(&self, id: impl Into<String>, is_root: bool, ttl: Duration) -> Token {
        let now = Utc::now();
        let lifetime = if is_root && ttl == Duration::zero() {
            Duration::days(ROOT_TOKEN_LIFETIME_DAYS)
        } else {
            ttl
        };
        let token = Token {
            id: id.into(),
            created_at: now,
            expires_at: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
            is_root,
        };
        self.tokens
            .write()
            .await
            .insert(token.id.clone(), token.clone());
        token
    }

    /// Check that `id` is registered and unexpired.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Invalid`] if the id is unknown.
    /// - [`TokenError::Expired`] if the token's expiry has passed.
    pub async fn validate(&self, id: &str) -> Result<(), TokenError> {
        let tokens = self.tokens.read().await;
        let token = tokens.get(id).ok_or(TokenError::Invalid)?;
        if token.is_expired_at(Utc::now()) {
            return Err(TokenError::Expired {
                expired_at: token.expires_at,
            });
        }
        Ok(())
    }

    /// Remove `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotFound`] if the id is not registered.
    pub async fn revoke(&self, id: &str) -> Result<(), TokenError> {
        self.tokens
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(TokenError::NotFound)
    }

    /// Whether `id` is a registered root token. Unknown ids are not root.
    pub async fn is_root(&self, id: &str) -> bool {
        self.tokens
            .read()
            .await
            .get(id)
            .is_some_and(|t| t.is_root)
    }

    /// Drop every expired token and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired_at(now));
        before.saturating_sub(tokens.len())
    }

    /// Number of registered tokens, expired ones included.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Whether no tokens are registered.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}
