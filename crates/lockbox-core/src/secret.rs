//! Stored secret model and path rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Storage prefix for secret entries.
pub(crate) const SECRET_PREFIX: &str = "secret/";

/// Free-form JSON object held by a secret.
pub type SecretData = serde_json::Map<String, serde_json::Value>;

/// A secret as persisted (after decryption).
///
/// Writes replace the whole record, so `created_at` and `updated_at` are
/// always equal on a freshly written secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    /// Caller-supplied key/value payload.
    pub data: SecretData,
    /// Optional caller-supplied annotations.
    #[serde(default)]
    pub metadata: SecretData,
    /// When this version was written.
    pub created_at: DateTime<Utc>,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
}

impl Secret {
    pub(crate) fn new(data: SecretData, metadata: SecretData) -> Self {
        let now = Utc::now();
        Self {
            data,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reject paths that cannot name a secret.
pub(crate) fn validate_path(path: &str) -> Result<(), VaultError> {
    if path.is_empty() {
        return Err(VaultError::malformed("secret path must not be empty"));
    }
    validate_prefix(path)
}

/// Same rules as [`validate_path`], but an empty prefix is allowed.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), VaultError> {
    if prefix.contains('\0') {
        return Err(VaultError::malformed("path must not contain NUL bytes"));
    }
    if prefix.split('/').any(|segment| segment == "..") {
        return Err(VaultError::malformed("path must not contain '..' segments"));
    }
    Ok(())
}

/// Storage key for a secret path.
pub(crate) fn storage_key(path: &str) -> String {
    format!("{SECRET_PREFIX}{path}")
}
