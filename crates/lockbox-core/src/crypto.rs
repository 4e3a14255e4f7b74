//! Cryptographic primitives for Lockbox.
//!
//! AES-256-GCM authenticated encryption behind the [`Cipher`] trait, a
//! zeroize-on-drop key newtype, and the random token generator plus the
//! digest used for the persisted root token.
//!
//! # Security model
//!
//! - Every encryption generates a fresh 96-bit nonce via `OsRng`.
//! - Ciphertext format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! - [`EncryptionKey`] derives `Zeroize` + `ZeroizeOnDrop`.
//! - Token digests are compared in constant time.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = 12 + 16;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Random bytes in a generated token id.
const TOKEN_BYTES: usize = 32;

/// A 256-bit encryption key that is zeroized on drop.
///
/// The inner bytes are never exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// The caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Constant-time equality against arbitrary bytes.
    #[must_use]
    pub fn ct_eq_bytes(&self, other: &[u8]) -> bool {
        self.0.as_slice().ct_eq(other).into()
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Authenticated symmetric encryption.
///
/// The vault engine only talks to this trait, so tests can swap in a
/// cipher that fails on demand.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    fn encrypt(&self, key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt bytes produced by [`encrypt`](Cipher::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] on a wrong key or corrupted input,
    /// or [`CryptoError::CiphertextTooShort`] if the input cannot hold a
    /// nonce and tag.
    fn decrypt(&self, key: &EncryptionKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// AES-256-GCM with a random nonce prepended to each ciphertext.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmCipher;

impl Cipher for Aes256GcmCipher {
    fn encrypt(&self, key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CryptoError::Encryption {
                reason: e.to_string(),
            })?;

        // nonce || ciphertext (tag appended by aes-gcm)
        let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    fn decrypt(&self, key: &EncryptionKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if combined.len() < MIN_CIPHERTEXT_LEN {
            return Err(CryptoError::CiphertextTooShort {
                expected: MIN_CIPHERTEXT_LEN,
                actual: combined.len(),
            });
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CryptoError::Decryption {
                reason: e.to_string(),
            })
    }
}

/// Generate a new token id: 32 bytes from the OS CSPRNG, hex-encoded.
#[must_use]
pub fn generate_token_id() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let id = hex::encode(bytes);
    bytes.zeroize();
    id
}

/// Hex-encoded SHA-256 of a token. This is what gets persisted, never the
/// token itself.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Check `candidate` against a stored digest in constant time.
#[must_use]
pub fn verify_token_digest(candidate: &str, stored_digest: &[u8]) -> bool {
    hash_token(candidate).as_bytes().ct_eq(stored_digest).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = EncryptionKey::generate();
        let plaintext = b"secret data for lockbox";
        let ciphertext = Aes256GcmCipher.encrypt(&key, plaintext).unwrap();
        let decrypted = Aes256GcmCipher.decrypt(&key, &ciphertext).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn encrypt_decrypt_empty_plaintext() {
        let key = EncryptionKey::generate();
        let ciphertext = Aes256GcmCipher.encrypt(&key, b"").unwrap();
        assert_eq!(ciphertext.len(), MIN_CIPHERTEXT_LEN);
        assert!(Aes256GcmCipher.decrypt(&key, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn decrypt_wrong_key_fails() {
        let ciphertext = Aes256GcmCipher
            .encrypt(&EncryptionKey::generate(), b"secret")
            .unwrap();
        let result = Aes256GcmCipher.decrypt(&EncryptionKey::generate(), &ciphertext);
        assert!(matches!(result, Err(CryptoError::Decryption { .. })));
    }

    #[test]
    fn decrypt_too_short_fails() {
        let key = EncryptionKey::generate();
        let result = Aes256GcmCipher.decrypt(&key, &[0u8; 10]);
        assert!(matches!(
            result,
            Err(CryptoError::CiphertextTooShort {
                expected: 28,
                actual: 10
            })
        ));
    }

    #[test]
    fn decrypt_tampered_ciphertext_fails() {
        let key = EncryptionKey::generate();
        let mut ciphertext = Aes256GcmCipher.encrypt(&key, b"secret").unwrap();
        if let Some(byte) = ciphertext.get_mut(NONCE_LEN) {
            *byte ^= 0xFF;
        }
        let result = Aes256GcmCipher.decrypt(&key, &ciphertext);
        assert!(matches!(result, Err(CryptoError::Decryption { .. })));
    }

    #[test]
    fn two_encryptions_use_different_nonces() {
        let key = EncryptionKey::generate();
        let ct1 = Aes256GcmCipher.encrypt(&key, b"same data").unwrap();
        let ct2 = Aes256GcmCipher.encrypt(&key, b"same data").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn encryption_key_debug_redacts_bytes() {
        let key = EncryptionKey::from_bytes([0xAB; KEY_LEN]);
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("171"));
    }

    #[test]
    fn key_constant_time_compare() {
        let key = EncryptionKey::from_bytes([7; KEY_LEN]);
        assert!(key.ct_eq_bytes(&[7; KEY_LEN]));
        assert!(!key.ct_eq_bytes(&[8; KEY_LEN]));
        assert!(!key.ct_eq_bytes(&[7; 16]));
    }

    // ── tokens ───────────────────────────────────────────────────────

    #[test]
    fn token_ids_are_random_hex() {
        let a = generate_token_id();
        let b = generate_token_id();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_token_digest_matches_only_the_issued_token() {
        let digest = hash_token("root-token");
        assert!(verify_token_digest("root-token", digest.as_bytes()));
        assert!(!verify_token_digest("root-tokem", digest.as_bytes()));
        assert!(!verify_token_digest("root-token", b""));
    }
}
