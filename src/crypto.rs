//! Key generation and at-rest encryption of relay credentials.
//!
//! Two concerns live here:
//!
//! - [`generate_api_key`] / [`hash_api_key`] / [`api_key_preview`]: opaque
//!   long-lived key material. Only the SHA-256 hash and a redacted preview
//!   are ever persisted; the plaintext key exists once, at creation time.
//! - [`SecretCipher`]: AES-256-GCM encryption of account SMTP credentials.
//!   The key is derived once from a configured passphrase with Argon2id and
//!   cached for the process lifetime; the cipher handle is constructed at
//!   startup and injected, never read from ambient globals.

use aes_gcm::{
    AesGcm, Nonce,
    aead::{Aead, KeyInit, consts::U16},
    aes::Aes256,
};
use argon2::Argon2;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::errors::Error;

/// Every full API key starts with this marker; the auth resolver uses it to
/// classify bearer values.
pub const API_KEY_PREFIX: &str = "ms_";

/// Number of random bytes behind an API key (192 bits, hex-encoded to 48 chars).
const API_KEY_RANDOM_BYTES: usize = 24;

/// AES-256-GCM with a 16-byte nonce, so the stored blob carries a 32-hex-char IV.
type CredentialCipher = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;

/// Domain-separation salt for deriving the credential key from the passphrase.
const KDF_SALT: &[u8] = b"mailship.credential-cipher.v1";

/// Generates a cryptographically secure API key.
///
/// The key is formatted as `ms_{48 lowercase hex chars}` where the hex part
/// encodes 24 bytes of secure random data.
pub fn generate_api_key() -> String {
    let mut key_bytes = [0u8; API_KEY_RANDOM_BYTES];
    rng().fill(&mut key_bytes);

    format!("{}{}", API_KEY_PREFIX, hex::encode(key_bytes))
}

/// One-way hash of a full API key for storage and lookup.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Redacted rendering of a full key: first 7 chars + `...` + last 4 chars.
///
/// Enough for an owner to recognize a key in a list, useless for
/// reconstructing it.
pub fn api_key_preview(key: &str) -> String {
    format!("{}...{}", &key[..7], &key[key.len() - 4..])
}

/// Generate a 4-digit OTP code. Leading zeros are allowed, so the space is
/// the full 0000..=9999. Codes are short-lived and attempt-limited, which is
/// what actually bounds guessing.
pub fn generate_otp_code() -> String {
    format!("{:04}", rng().random_range(0..10_000))
}

/// Decryption failed: the blob is malformed, was tampered with, or was
/// produced under a different passphrase. There is deliberately no detail
/// here - a wrong plaintext must never escape, only this error.
#[derive(Debug, Error)]
#[error("failed to decrypt stored secret")]
pub struct DecryptionError;

/// Symmetric cipher for secrets that must be recoverable (unlike passwords
/// and API keys, which are only ever hashed).
///
/// Blob format: `<32-hex-char iv>:<hex ciphertext>`, fresh random IV per call.
pub struct SecretCipher {
    cipher: CredentialCipher,
}

impl SecretCipher {
    /// Derive the AES key from `passphrase` (Argon2id, fixed application
    /// salt) and build the cipher. Called once at startup; the derived key
    /// never leaves this struct.
    pub fn new(passphrase: &str) -> Result<Self, Error> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KDF_SALT, &mut key)
            .map_err(|e| Error::Internal {
                operation: format!("derive credential encryption key: {e}"),
            })?;

        let cipher = CredentialCipher::new_from_slice(&key).map_err(|e| Error::Internal {
            operation: format!("create credential cipher: {e}"),
        })?;

        Ok(Self { cipher })
    }

    /// Encrypt a secret for storage. Each call draws a fresh 16-byte IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        let mut iv = [0u8; IV_LEN];
        rng().fill(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| Error::Internal {
                operation: format!("encrypt credential: {e}"),
            })?;

        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    /// Decrypt a blob produced by [`Self::encrypt`]. Any defect - missing
    /// delimiter, bad hex, short IV, failed authentication tag - yields
    /// [`DecryptionError`], never a garbled plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<String, DecryptionError> {
        let (iv_hex, ct_hex) = blob.split_once(':').ok_or(DecryptionError)?;

        let iv = hex::decode(iv_hex).map_err(|_| DecryptionError)?;
        if iv.len() != IV_LEN {
            return Err(DecryptionError);
        }
        let ciphertext = hex::decode(ct_hex).map_err(|_| DecryptionError)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| DecryptionError)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionError)
    }
}
