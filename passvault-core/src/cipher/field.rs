//! Single-field authenticated encryption and its text encoding.
//!
//! A field is stored as three colon-separated parts:
//!
//! ```text
//! base64(iv) ":" base64(ciphertext || tag) ":" epoch_millis
//! ```
//!
//! The format fits a text column and is self-describing enough to detect
//! corruption before any keystore call is made.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::SecretString;

use super::error::{CipherError, CipherResult};
use super::key_manager::KeyManager;
use crate::platform::IV_LEN;
use crate::utils::now_millis;

const SEPARATOR: char = ':';

/// One encrypted value: nonce, tagged ciphertext and the time it was sealed.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedField {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
    timestamp: u64,
}

impl EncryptedField {
    /// Assembles a field from its raw parts.
    #[must_use]
    pub const fn new(iv: [u8; IV_LEN], ciphertext: Vec<u8>, timestamp: u64) -> Self {
        Self {
            iv,
            ciphertext,
            timestamp,
        }
    }

    /// The nonce used for this field.
    #[must_use]
    pub const fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Ciphertext with the GCM tag appended.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Milliseconds since the Unix epoch at encryption time. Informational only.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Encodes the field as `iv:ciphertext:timestamp`.
    #[must_use]
    pub fn serialize(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            STANDARD.encode(self.iv),
            STANDARD.encode(&self.ciphertext),
            self.timestamp
        )
    }

    /// Parses the `iv:ciphertext:timestamp` encoding.
    ///
    /// Returns `None` for anything malformed: a wrong part count, invalid
    /// base64, a nonce of the wrong length, an empty ciphertext, or a
    /// non-numeric timestamp.
    #[must_use]
    pub fn deserialize(encoded: &str) -> Option<Self> {
        let mut parts = encoded.split(SEPARATOR);
        let (Some(iv), Some(ciphertext), Some(timestamp), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        let iv: [u8; IV_LEN] = STANDARD.decode(iv).ok()?.try_into().ok()?;
        let ciphertext = STANDARD.decode(ciphertext).ok()?;
        if ciphertext.is_empty() {
            return None;
        }
        let timestamp = timestamp.parse::<u64>().ok()?;

        Some(Self {
            iv,
            ciphertext,
            timestamp,
        })
    }
}

impl fmt::Debug for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedField")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Stateless field encryption on top of the [`KeyManager`].
///
/// Calling this directly performs no user-presence check. Flows that release
/// plaintext to a user go through [`BatchSession`](crate::BatchSession).
#[derive(Debug, Clone)]
pub struct FieldCipher {
    keys: Arc<KeyManager>,
}

impl FieldCipher {
    /// Creates a cipher sharing the given key manager.
    #[must_use]
    pub const fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// The underlying key manager.
    #[must_use]
    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Encrypts `value` and stamps the current time.
    ///
    /// # Errors
    ///
    /// Propagates key manager failures.
    pub fn encrypt_field(&self, value: &str) -> CipherResult<EncryptedField> {
        let sealed = self.keys.encrypt(value.as_bytes())?;
        Ok(EncryptedField::new(sealed.iv, sealed.ciphertext, now_millis()))
    }

    /// Decrypts `field`. The timestamp is not checked.
    ///
    /// # Errors
    ///
    /// - [`CipherError::AuthTagInvalid`] on tampering or a foreign key
    /// - [`CipherError::KeyUnavailable`] if no key exists
    /// - [`CipherError::DecryptionFailed`] if the plaintext is not UTF-8
    pub fn decrypt_field(&self, field: &EncryptedField) -> CipherResult<SecretString> {
        let plaintext = self.keys.decrypt(field.iv(), field.ciphertext())?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| CipherError::DecryptionFailed("plaintext is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(text.to_owned()))
    }
}
