//! Hardware keystore trait for the field encryption key.
//!
//! The keystore is the secure boundary that holds the symmetric key used to
//! encrypt sensitive card fields. Key material never crosses this trait; the
//! engine only ever hands in plaintext or ciphertext and receives the result.

use thiserror::Error;

/// Length in bytes of the AES-GCM nonce used for every seal operation.
pub const IV_LEN: usize = 12;

/// Result type for keystore operations.
pub type KeystoreResult<T> = Result<T, KeystoreError>;

/// Errors reported by a [`HardwareKeystore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeystoreError {
    /// No key exists under the requested alias.
    #[error("no key provisioned under alias {alias}")]
    KeyNotFound {
        /// The alias that was looked up.
        alias: String,
    },

    /// The AEAD tag did not verify: tampered ciphertext or a different key.
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    /// Any other failure inside the keystore backend.
    #[error("keystore backend error: {0}")]
    Backend(String),
}

/// Symmetric AES-256-GCM keys confined to a secure boundary.
///
/// Platform implementations should use hardware-backed keystores where available:
/// - Android: Android Keystore (`KeyProperties.PURPOSE_ENCRYPT | PURPOSE_DECRYPT`,
///   `BLOCK_MODE_GCM`, no padding), StrongBox when present
/// - iOS: Secure Enclave wrapped key in the Keychain with
///   `kSecAttrAccessibleWhenUnlockedThisDeviceOnly`
/// - Desktop/CLI: [`FileKeystore`](super::FileKeystore) (development only)
///
/// # Security Requirements
///
/// - The key MUST be non-exportable when supported by the platform.
/// - There is exactly one key per alias; `generate_key` on an existing alias
///   leaves the key untouched.
/// - Implementations MUST use authenticated encryption and report a failed tag
///   as [`KeystoreError::AuthenticationFailed`].
///
/// The nonce is supplied by the caller so that IV freshness is enforced in
/// one place (the key manager) regardless of backend.
pub trait HardwareKeystore: Send + Sync {
    /// Returns whether a key exists under `alias`. Must not create one.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be queried.
    fn contains_key(&self, alias: &str) -> KeystoreResult<bool>;

    /// Generates a key under `alias` if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    fn generate_key(&self, alias: &str) -> KeystoreResult<()>;

    /// Encrypts `plaintext` under the key at `alias` with the given nonce.
    ///
    /// # Returns
    ///
    /// The ciphertext with the authentication tag appended.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::KeyNotFound`] if the alias is empty, or a
    /// backend error if encryption fails.
    fn seal(&self, alias: &str, iv: &[u8; IV_LEN], plaintext: &[u8]) -> KeystoreResult<Vec<u8>>;

    /// Decrypts `ciphertext` (with appended tag) under the key at `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No key exists under `alias`
    /// - Authentication fails (tampered data or a different key)
    /// - The backend is unavailable
    fn open(&self, alias: &str, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> KeystoreResult<Vec<u8>>;
}
