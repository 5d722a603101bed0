//! Errors raised by the key manager and field cipher.

use thiserror::Error;

use crate::platform::KeystoreError;

/// Result type for cipher operations.
pub type CipherResult<T> = Result<T, CipherError>;

/// Failures of a single field encryption or decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// No hardware key is provisioned. The user has to set up device security.
    #[error("key_unavailable")]
    KeyUnavailable,

    /// The ciphertext was altered or sealed under a different key. The field
    /// cannot be recovered.
    #[error("auth_tag_invalid")]
    AuthTagInvalid,

    /// A stored field string does not parse.
    #[error("malformed_field")]
    MalformedField,

    /// Decryption produced no usable plaintext.
    #[error("decryption_failed: {0}")]
    DecryptionFailed(String),

    /// The keystore backend failed for a reason unrelated to the data.
    #[error("keystore_error: {0}")]
    Keystore(String),
}

impl CipherError {
    /// Whether re-running the operation could succeed without user action
    /// outside the app.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Keystore(_))
    }

    /// Whether the user must configure device security before retrying.
    #[must_use]
    pub const fn requires_device_security(&self) -> bool {
        matches!(self, Self::KeyUnavailable)
    }
}

impl From<KeystoreError> for CipherError {
    fn from(error: KeystoreError) -> Self {
        match error {
            KeystoreError::KeyNotFound { .. } => Self::KeyUnavailable,
            KeystoreError::AuthenticationFailed => Self::AuthTagInvalid,
            KeystoreError::Backend(message) => Self::Keystore(message),
        }
    }
}
