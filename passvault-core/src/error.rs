use thiserror::Error;

use crate::auth::AuthError;
use crate::batch::BatchError;
use crate::cipher::CipherError;
use crate::vault::VaultError;

/// User-facing error outputs from `PassVault`.
///
/// Flattens the layered engine errors into the cases a host UI reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum PassVaultError {
    /// No biometric or device credential is enrolled
    #[error("device_security_required")]
    DeviceSecurityRequired,
    /// The user dismissed the challenge
    #[error("authentication_canceled")]
    AuthenticationCanceled,
    /// The challenge was presented and not passed
    #[error("authentication_failed")]
    AuthenticationFailed,
    /// The field key does not exist in the keystore
    #[error("key_unavailable")]
    KeyUnavailable,
    /// A sensitive value could not be encrypted
    #[error("encryption_failed: {0}")]
    EncryptionFailed(String),
    /// The requested card does not exist
    #[error("not_found: {0}")]
    NotFound(String),
    /// The card data is invalid
    #[error("invalid_record: {0}")]
    InvalidRecord(String),
    /// The record store failed
    #[error("storage_error: {0}")]
    Storage(String),
}

impl PassVaultError {
    /// Whether the user may simply try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationCanceled | Self::AuthenticationFailed | Self::Storage(_)
        )
    }
}

impl From<AuthError> for PassVaultError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NoEnrolledCredential => Self::DeviceSecurityRequired,
            AuthError::Canceled => Self::AuthenticationCanceled,
            AuthError::Failed => Self::AuthenticationFailed,
        }
    }
}

impl From<BatchError> for PassVaultError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Auth(err) => err.into(),
            BatchError::Cipher {
                source: CipherError::KeyUnavailable,
                ..
            } => Self::KeyUnavailable,
            BatchError::Cipher { field, source } => {
                Self::EncryptionFailed(format!("{field}: {source}"))
            }
            BatchError::DuplicateField(field) => {
                Self::InvalidRecord(format!("duplicate field {field}"))
            }
            BatchError::Worker(reason) => Self::EncryptionFailed(reason),
        }
    }
}

impl From<VaultError> for PassVaultError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Batch(err) => err.into(),
            VaultError::Repository(err) => Self::Storage(err.to_string()),
            VaultError::InvalidRecord(err) => Self::InvalidRecord(err.to_string()),
            VaultError::NotFound(id) => Self::NotFound(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(AuthError::NoEnrolledCredential, PassVaultError::DeviceSecurityRequired)]
    #[test_case(AuthError::Canceled, PassVaultError::AuthenticationCanceled)]
    #[test_case(AuthError::Failed, PassVaultError::AuthenticationFailed)]
    fn test_auth_mapping(err: AuthError, expected: PassVaultError) {
        let mapped = PassVaultError::from(VaultError::Batch(BatchError::Auth(err)));
        assert_eq!(mapped, expected);
        assert_eq!(mapped.is_retryable(), err.is_retryable());
    }

    #[test]
    fn test_key_unavailable_mapping() {
        let err = BatchError::Cipher {
            field: "cvv".to_string(),
            source: CipherError::KeyUnavailable,
        };
        assert_eq!(PassVaultError::from(err), PassVaultError::KeyUnavailable);
    }

    #[test]
    fn test_not_found_mapping() {
        let err = PassVaultError::from(VaultError::NotFound("abc".to_string()));
        assert_eq!(err.to_string(), "not_found: abc");
        assert!(!err.is_retryable());
    }
}
