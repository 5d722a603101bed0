use thiserror::Error;

/// Result type for user-presence challenges.
pub type AuthResult<T> = Result<T, AuthError>;

/// Why a user-presence challenge did not authorize the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The device has no biometric or device lock configured. Send the user
    /// to system settings instead of retrying.
    #[error("no_enrolled_credential")]
    NoEnrolledCredential,

    /// The user dismissed the prompt. A normal outcome, not a failure.
    #[error("auth_canceled")]
    Canceled,

    /// The challenge ran and was rejected.
    #[error("auth_failed")]
    Failed,
}

impl AuthError {
    /// Whether the user can simply try again.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }

    /// Whether the user must configure device security first.
    #[must_use]
    pub const fn requires_device_security(self) -> bool {
        matches!(self, Self::NoEnrolledCredential)
    }
}
