//! UI-side interface of the authentication gate.
//!
//! The host application implements [`AuthPrompter`] to show the platform's
//! biometric-or-device-credential prompt. The engine hands it a
//! [`ChallengeRequest`]; the host answers through the request's
//! [`ChallengeResponder`], from whichever thread owns the prompt.

use tokio::sync::oneshot;

/// Whether the device can present a user-presence challenge at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAvailability {
    /// A biometric or device credential is enrolled.
    Available,
    /// The hardware exists but nothing is enrolled.
    NoneEnrolled,
    /// The device cannot authenticate the user.
    Unsupported,
}

/// Final answer to one challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The user authenticated.
    Succeeded,
    /// The user attempted and was rejected.
    Failed,
    /// The user dismissed the prompt.
    Canceled,
}

/// One-shot handle used by the UI to resolve a challenge.
///
/// Every resolving method consumes the responder, so a challenge resolves at
/// most once. Dropping it unresolved counts as [`AuthOutcome::Canceled`].
#[derive(Debug)]
pub struct ChallengeResponder {
    tx: oneshot::Sender<AuthOutcome>,
}

impl ChallengeResponder {
    pub(crate) const fn new(tx: oneshot::Sender<AuthOutcome>) -> Self {
        Self { tx }
    }

    /// Resolves the challenge with `outcome`.
    pub fn resolve(self, outcome: AuthOutcome) {
        // The waiting side may already be gone; that batch was abandoned.
        let _ = self.tx.send(outcome);
    }

    /// Resolves the challenge as authenticated.
    pub fn succeed(self) {
        self.resolve(AuthOutcome::Succeeded);
    }

    /// Resolves the challenge as rejected.
    pub fn fail(self) {
        self.resolve(AuthOutcome::Failed);
    }

    /// Resolves the challenge as dismissed by the user.
    pub fn cancel(self) {
        self.resolve(AuthOutcome::Canceled);
    }

    /// Whether the caller stopped waiting for this challenge.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A pending challenge handed to the UI.
#[derive(Debug)]
pub struct ChallengeRequest {
    reason: String,
    responder: ChallengeResponder,
}

impl ChallengeRequest {
    pub(crate) fn new(reason: impl Into<String>, responder: ChallengeResponder) -> Self {
        Self {
            reason: reason.into(),
            responder,
        }
    }

    /// Text to show verbatim in the platform prompt.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Splits the request into its reason and responder, for hosts that move
    /// the responder to a UI thread.
    #[must_use]
    pub fn into_parts(self) -> (String, ChallengeResponder) {
        (self.reason, self.responder)
    }

    /// Resolves the challenge with `outcome`.
    pub fn resolve(self, outcome: AuthOutcome) {
        self.responder.resolve(outcome);
    }
}

/// Presents user-presence challenges on the host's interactive surface.
pub trait AuthPrompter: Send + Sync {
    /// Reports whether a challenge can be presented. Must not block.
    fn availability(&self) -> PromptAvailability;

    /// Shows the prompt for `request`.
    ///
    /// Must return promptly; the answer is delivered later through the
    /// request's responder. There is no engine-side timeout: an unanswered
    /// request leaves the caller pending until the responder is resolved or
    /// dropped.
    fn present(&self, request: ChallengeRequest);
}
