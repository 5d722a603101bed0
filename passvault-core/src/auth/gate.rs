//! The authentication gate: one user-presence challenge per call.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use super::error::{AuthError, AuthResult};
use super::prompter::{
    AuthOutcome, AuthPrompter, ChallengeRequest, ChallengeResponder, PromptAvailability,
};

/// Lifecycle of the most recent challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// No challenge has been presented yet.
    #[default]
    Idle,
    /// A prompt is on screen.
    Presenting,
    /// The last challenge authenticated the user.
    Succeeded,
    /// The last challenge was rejected.
    Failed,
    /// The last challenge was dismissed or abandoned.
    Canceled,
}

/// Proof that a challenge succeeded.
///
/// Only [`AuthenticationGate::challenge`] can create one. Operations that
/// release or seal sensitive fields on the user's behalf take it by reference,
/// so they cannot be reached without passing the gate first.
pub struct AuthSession {
    reason: String,
}

impl AuthSession {
    /// The reason the user approved.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession").finish_non_exhaustive()
    }
}

/// Authorization oracle backed by the host's [`AuthPrompter`].
///
/// Does no cryptographic work. A successful challenge authorizes the caller
/// procedurally; the keystore key is not bound to the authentication.
pub struct AuthenticationGate {
    prompter: Arc<dyn AuthPrompter>,
    state: Mutex<GateState>,
    challenges: AtomicU64,
}

impl AuthenticationGate {
    /// Creates a gate presenting challenges through `prompter`.
    pub fn new(prompter: Arc<dyn AuthPrompter>) -> Self {
        Self {
            prompter,
            state: Mutex::new(GateState::Idle),
            challenges: AtomicU64::new(0),
        }
    }

    /// State of the most recent challenge.
    #[must_use]
    pub fn state(&self) -> GateState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of prompts presented over the gate's lifetime.
    #[must_use]
    pub fn challenge_count(&self) -> u64 {
        self.challenges.load(Ordering::SeqCst)
    }

    /// Whether the device can present a challenge right now.
    #[must_use]
    pub fn availability(&self) -> PromptAvailability {
        self.prompter.availability()
    }

    /// Presents one challenge showing `reason` and waits for the user.
    ///
    /// Dropping the returned future abandons the challenge and records it as
    /// canceled.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoEnrolledCredential`] if nothing is enrolled; no prompt
    ///   is shown
    /// - [`AuthError::Canceled`] if the user dismissed the prompt or the
    ///   responder was dropped
    /// - [`AuthError::Failed`] if the user was rejected
    pub async fn challenge(&self, reason: &str) -> AuthResult<AuthSession> {
        match self.prompter.availability() {
            PromptAvailability::Available => {}
            availability @ (PromptAvailability::NoneEnrolled | PromptAvailability::Unsupported) => {
                log::warn!("cannot present challenge: {availability:?}");
                return Err(AuthError::NoEnrolledCredential);
            }
        }

        let (tx, rx) = oneshot::channel();
        let mut pending = PendingChallenge::start(self);
        self.prompter
            .present(ChallengeRequest::new(reason, ChallengeResponder::new(tx)));

        // A dropped responder is the user walking away from the prompt.
        let outcome = rx.await.unwrap_or(AuthOutcome::Canceled);
        pending.finish(outcome);

        match outcome {
            AuthOutcome::Succeeded => {
                log::debug!("challenge succeeded");
                Ok(AuthSession {
                    reason: reason.to_string(),
                })
            }
            AuthOutcome::Failed => {
                log::info!("challenge rejected");
                Err(AuthError::Failed)
            }
            AuthOutcome::Canceled => {
                log::debug!("challenge canceled by user");
                Err(AuthError::Canceled)
            }
        }
    }

    fn set_state(&self, state: GateState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("state", &self.state())
            .field("challenges", &self.challenge_count())
            .finish_non_exhaustive()
    }
}

/// Moves the gate to `Presenting` and guarantees it leaves that state even if
/// the awaiting future is dropped.
struct PendingChallenge<'a> {
    gate: &'a AuthenticationGate,
    resolved: bool,
}

impl<'a> PendingChallenge<'a> {
    fn start(gate: &'a AuthenticationGate) -> Self {
        gate.challenges.fetch_add(1, Ordering::SeqCst);
        gate.set_state(GateState::Presenting);
        log::debug!("presenting user-presence challenge");
        Self {
            gate,
            resolved: false,
        }
    }

    fn finish(&mut self, outcome: AuthOutcome) {
        self.resolved = true;
        self.gate.set_state(match outcome {
            AuthOutcome::Succeeded => GateState::Succeeded,
            AuthOutcome::Failed => GateState::Failed,
            AuthOutcome::Canceled => GateState::Canceled,
        });
    }
}

impl Drop for PendingChallenge<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            log::debug!("challenge abandoned before the user answered");
            self.gate.set_state(GateState::Canceled);
        }
    }
}
