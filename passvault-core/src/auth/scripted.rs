//! Prompter that answers from a script instead of a user.
//!
//! Used by tests and by non-interactive tooling (`--yes`). Never ship it as the
//! prompter of a user-facing build.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::prompter::{AuthOutcome, AuthPrompter, ChallengeRequest, PromptAvailability};

/// Answers each challenge immediately with the next scripted outcome.
pub struct ScriptedPrompter {
    availability: PromptAvailability,
    script: Mutex<VecDeque<AuthOutcome>>,
    fallback: AuthOutcome,
    reasons: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answers every challenge with `outcome`.
    #[must_use]
    pub fn always(outcome: AuthOutcome) -> Self {
        Self::sequence_then([], outcome)
    }

    /// Answers with `outcomes` in order, then cancels.
    #[must_use]
    pub fn sequence(outcomes: impl IntoIterator<Item = AuthOutcome>) -> Self {
        Self::sequence_then(outcomes, AuthOutcome::Canceled)
    }

    /// Answers with `outcomes` in order, then with `fallback`.
    #[must_use]
    pub fn sequence_then(
        outcomes: impl IntoIterator<Item = AuthOutcome>,
        fallback: AuthOutcome,
    ) -> Self {
        Self {
            availability: PromptAvailability::Available,
            script: Mutex::new(outcomes.into_iter().collect()),
            fallback,
            reasons: Mutex::new(Vec::new()),
        }
    }

    /// A device that reports `availability` and never presents.
    #[must_use]
    pub fn unavailable(availability: PromptAvailability) -> Self {
        Self {
            availability,
            ..Self::always(AuthOutcome::Canceled)
        }
    }

    /// Reasons of every presented challenge, in order.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuthPrompter for ScriptedPrompter {
    fn availability(&self) -> PromptAvailability {
        self.availability
    }

    fn present(&self, request: ChallengeRequest) {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.reason().to_string());
        let outcome = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback);
        request.resolve(outcome);
    }
}
