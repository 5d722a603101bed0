//! User-presence challenges gating access to sensitive fields.
//!
//! The host implements [`AuthPrompter`]; the engine drives it through the
//! [`AuthenticationGate`], which resolves each challenge exactly once.

mod error;
mod gate;
mod prompter;
pub mod scripted;

pub use error::{AuthError, AuthResult};
pub use gate::{AuthSession, AuthenticationGate, GateState};
pub use prompter::{
    AuthOutcome, AuthPrompter, ChallengeRequest, ChallengeResponder, PromptAvailability,
};
pub use scripted::ScriptedPrompter;
