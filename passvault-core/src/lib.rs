#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Credential-gated field encryption for a personal card vault.
//!
//! Sensitive card fields are sealed with a non-extractable AES-256-GCM key held
//! by a [`HardwareKeystore`]. Plaintext is only released after a user-presence
//! challenge, presented once per batch of fields by the [`BatchSession`].

pub mod auth;
pub use auth::{
    AuthError, AuthOutcome, AuthPrompter, AuthSession, AuthenticationGate, ChallengeRequest,
    ChallengeResponder, GateState, PromptAvailability, ScriptedPrompter,
};

pub mod batch;
pub use batch::{BatchError, BatchSession, DecryptedField, FieldFailure, FieldMap};

pub mod cipher;
pub use cipher::{
    CipherError, EncryptedField, EncryptionScheme, FieldCipher, KeyManager, StoredValue,
    DEFAULT_KEY_ALIAS,
};

mod config;
pub use config::VaultConfig;

mod error;
pub use error::PassVaultError;

/// Host-pluggable logging for engine messages.
pub mod logger;

pub mod platform;
pub use platform::{FileKeystore, HardwareKeystore, KeystoreError, MemoryKeystore};

pub mod record;
pub use record::{
    CardMetadata, CardNetwork, CardSecrets, CredentialRepository, JsonFileRepository,
    MemoryRepository, PaymentCardRecord, RecordError, RepositoryError, SensitiveField,
};

mod vault;
pub use vault::{CardVault, RevealedCard, VaultError, VaultResult};

// private modules
mod utils;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("passvault_core");
