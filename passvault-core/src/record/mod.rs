//! Secure credential records and their persistence.
//!
//! A [`PaymentCardRecord`] keeps display metadata in plaintext and the
//! sensitive fields as scheme-tagged ciphertext strings.

mod card;
mod error;
mod repository;

pub use card::{CardMetadata, CardNetwork, CardSecrets, PaymentCardRecord, SensitiveField};
pub use error::{RecordError, RepositoryError, RepositoryResult};
pub use repository::{CredentialRepository, JsonFileRepository, MemoryRepository};
