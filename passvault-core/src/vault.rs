//! Card vault: the creation, detail and update flows over one repository.

use std::sync::Arc;

use strum::IntoEnumIterator;
use thiserror::Error;

use crate::auth::{AuthPrompter, AuthenticationGate};
use crate::batch::{BatchError, BatchSession, DecryptedField, FieldFailure, FieldMap};
use crate::cipher::{FieldCipher, KeyManager};
use crate::config::VaultConfig;
use crate::platform::HardwareKeystore;
use crate::record::{
    CardMetadata, CardSecrets, CredentialRepository, PaymentCardRecord, RecordError,
    RepositoryError, SensitiveField,
};
use crate::utils::now_millis;

/// Result type of vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Failures of vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The batch (challenge or cipher) failed.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// The record store failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The record would violate its invariants.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
    /// No record with this id.
    #[error("card {0} not found")]
    NotFound(String),
}

impl VaultError {
    /// Whether repeating the action may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Batch(err) => err.is_retryable(),
            Self::Repository(_) | Self::InvalidRecord(_) | Self::NotFound(_) => false,
        }
    }

    /// Whether the user must first set up device security.
    #[must_use]
    pub fn requires_device_security(&self) -> bool {
        match self {
            Self::Batch(err) => err.requires_device_security(),
            _ => false,
        }
    }
}

/// A card's metadata together with its decrypted sensitive fields.
#[derive(Debug)]
pub struct RevealedCard {
    /// The stored record, unchanged.
    pub record: PaymentCardRecord,
    /// One entry per sensitive field, successes and failure markers alike.
    pub fields: FieldMap<DecryptedField>,
}

impl RevealedCard {
    /// Decryption result for `field`.
    #[must_use]
    pub fn field(&self, field: SensitiveField) -> Option<&DecryptedField> {
        self.fields.get(field.as_ref())
    }
}

/// Stores payment cards with their sensitive fields behind one challenge.
#[derive(Clone)]
pub struct CardVault {
    batch: BatchSession,
    repository: Arc<dyn CredentialRepository>,
    config: VaultConfig,
}

impl CardVault {
    /// Wires a vault from its platform collaborators.
    #[must_use]
    pub fn new(
        keystore: Arc<dyn HardwareKeystore>,
        prompter: Arc<dyn AuthPrompter>,
        repository: Arc<dyn CredentialRepository>,
        config: VaultConfig,
    ) -> Self {
        let keys = Arc::new(KeyManager::new(keystore, config.key_alias.clone()));
        let gate = Arc::new(AuthenticationGate::new(prompter));
        Self::from_parts(
            BatchSession::new(gate, FieldCipher::new(keys)),
            repository,
            config,
        )
    }

    /// Builds a vault around an existing batch coordinator.
    #[must_use]
    pub fn from_parts(
        batch: BatchSession,
        repository: Arc<dyn CredentialRepository>,
        config: VaultConfig,
    ) -> Self {
        Self {
            batch,
            repository,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The batch coordinator.
    #[must_use]
    pub const fn batch(&self) -> &BatchSession {
        &self.batch
    }

    /// Whether the field key exists. Never creates it.
    #[must_use]
    pub fn is_key_available(&self) -> bool {
        self.batch.is_key_available()
    }

    /// Encrypts `secrets` under one challenge and stores a new card.
    ///
    /// `metadata` is checked before the challenge. Nothing is stored unless
    /// every present secret was encrypted.
    ///
    /// # Errors
    ///
    /// See [`VaultError`].
    pub async fn add_card(
        &self,
        metadata: CardMetadata,
        secrets: CardSecrets,
    ) -> VaultResult<PaymentCardRecord> {
        metadata.validate()?;
        let last_four = secrets.last_four();
        let encrypted = self
            .batch
            .encrypt_batch(&self.config.add_reason, secrets.into_batch())
            .await?;

        let record = PaymentCardRecord::new(
            metadata,
            self.config.scheme,
            &encrypted,
            last_four,
            now_millis(),
        );
        record.validate()?;
        self.repository.save_record(&record)?;
        log::info!("stored card {} with {} encrypted fields", record.id, encrypted.len());
        Ok(record)
    }

    /// Loads a card and decrypts its sensitive fields under one challenge.
    ///
    /// A card without recoverable data is returned without prompting.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`], a repository failure, or a batch-level
    /// failure. Per-field failures are reported inside the result.
    pub async fn reveal_card(&self, id: &str) -> VaultResult<RevealedCard> {
        let record = self.load(id)?;
        let fields = if record.has_recoverable_data() {
            self.batch
                .decrypt_batch(&self.config.reveal_reason, record.decrypt_requests())
                .await?
        } else {
            log::debug!("card {id} holds no encrypted fields");
            let mut absent = FieldMap::with_capacity(3);
            for field in SensitiveField::iter() {
                absent.push(field.as_ref().to_string(), Err(FieldFailure::Absent));
            }
            absent
        };
        Ok(RevealedCard { record, fields })
    }

    /// Replaces the whole set of sensitive fields of a card.
    ///
    /// Fields missing from `secrets` are removed from the record. An empty
    /// set is rejected with [`RecordError::NoSecrets`] before any challenge.
    ///
    /// # Errors
    ///
    /// See [`VaultError`]. The stored record is unchanged on error.
    pub async fn update_secrets(
        &self,
        id: &str,
        secrets: CardSecrets,
    ) -> VaultResult<PaymentCardRecord> {
        let mut record = self.load(id)?;
        if secrets.is_empty() {
            return Err(RecordError::NoSecrets.into());
        }
        let last_four = secrets.last_four();
        let encrypted = self
            .batch
            .encrypt_batch(&self.config.update_reason, secrets.into_batch())
            .await?;

        record.replace_encrypted(self.config.scheme, &encrypted, last_four, now_millis());
        record.validate()?;
        self.repository.save_record(&record)?;
        log::info!("replaced encrypted fields of card {id}");
        Ok(record)
    }

    /// Deletes a card and its encrypted fields.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] or a repository failure.
    pub fn delete_card(&self, id: &str) -> VaultResult<()> {
        if self.repository.delete_record(id)? {
            log::info!("deleted card {id}");
            Ok(())
        } else {
            Err(VaultError::NotFound(id.to_string()))
        }
    }

    /// All stored cards, oldest first. Never prompts.
    ///
    /// # Errors
    ///
    /// Returns a repository failure.
    pub fn list_cards(&self) -> VaultResult<Vec<PaymentCardRecord>> {
        Ok(self.repository.list_records()?)
    }

    fn load(&self, id: &str) -> VaultResult<PaymentCardRecord> {
        self.repository
            .load_record(id)?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }
}

impl std::fmt::Debug for CardVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardVault")
            .field("batch", &self.batch)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
