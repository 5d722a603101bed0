//! One user-presence challenge amortized over a group of field operations.
//!
//! A card form holds up to three sensitive values. Prompting once per value
//! would be unusable, so a [`BatchSession`] presents a single challenge and,
//! once it succeeds, runs every field through the [`FieldCipher`] in the order
//! the caller gave.
//!
//! Amortization policy: one successful challenge authorizes every field of
//! the batch call that requested it, and nothing beyond that call. Fields are
//! not re-authorized individually.
//!
//! Failure semantics differ by direction:
//! - encryption is all-or-nothing; the first failing field aborts the batch
//!   and nothing is returned for the others
//! - decryption never aborts after the challenge; each field gets either its
//!   plaintext or a [`FieldFailure`] marker

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use crate::auth::{AuthError, AuthSession, AuthenticationGate};
use crate::cipher::{scheme, CipherError, EncryptedField, FieldCipher};

/// Name/value pairs in caller order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> FieldMap<T> {
    /// Value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in processing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Entries in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: String, value: T) {
        self.entries.push((name, value));
    }
}

impl<T> Default for FieldMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> IntoIterator for FieldMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Marker left in place of a field that could not be decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldFailure {
    /// The record has no value for this field.
    #[error("field_absent")]
    Absent,

    /// The stored string is not a supported scheme-tagged field.
    #[error("malformed_field")]
    MalformedField,

    /// The field parsed but did not decrypt.
    #[error("decryption_failed: {0}")]
    DecryptionFailed(#[source] CipherError),
}

impl From<CipherError> for FieldFailure {
    fn from(error: CipherError) -> Self {
        match error {
            CipherError::MalformedField => Self::MalformedField,
            other => Self::DecryptionFailed(other),
        }
    }
}

/// Result slot of one field in a decrypt batch.
pub type DecryptedField = Result<SecretString, FieldFailure>;

/// Why a batch produced no result at all.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The challenge did not authorize the batch. No field was touched.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A field failed to encrypt; the whole batch is discarded.
    #[error("encrypting field {field} failed: {source}")]
    Cipher {
        /// Name of the failing field.
        field: String,
        /// The cipher failure.
        #[source]
        source: CipherError,
    },

    /// The same field name was requested twice.
    #[error("duplicate field in batch: {0}")]
    DuplicateField(String),

    /// The blocking worker running the cipher loop died.
    #[error("cipher worker failed: {0}")]
    Worker(String),
}

impl BatchError {
    /// Whether re-running the batch may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(err) => err.is_retryable(),
            Self::Cipher { source, .. } => source.is_retryable(),
            Self::DuplicateField(_) => false,
            Self::Worker(_) => true,
        }
    }

    /// Whether the user must set up device security first.
    #[must_use]
    pub fn requires_device_security(&self) -> bool {
        match self {
            Self::Auth(err) => err.requires_device_security(),
            Self::Cipher { source, .. } => source.requires_device_security(),
            Self::DuplicateField(_) | Self::Worker(_) => false,
        }
    }
}

/// Coordinates one challenge with a sequence of field cipher calls.
///
/// Cheap to clone; clones share the gate and key manager. Independent batches
/// may run concurrently, each one is strictly sequential internally.
#[derive(Debug, Clone)]
pub struct BatchSession {
    gate: Arc<AuthenticationGate>,
    cipher: FieldCipher,
}

impl BatchSession {
    /// Creates a session coordinator.
    #[must_use]
    pub const fn new(gate: Arc<AuthenticationGate>, cipher: FieldCipher) -> Self {
        Self { gate, cipher }
    }

    /// The gate presenting challenges for this coordinator.
    #[must_use]
    pub fn gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    /// Whether the hardware key exists. Never creates it.
    #[must_use]
    pub fn is_key_available(&self) -> bool {
        self.cipher.key_manager().is_key_available()
    }

    /// Challenges the user once, then encrypts every field in order.
    ///
    /// An empty batch returns an empty map without prompting.
    ///
    /// # Errors
    ///
    /// - [`BatchError::Auth`] if the challenge does not succeed; nothing is
    ///   encrypted
    /// - [`BatchError::Cipher`] for the first field that fails; no partial
    ///   result is returned
    /// - [`BatchError::DuplicateField`] if a name repeats; checked before
    ///   prompting
    pub async fn encrypt_batch(
        &self,
        reason: &str,
        fields: Vec<(String, SecretString)>,
    ) -> Result<FieldMap<EncryptedField>, BatchError> {
        if fields.is_empty() {
            return Ok(FieldMap::default());
        }
        ensure_unique(fields.iter().map(|(name, _)| name.as_str()))?;

        let session = self.gate.challenge(reason).await?;
        let cipher = self.cipher.clone();
        run_on_worker(move || seal_all(&cipher, &session, fields)).await?
    }

    /// Challenges the user once, then decrypts every stored field in order.
    ///
    /// `fields` carries the scheme-tagged storage strings; `None` stands for
    /// a slot the record does not hold. The result has exactly one entry per
    /// requested name.
    ///
    /// # Errors
    ///
    /// Only for batch-level failures: a rejected challenge, a duplicate name,
    /// or a dead worker. Per-field problems are reported inside the map.
    pub async fn decrypt_batch(
        &self,
        reason: &str,
        fields: Vec<(String, Option<String>)>,
    ) -> Result<FieldMap<DecryptedField>, BatchError> {
        if fields.is_empty() {
            return Ok(FieldMap::default());
        }
        ensure_unique(fields.iter().map(|(name, _)| name.as_str()))?;

        let session = self.gate.challenge(reason).await?;
        let cipher = self.cipher.clone();
        run_on_worker(move || open_all(&cipher, &session, fields)).await
    }
}

fn ensure_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), BatchError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(BatchError::DuplicateField(name.to_string()));
        }
    }
    Ok(())
}

async fn run_on_worker<F, R>(work: F) -> Result<R, BatchError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| BatchError::Worker(err.to_string()))
}

fn seal_all(
    cipher: &FieldCipher,
    _session: &AuthSession,
    fields: Vec<(String, SecretString)>,
) -> Result<FieldMap<EncryptedField>, BatchError> {
    use secrecy::ExposeSecret;

    let mut sealed = FieldMap::with_capacity(fields.len());
    for (name, value) in fields {
        match cipher.encrypt_field(value.expose_secret()) {
            Ok(field) => sealed.push(name, field),
            Err(source) => {
                log::warn!("encrypt batch aborted at field {name}: {source}");
                return Err(BatchError::Cipher { field: name, source });
            }
        }
    }
    log::debug!("encrypted {} fields", sealed.len());
    Ok(sealed)
}

fn open_all(
    cipher: &FieldCipher,
    _session: &AuthSession,
    fields: Vec<(String, Option<String>)>,
) -> FieldMap<DecryptedField> {
    let mut opened = FieldMap::with_capacity(fields.len());
    for (name, stored) in fields {
        let result = stored.map_or(Err(FieldFailure::Absent), |stored| {
            scheme::from_storage(&stored)
                .ok_or(FieldFailure::MalformedField)
                .and_then(|field| cipher.decrypt_field(&field).map_err(FieldFailure::from))
        });
        match &result {
            Ok(_) | Err(FieldFailure::Absent) => {}
            Err(failure) => log::warn!("field {name} could not be recovered: {failure}"),
        }
        opened.push(name, result);
    }
    opened
}
