//! Record persistence.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use super::card::PaymentCardRecord;
use super::error::{RepositoryError, RepositoryResult};

/// Storage backend for card records.
///
/// Implementations only move opaque records around; they never see plaintext
/// sensitive values.
pub trait CredentialRepository: Send + Sync {
    /// Loads one record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load_record(&self, id: &str) -> RepositoryResult<Option<PaymentCardRecord>>;

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save_record(&self, record: &PaymentCardRecord) -> RepositoryResult<()>;

    /// Deletes a record, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn delete_record(&self, id: &str) -> RepositoryResult<bool>;

    /// All records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn list_records(&self) -> RepositoryResult<Vec<PaymentCardRecord>>;
}

fn sorted(records: impl Iterator<Item = PaymentCardRecord>) -> Vec<PaymentCardRecord> {
    let mut records: Vec<_> = records.collect();
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    records
}

fn poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::Unavailable("lock poisoned".to_string())
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: RwLock<BTreeMap<String, PaymentCardRecord>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialRepository for MemoryRepository {
    fn load_record(&self, id: &str) -> RepositoryResult<Option<PaymentCardRecord>> {
        Ok(self.records.read().map_err(poisoned)?.get(id).cloned())
    }

    fn save_record(&self, record: &PaymentCardRecord) -> RepositoryResult<()> {
        self.records
            .write()
            .map_err(poisoned)?
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete_record(&self, id: &str) -> RepositoryResult<bool> {
        Ok(self.records.write().map_err(poisoned)?.remove(id).is_some())
    }

    fn list_records(&self) -> RepositoryResult<Vec<PaymentCardRecord>> {
        Ok(sorted(
            self.records.read().map_err(poisoned)?.values().cloned(),
        ))
    }
}

const FILE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct CardFile {
    version: u8,
    cards: Vec<PaymentCardRecord>,
}

/// Repository persisting all records in one JSON document.
///
/// Every write rewrites the document through a temporary file and a rename,
/// so readers never observe a half-written file.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Opens (or lazily creates) the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> RepositoryResult<BTreeMap<String, PaymentCardRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(RepositoryError::Io {
                    context: format!("reading {}", self.path.display()),
                    source,
                });
            }
        };
        let file: CardFile = serde_json::from_slice(&bytes)
            .map_err(|err| RepositoryError::Serialization(err.to_string()))?;
        if file.version != FILE_VERSION {
            return Err(RepositoryError::Serialization(format!(
                "unsupported card file version {}",
                file.version
            )));
        }
        Ok(file
            .cards
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect())
    }

    fn write_all(&self, records: BTreeMap<String, PaymentCardRecord>) -> RepositoryResult<()> {
        let file = CardFile {
            version: FILE_VERSION,
            cards: sorted(records.into_values()),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|err| RepositoryError::Serialization(err.to_string()))?;

        let io_err = |context: &str| {
            let context = format!("{context} {}", self.path.display());
            move |source: std::io::Error| RepositoryError::Io { context, source }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err("creating directory for"))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut handle = fs::File::create(&tmp).map_err(io_err("creating temp file for"))?;
        handle
            .write_all(&bytes)
            .and_then(|()| handle.sync_all())
            .map_err(io_err("writing"))?;
        fs::rename(&tmp, &self.path).map_err(io_err("replacing"))?;
        Ok(())
    }

    fn modify<R>(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, PaymentCardRecord>) -> R,
    ) -> RepositoryResult<R> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut records = self.read_all()?;
        let result = apply(&mut records);
        self.write_all(records)?;
        Ok(result)
    }
}

impl CredentialRepository for JsonFileRepository {
    fn load_record(&self, id: &str) -> RepositoryResult<Option<PaymentCardRecord>> {
        Ok(self.read_all()?.remove(id))
    }

    fn save_record(&self, record: &PaymentCardRecord) -> RepositoryResult<()> {
        self.modify(|records| {
            records.insert(record.id.clone(), record.clone());
        })
    }

    fn delete_record(&self, id: &str) -> RepositoryResult<bool> {
        self.modify(|records| records.remove(id).is_some())
    }

    fn list_records(&self) -> RepositoryResult<Vec<PaymentCardRecord>> {
        Ok(sorted(self.read_all()?.into_values()))
    }
}
