//! File-backed keystore for desktop development and the CLI.
//!
//! The key is persisted in a versioned CBOR envelope next to the vault data.
//! It offers no protection beyond file permissions and must not be used on a
//! device that has a real hardware keystore.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use super::aead::{self, KEY_LEN};
use super::keystore::{HardwareKeystore, KeystoreError, KeystoreResult, IV_LEN};

const ENVELOPE_VERSION: u32 = 1;
const KEY_FILE_EXTENSION: &str = "key";

#[derive(Serialize, Deserialize)]
struct KeyEnvelope {
    version: u32,
    alias: String,
    key: Vec<u8>,
    created_at: u64,
}

impl KeyEnvelope {
    fn serialize(&self) -> KeystoreResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| KeystoreError::Backend(format!("envelope encode: {err}")))?;
        Ok(bytes)
    }

    fn deserialize(bytes: &[u8]) -> KeystoreResult<Self> {
        let envelope: Self = ciborium::de::from_reader(bytes)
            .map_err(|err| KeystoreError::Backend(format!("envelope decode: {err}")))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(KeystoreError::Backend(format!(
                "unsupported key envelope version: {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

impl Drop for KeyEnvelope {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.key);
    }
}

/// Development keystore that keeps one key file per alias under a directory.
pub struct FileKeystore {
    dir: PathBuf,
    generate_lock: Mutex<()>,
}

impl FileKeystore {
    /// Creates a keystore rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            generate_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the key file for `alias`.
    ///
    /// The file stem is the URL-safe base64 of the alias, so distinct aliases
    /// never share a file.
    #[must_use]
    pub fn key_path(&self, alias: &str) -> PathBuf {
        let file_stem = URL_SAFE_NO_PAD.encode(alias);
        self.dir.join(format!("{file_stem}.{KEY_FILE_EXTENSION}"))
    }

    fn load(&self, alias: &str) -> KeystoreResult<Zeroizing<[u8; KEY_LEN]>> {
        let path = self.key_path(alias);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeystoreError::KeyNotFound {
                    alias: alias.to_string(),
                })
            }
            Err(err) => {
                return Err(KeystoreError::Backend(format!(
                    "read {}: {err}",
                    path.display()
                )))
            }
        };
        let envelope = KeyEnvelope::deserialize(&bytes)?;
        if envelope.alias != alias {
            return Err(KeystoreError::Backend(format!(
                "key file {} belongs to a different alias",
                path.display()
            )));
        }
        if envelope.key.len() != KEY_LEN {
            return Err(KeystoreError::Backend(format!(
                "key length mismatch: expected {KEY_LEN}, got {}",
                envelope.key.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&envelope.key);
        Ok(key)
    }

    /// Publishes `bytes` at `path` unless a key file is already there.
    ///
    /// Each writer stages into its own temporary file and links it in without
    /// replacing an existing file, so concurrent writers (other instances or
    /// other processes) agree on the first key published.
    fn publish_new(&self, path: &Path, bytes: &[u8]) -> KeystoreResult<()> {
        let backend =
            |err: std::io::Error| KeystoreError::Backend(format!("write key file: {err}"));
        fs::create_dir_all(&self.dir).map_err(backend)?;
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(backend)?;
        restrict_permissions(staged.as_file()).map_err(backend)?;
        staged.write_all(bytes).map_err(backend)?;
        staged.as_file().sync_all().map_err(backend)?;

        match staged.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!("key file {} was published concurrently", path.display());
                Ok(())
            }
            Err(err) => Err(backend(err.error)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

impl HardwareKeystore for FileKeystore {
    fn contains_key(&self, alias: &str) -> KeystoreResult<bool> {
        Ok(self.key_path(alias).is_file())
    }

    fn generate_key(&self, alias: &str) -> KeystoreResult<()> {
        let _guard = self
            .generate_lock
            .lock()
            .map_err(|_| KeystoreError::Backend("keystore lock poisoned".to_string()))?;
        let path = self.key_path(alias);
        if path.is_file() {
            return Ok(());
        }
        let key = aead::random_key();
        let envelope = KeyEnvelope {
            version: ENVELOPE_VERSION,
            alias: alias.to_string(),
            key: key.to_vec(),
            created_at: now_secs(),
        };
        let bytes = Zeroizing::new(envelope.serialize()?);
        self.publish_new(&path, &bytes)
    }

    fn seal(&self, alias: &str, iv: &[u8; IV_LEN], plaintext: &[u8]) -> KeystoreResult<Vec<u8>> {
        let key = self.load(alias)?;
        aead::seal(&key, iv, plaintext)
    }

    fn open(&self, alias: &str, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> KeystoreResult<Vec<u8>> {
        let key = self.load(alias)?;
        aead::open(&key, iv, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIAS: &str = "passvault:field-key";

    #[test]
    fn test_key_survives_new_instance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = FileKeystore::new(dir.path());
        first.generate_key(ALIAS).expect("generate");
        let sealed = first.seal(ALIAS, &[3u8; IV_LEN], b"4111111111111111").expect("seal");

        let second = FileKeystore::new(dir.path());
        assert!(second.contains_key(ALIAS).expect("contains"));
        let opened = second.open(ALIAS, &[3u8; IV_LEN], &sealed).expect("open");
        assert_eq!(opened, b"4111111111111111");
    }

    #[test]
    fn test_generate_does_not_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keystore = FileKeystore::new(dir.path());
        keystore.generate_key(ALIAS).expect("generate");
        let before = fs::read(keystore.key_path(ALIAS)).expect("read");
        keystore.generate_key(ALIAS).expect("generate again");
        let after = fs::read(keystore.key_path(ALIAS)).expect("read");
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_key_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keystore = FileKeystore::new(dir.path().join("nested"));
        assert!(!keystore.contains_key(ALIAS).expect("contains"));
        assert!(matches!(
            keystore.open(ALIAS, &[0u8; IV_LEN], &[0u8; 32]),
            Err(KeystoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_corrupted_envelope_is_backend_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keystore = FileKeystore::new(dir.path());
        keystore.generate_key(ALIAS).expect("generate");
        fs::write(keystore.key_path(ALIAS), b"not cbor").expect("write");
        assert!(matches!(
            keystore.seal(ALIAS, &[0u8; IV_LEN], b"x"),
            Err(KeystoreError::Backend(_))
        ));
    }

    #[test]
    fn test_similar_aliases_use_distinct_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keystore = FileKeystore::new(dir.path());
        assert_ne!(keystore.key_path("a:b"), keystore.key_path("a_b"));

        keystore.generate_key("a:b").expect("generate");
        assert!(!keystore.contains_key("a_b").expect("contains"));
        assert!(matches!(
            keystore.seal("a_b", &[0u8; IV_LEN], b"x"),
            Err(KeystoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_racing_instances_agree_on_one_key() {
        use std::sync::{Arc, Barrier};

        for _ in 0..50 {
            let dir = tempfile::tempdir().expect("tempdir");
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let keystore = FileKeystore::new(dir.path());
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        keystore.generate_key(ALIAS)?;
                        keystore.seal(ALIAS, &[5u8; IV_LEN], b"4111")
                    })
                })
                .collect();

            let sealed: Vec<Vec<u8>> = handles
                .into_iter()
                .map(|handle| handle.join().expect("thread").expect("generate and seal"))
                .collect();

            let reader = FileKeystore::new(dir.path());
            for ciphertext in &sealed {
                assert_eq!(
                    reader.open(ALIAS, &[5u8; IV_LEN], ciphertext).expect("open"),
                    b"4111"
                );
            }
            let leftovers = fs::read_dir(dir.path()).expect("read_dir").count();
            assert_eq!(leftovers, 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let keystore = FileKeystore::new(dir.path());
        keystore.generate_key(ALIAS).expect("generate");
        let mode = fs::metadata(keystore.key_path(ALIAS))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
