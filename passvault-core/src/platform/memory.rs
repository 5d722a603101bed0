//! In-memory keystore for tests and demos.
//!
//! Keys live in process memory and vanish with it. This is NOT a secure
//! keystore; it exists so the engine can be exercised without platform
//! hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use zeroize::Zeroizing;

use super::aead::{self, KEY_LEN};
use super::keystore::{HardwareKeystore, KeystoreError, KeystoreResult, IV_LEN};

/// In-memory AES-256-GCM keystore.
///
/// Tracks how many seal/open calls it served so tests can assert that no
/// cipher work happened behind a rejected challenge.
#[derive(Default)]
pub struct MemoryKeystore {
    keys: RwLock<HashMap<String, Zeroizing<[u8; KEY_LEN]>>>,
    seal_count: AtomicU64,
    open_count: AtomicU64,
}

impl MemoryKeystore {
    /// Creates an empty keystore with no keys provisioned.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a keystore with a fixed key under `alias`.
    #[must_use]
    pub fn with_key(alias: &str, key: [u8; KEY_LEN]) -> Self {
        let store = Self::new();
        store
            .keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_string(), Zeroizing::new(key));
        store
    }

    /// Drops the key under `alias`, simulating a wiped device keystore.
    pub fn remove_key(&self, alias: &str) {
        self.keys.write().unwrap_or_else(PoisonError::into_inner).remove(alias);
    }

    /// Number of seal calls served.
    #[must_use]
    pub fn seal_count(&self) -> u64 {
        self.seal_count.load(Ordering::SeqCst)
    }

    /// Number of open calls served.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::SeqCst)
    }

    fn key(&self, alias: &str) -> KeystoreResult<Zeroizing<[u8; KEY_LEN]>> {
        self.keys
            .read()
            .map_err(|_| KeystoreError::Backend("keystore lock poisoned".to_string()))?
            .get(alias)
            .cloned()
            .ok_or_else(|| KeystoreError::KeyNotFound {
                alias: alias.to_string(),
            })
    }
}

impl HardwareKeystore for MemoryKeystore {
    fn contains_key(&self, alias: &str) -> KeystoreResult<bool> {
        Ok(self
            .keys
            .read()
            .map_err(|_| KeystoreError::Backend("keystore lock poisoned".to_string()))?
            .contains_key(alias))
    }

    fn generate_key(&self, alias: &str) -> KeystoreResult<()> {
        self.keys
            .write()
            .map_err(|_| KeystoreError::Backend("keystore lock poisoned".to_string()))?
            .entry(alias.to_string())
            .or_insert_with(aead::random_key);
        Ok(())
    }

    fn seal(&self, alias: &str, iv: &[u8; IV_LEN], plaintext: &[u8]) -> KeystoreResult<Vec<u8>> {
        self.seal_count.fetch_add(1, Ordering::SeqCst);
        let key = self.key(alias)?;
        aead::seal(&key, iv, plaintext)
    }

    fn open(&self, alias: &str, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> KeystoreResult<Vec<u8>> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        let key = self.key(alias)?;
        aead::open(&key, iv, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIAS: &str = "test:key";

    #[test]
    fn test_generate_key_is_idempotent() {
        let keystore = MemoryKeystore::new();
        assert!(!keystore.contains_key(ALIAS).unwrap());

        keystore.generate_key(ALIAS).unwrap();
        let sealed = keystore.seal(ALIAS, &[0u8; IV_LEN], b"secret").unwrap();

        keystore.generate_key(ALIAS).unwrap();
        let opened = keystore.open(ALIAS, &[0u8; IV_LEN], &sealed).unwrap();
        assert_eq!(opened, b"secret");
    }

    #[test]
    fn test_missing_key_reports_not_found() {
        let keystore = MemoryKeystore::new();
        match keystore.seal(ALIAS, &[0u8; IV_LEN], b"secret") {
            Err(KeystoreError::KeyNotFound { alias }) => assert_eq!(alias, ALIAS),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(keystore.seal_count(), 1);
    }

    #[test]
    fn test_removed_key_cannot_open() {
        let keystore = MemoryKeystore::with_key(ALIAS, [9u8; KEY_LEN]);
        let sealed = keystore.seal(ALIAS, &[1u8; IV_LEN], b"123").unwrap();
        keystore.remove_key(ALIAS);
        assert!(matches!(
            keystore.open(ALIAS, &[1u8; IV_LEN], &sealed),
            Err(KeystoreError::KeyNotFound { .. })
        ));
    }
}
