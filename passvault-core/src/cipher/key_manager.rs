//! Typed owner of the hardware field key.

use std::fmt;
use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use super::error::{CipherError, CipherResult};
use crate::platform::{HardwareKeystore, IV_LEN};

/// Alias under which the field key lives unless configured otherwise.
pub const DEFAULT_KEY_ALIAS: &str = "passvault:field-key";

/// Output of a single seal: the fresh nonce and the tagged ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Random nonce generated for this call only.
    pub iv: [u8; IV_LEN],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

/// Single long-lived owner of the installation's field key.
///
/// Construct one at process start and share it by `Arc`. The key itself stays
/// behind the [`HardwareKeystore`]; this type only knows its alias.
pub struct KeyManager {
    keystore: Arc<dyn HardwareKeystore>,
    alias: String,
}

impl KeyManager {
    /// Creates a key manager for the key stored under `alias`.
    pub fn new(keystore: Arc<dyn HardwareKeystore>, alias: impl Into<String>) -> Self {
        Self {
            keystore,
            alias: alias.into(),
        }
    }

    /// Creates a key manager using [`DEFAULT_KEY_ALIAS`].
    pub fn with_default_alias(keystore: Arc<dyn HardwareKeystore>) -> Self {
        Self::new(keystore, DEFAULT_KEY_ALIAS)
    }

    /// The keystore alias of the field key.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Reports whether the field key exists. Never creates it.
    ///
    /// A keystore that cannot be queried counts as "unavailable".
    #[must_use]
    pub fn is_key_available(&self) -> bool {
        match self.keystore.contains_key(&self.alias) {
            Ok(available) => available,
            Err(err) => {
                log::warn!("keystore availability check failed: {err}");
                false
            }
        }
    }

    /// Encrypts `plaintext` under a fresh random nonce, provisioning the key
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] if the key cannot be created,
    /// or [`CipherError::Keystore`] if the keystore fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> CipherResult<Sealed> {
        self.ensure_key()?;
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = self.keystore.seal(&self.alias, &iv, plaintext)?;
        Ok(Sealed { iv, ciphertext })
    }

    /// Decrypts and authenticates `ciphertext`.
    ///
    /// # Errors
    ///
    /// - [`CipherError::KeyUnavailable`] if no key exists
    /// - [`CipherError::AuthTagInvalid`] if the data was tampered with or
    ///   sealed under another key
    pub fn decrypt(&self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> CipherResult<Zeroizing<Vec<u8>>> {
        self.keystore
            .open(&self.alias, iv, ciphertext)
            .map(Zeroizing::new)
            .map_err(CipherError::from)
    }

    fn ensure_key(&self) -> CipherResult<()> {
        if self.keystore.contains_key(&self.alias)? {
            return Ok(());
        }
        self.keystore.generate_key(&self.alias)?;
        log::info!("provisioned field key under alias {}", self.alias);
        Ok(())
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}
