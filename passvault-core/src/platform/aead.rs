//! AES-256-GCM primitives shared by the software keystore backends.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use super::keystore::{KeystoreError, KeystoreResult, IV_LEN};

pub(crate) const KEY_LEN: usize = 32;

pub(crate) fn random_key() -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut key[..]);
    key
}

pub(crate) fn seal(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> KeystoreResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|err| KeystoreError::Backend(format!("aes-gcm seal failed: {err}")))
}

pub(crate) fn open(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> KeystoreResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    // aes-gcm reports every open failure (short input included) as an opaque
    // error; all of them mean the tag could not be verified.
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| KeystoreError::AuthenticationFailed)
}
