//! Key manager, field cipher and storage encoding.

mod error;
mod field;
mod key_manager;
pub mod scheme;

pub use error::{CipherError, CipherResult};
pub use field::{EncryptedField, FieldCipher};
pub use key_manager::{KeyManager, Sealed, DEFAULT_KEY_ALIAS};
pub use scheme::{EncryptionScheme, StoredValue};
