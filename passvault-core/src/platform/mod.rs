//! Platform abstraction for the hardware-backed field key.
//!
//! The engine never holds key material. Every cryptographic operation is
//! delegated to a [`HardwareKeystore`] provided by the host platform.
//!
//! # Platform Implementations
//!
//! ## Android (Kotlin)
//! - `AndroidKeyStore` AES/GCM/NoPadding key, StrongBox-backed when available
//!
//! ## iOS (Swift)
//! - Secure Enclave wrapped AES key stored in the Keychain
//!
//! ## Desktop / CLI
//! - [`FileKeystore`]: key file with owner-only permissions (development only)
//!
//! ## Tests
//! - [`MemoryKeystore`]: process-local keys

mod aead;
mod file;
mod keystore;
pub mod memory;

pub use file::FileKeystore;
pub use keystore::{HardwareKeystore, KeystoreError, KeystoreResult, IV_LEN};
pub use memory::MemoryKeystore;
