//! Scheme-tagged storage encoding for encrypted fields.
//!
//! Every encrypted value written to a record is prefixed with a tag naming the
//! scheme that produced it. New schemes get a new tag and can coexist with
//! records written under older ones without a schema migration.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use super::field::EncryptedField;

/// Encryption schemes understood by this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionScheme {
    /// Hardware-key AES-256-GCM, `iv:ciphertext:timestamp` body.
    #[default]
    Enhanced,
}

impl EncryptionScheme {
    /// The storage prefix for this scheme, separator included.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Enhanced => "ENHANCED:",
        }
    }

    /// Finds the scheme whose tag prefixes `stored`.
    #[must_use]
    pub fn detect(stored: &str) -> Option<Self> {
        Self::iter().find(|scheme| stored.starts_with(scheme.tag()))
    }

    /// Encodes `field` for storage under this scheme.
    #[must_use]
    pub fn to_storage(self, field: &EncryptedField) -> String {
        format!("{}{}", self.tag(), field.serialize())
    }

    /// Decodes a storage string written under this scheme.
    ///
    /// Returns `None` if the tag does not match or the body is malformed.
    #[must_use]
    pub fn decode(self, stored: &str) -> Option<EncryptedField> {
        match self {
            Self::Enhanced => stored
                .strip_prefix(self.tag())
                .and_then(EncryptedField::deserialize),
        }
    }
}

/// Encodes `field` with the default scheme tag.
#[must_use]
pub fn to_storage(field: &EncryptedField) -> String {
    EncryptionScheme::default().to_storage(field)
}

/// Decodes any supported scheme-tagged storage string.
///
/// Untagged (legacy or plaintext) and malformed values yield `None`.
#[must_use]
pub fn from_storage(stored: &str) -> Option<EncryptedField> {
    EncryptionScheme::detect(stored).and_then(|scheme| scheme.decode(stored))
}

/// What a stored field string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// A well-formed value under a supported scheme.
    Encrypted(EncryptionScheme, EncryptedField),
    /// No supported tag: a legacy or unencrypted representation.
    Legacy,
    /// A supported tag followed by an unparseable body.
    Malformed(EncryptionScheme),
}

impl StoredValue {
    /// Classifies a storage string without touching the keystore.
    #[must_use]
    pub fn classify(stored: &str) -> Self {
        match EncryptionScheme::detect(stored) {
            None => Self::Legacy,
            Some(scheme) => scheme
                .decode(stored)
                .map_or(Self::Malformed(scheme), |field| Self::Encrypted(scheme, field)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::IV_LEN;

    fn sample() -> EncryptedField {
        EncryptedField::new([5u8; IV_LEN], vec![1, 2, 3, 4], 1_700_000_000_123)
    }

    #[test]
    fn test_storage_string_carries_tag() {
        let stored = to_storage(&sample());
        assert!(stored.starts_with("ENHANCED:"));
        assert_eq!(stored.matches(':').count(), 3);
        assert_eq!(from_storage(&stored), Some(sample()));
    }

    #[test]
    fn test_untagged_value_is_legacy() {
        let untagged = sample().serialize();
        assert_eq!(from_storage(&untagged), None);
        assert_eq!(StoredValue::classify(&untagged), StoredValue::Legacy);
        assert_eq!(StoredValue::classify("4532123456789012"), StoredValue::Legacy);
    }

    #[test]
    fn test_tagged_garbage_is_malformed() {
        assert_eq!(from_storage("ENHANCED:not-a-field"), None);
        assert_eq!(
            StoredValue::classify("ENHANCED:not-a-field"),
            StoredValue::Malformed(EncryptionScheme::Enhanced)
        );
    }

    #[test]
    fn test_detect_is_case_sensitive() {
        assert_eq!(EncryptionScheme::detect("enhanced:AAAA"), None);
        assert_eq!(
            EncryptionScheme::detect("ENHANCED:AAAA"),
            Some(EncryptionScheme::Enhanced)
        );
    }
}
