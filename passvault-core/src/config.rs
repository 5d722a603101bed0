//! Vault configuration.

use serde::{Deserialize, Serialize};

use crate::cipher::{EncryptionScheme, DEFAULT_KEY_ALIAS};

/// Tunables of a [`crate::CardVault`].
///
/// Every field has a default, so a partial JSON document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VaultConfig {
    /// Keystore alias of the field key.
    pub key_alias: String,
    /// Scheme used to tag newly written fields.
    pub scheme: EncryptionScheme,
    /// Challenge reason shown when saving a new card.
    pub add_reason: String,
    /// Challenge reason shown when revealing card details.
    pub reveal_reason: String,
    /// Challenge reason shown when replacing a card's sensitive fields.
    pub update_reason: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            scheme: EncryptionScheme::default(),
            add_reason: "Authenticate to save card details".to_string(),
            reveal_reason: "Authenticate to view card details".to_string(),
            update_reason: "Authenticate to update card details".to_string(),
        }
    }
}

impl VaultConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `json` is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(VaultConfig::from_json("{}").unwrap(), VaultConfig::default());
        assert_eq!(VaultConfig::default().key_alias, "passvault:field-key");
    }

    #[test]
    fn test_partial_override() {
        let config =
            VaultConfig::from_json(r#"{"keyAlias":"dev-key","revealReason":"Show it"}"#).unwrap();
        assert_eq!(config.key_alias, "dev-key");
        assert_eq!(config.reveal_reason, "Show it");
        assert_eq!(config.scheme, EncryptionScheme::Enhanced);
        assert_eq!(config.add_reason, VaultConfig::default().add_reason);
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        assert!(VaultConfig::from_json(r#"{"scheme":"legacy"}"#).is_err());
    }
}
