//! Persisted payment card: plaintext metadata plus scheme-tagged encrypted
//! sensitive fields.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::error::RecordError;
use crate::batch::FieldMap;
use crate::cipher::{EncryptedField, EncryptionScheme};

/// The sensitive fields a card record may carry encrypted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum SensitiveField {
    /// Full primary account number.
    CardNumber,
    /// Card verification value.
    Cvv,
    /// Linked bank account identifier (IBAN or account number).
    BankAccountId,
}

/// Payment network of a card.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CardNetwork {
    /// Visa.
    Visa,
    /// Mastercard.
    Mastercard,
    /// American Express.
    Amex,
    /// Discover.
    Discover,
    /// RuPay.
    Rupay,
    /// Any other network.
    #[default]
    Other,
}

impl CardNetwork {
    /// Guesses the network from the card number's issuer prefix.
    #[must_use]
    pub fn detect(card_number: &str) -> Self {
        let digits: String = card_number.chars().filter(char::is_ascii_digit).collect();
        let prefix = |len: usize| digits.get(..len).and_then(|p| p.parse::<u32>().ok());

        match (prefix(1), prefix(2), prefix(4)) {
            (Some(4), _, _) => Self::Visa,
            (_, Some(34 | 37), _) => Self::Amex,
            (_, Some(51..=55), _) | (_, _, Some(2221..=2720)) => Self::Mastercard,
            (_, _, Some(6011)) | (_, Some(65), _) => Self::Discover,
            (_, Some(60 | 81 | 82), _) => Self::Rupay,
            _ => Self::Other,
        }
    }
}

/// Plaintext card details entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardMetadata {
    /// Name on the card.
    pub holder_name: String,
    /// Issuing bank.
    pub bank_name: Option<String>,
    /// Payment network.
    pub network: CardNetwork,
    /// Expiry month, 1 to 12.
    pub expiry_month: u8,
    /// Four-digit expiry year.
    pub expiry_year: u16,
    /// User-chosen label.
    pub nickname: Option<String>,
    /// Display color as a hex string.
    pub color: Option<String>,
}

impl CardMetadata {
    /// Checks the user-entered details before anything is encrypted.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyHolderName`] or
    /// [`RecordError::InvalidExpiryMonth`].
    pub fn validate(&self) -> Result<(), RecordError> {
        check_details(&self.holder_name, self.expiry_month)
    }
}

fn check_details(holder_name: &str, expiry_month: u8) -> Result<(), RecordError> {
    if holder_name.trim().is_empty() {
        return Err(RecordError::EmptyHolderName);
    }
    if !(1..=12).contains(&expiry_month) {
        return Err(RecordError::InvalidExpiryMonth(expiry_month));
    }
    Ok(())
}

/// Sensitive values to encrypt. Absent values are simply not stored.
#[derive(Default)]
pub struct CardSecrets {
    /// Full card number.
    pub card_number: Option<SecretString>,
    /// CVV.
    pub cvv: Option<SecretString>,
    /// Bank account identifier.
    pub bank_account_id: Option<SecretString>,
}

impl CardSecrets {
    /// Last four digits of the card number, if one is present.
    #[must_use]
    pub fn last_four(&self) -> Option<String> {
        let number = self.card_number.as_ref()?;
        let digits: Vec<char> = number
            .expose_secret()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        (digits.len() >= 4).then(|| digits[digits.len() - 4..].iter().collect())
    }

    /// Whether no secret is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.card_number.is_none() && self.cvv.is_none() && self.bank_account_id.is_none()
    }

    /// The present secrets as an ordered batch input.
    #[must_use]
    pub fn into_batch(self) -> Vec<(String, SecretString)> {
        [
            (SensitiveField::CardNumber, self.card_number),
            (SensitiveField::Cvv, self.cvv),
            (SensitiveField::BankAccountId, self.bank_account_id),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| (field.as_ref().to_string(), value)))
        .collect()
    }
}

impl fmt::Debug for CardSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSecrets")
            .field("card_number", &self.card_number.is_some())
            .field("cvv", &self.cvv.is_some())
            .field("bank_account_id", &self.bank_account_id.is_some())
            .finish()
    }
}

/// Storage representation of a payment card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCardRecord {
    /// Record id (UUID v4).
    pub id: String,
    /// Name on the card.
    pub holder_name: String,
    /// Issuing bank.
    #[serde(default)]
    pub bank_name: Option<String>,
    /// Payment network.
    #[serde(default)]
    pub network: CardNetwork,
    /// Expiry month, 1 to 12.
    pub expiry_month: u8,
    /// Four-digit expiry year.
    pub expiry_year: u16,
    /// User-chosen label.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Display color.
    #[serde(default)]
    pub color: Option<String>,
    /// Last four digits of the card number, kept in plaintext for display.
    #[serde(default)]
    pub last_four: Option<String>,
    /// Creation time, epoch millis.
    pub created_at: u64,
    /// Last modification time, epoch millis.
    pub updated_at: u64,
    /// Whether the sensitive fields use the hardware-key scheme.
    #[serde(default)]
    pub has_enhanced_security: bool,
    /// Scheme-tagged encrypted card number.
    #[serde(default)]
    pub encrypted_card_number: Option<String>,
    /// Scheme-tagged encrypted CVV.
    #[serde(default, rename = "encryptedCVV")]
    pub encrypted_cvv: Option<String>,
    /// Scheme-tagged encrypted bank account id.
    #[serde(default)]
    pub encrypted_bank_account_id: Option<String>,
}

impl PaymentCardRecord {
    /// Builds a new record from metadata and a successful encrypt batch,
    /// tagging each field with `scheme`.
    #[must_use]
    pub fn new(
        metadata: CardMetadata,
        scheme: EncryptionScheme,
        encrypted: &FieldMap<EncryptedField>,
        last_four: Option<String>,
        now: u64,
    ) -> Self {
        let mut record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            holder_name: metadata.holder_name,
            bank_name: metadata.bank_name,
            network: metadata.network,
            expiry_month: metadata.expiry_month,
            expiry_year: metadata.expiry_year,
            nickname: metadata.nickname,
            color: metadata.color,
            last_four: None,
            created_at: now,
            updated_at: now,
            has_enhanced_security: false,
            encrypted_card_number: None,
            encrypted_cvv: None,
            encrypted_bank_account_id: None,
        };
        record.replace_encrypted(scheme, encrypted, last_four, now);
        record
    }

    /// Replaces the whole set of encrypted fields.
    ///
    /// Slots missing from `encrypted` are cleared; there is no per-field patch.
    pub fn replace_encrypted(
        &mut self,
        scheme: EncryptionScheme,
        encrypted: &FieldMap<EncryptedField>,
        last_four: Option<String>,
        now: u64,
    ) {
        let stored = |field: SensitiveField| {
            encrypted
                .get(field.as_ref())
                .map(|value| scheme.to_storage(value))
        };
        self.encrypted_card_number = stored(SensitiveField::CardNumber);
        self.encrypted_cvv = stored(SensitiveField::Cvv);
        self.encrypted_bank_account_id = stored(SensitiveField::BankAccountId);
        self.has_enhanced_security = self.has_recoverable_data();
        self.last_four = last_four;
        self.updated_at = now;
    }

    /// The stored string of one sensitive field.
    #[must_use]
    pub fn stored(&self, field: SensitiveField) -> Option<&str> {
        match field {
            SensitiveField::CardNumber => self.encrypted_card_number.as_deref(),
            SensitiveField::Cvv => self.encrypted_cvv.as_deref(),
            SensitiveField::BankAccountId => self.encrypted_bank_account_id.as_deref(),
        }
    }

    /// Whether at least one encrypted field is present.
    #[must_use]
    pub fn has_recoverable_data(&self) -> bool {
        SensitiveField::iter().any(|field| self.stored(field).is_some())
    }

    /// Decrypt-batch input covering all three slots, absent ones as `None`.
    #[must_use]
    pub fn decrypt_requests(&self) -> Vec<(String, Option<String>)> {
        SensitiveField::iter()
            .map(|field| (field.as_ref().to_string(), self.stored(field).map(str::to_string)))
            .collect()
    }

    /// Masked card number for list display, e.g. `•••• 1234`.
    #[must_use]
    pub fn masked_number(&self) -> String {
        self.last_four
            .as_deref()
            .map_or_else(|| "••••".to_string(), |last_four| format!("•••• {last_four}"))
    }

    /// Checks the record invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), RecordError> {
        check_details(&self.holder_name, self.expiry_month)?;
        if self.has_enhanced_security && !self.has_recoverable_data() {
            return Err(RecordError::EnhancedWithoutFields {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}
