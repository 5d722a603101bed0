use thiserror::Error;

/// Result type for persistence operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Failures of the record store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An I/O operation failed.
    #[error("I/O error during {context}: {source}")]
    Io {
        /// What the store was doing.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store is unusable (e.g. a poisoned lock).
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Violations of the record invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record claims enhanced security but carries no encrypted field.
    #[error("record {id} is marked enhanced but holds no encrypted field")]
    EnhancedWithoutFields {
        /// The offending record.
        id: String,
    },

    /// Expiry month outside 1..=12.
    #[error("invalid expiry month: {0}")]
    InvalidExpiryMonth(u8),

    /// The holder name is blank.
    #[error("holder name must not be empty")]
    EmptyHolderName,

    /// A replacement secret set carries no value at all.
    #[error("replacement secrets must contain at least one field")]
    NoSecrets,
}
