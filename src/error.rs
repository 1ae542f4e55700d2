use rust_decimal::Decimal;
use thiserror::Error;

/// Why a sealed payment payload could not be turned back into plaintext.
///
/// Callers treat either variant as "details unavailable", never as a fatal error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Token is not made of three non-empty dot-separated parts")]
    MalformedToken,
    #[error("Token could not be decoded into payment details")]
    DecodeFailure,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Stale request: {0}")]
    StaleRequest(String),
    #[error("Concurrent modification of account {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Decrypt error: {0}")]
    Decrypt(#[from] DecryptError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Only contention is transient; business-rule rejections are final.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
