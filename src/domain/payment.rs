use crate::error::{DecryptError, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar value of a payment-detail field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str(""),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Bank or card secrets attached to a withdrawal request
/// (account number, routing number, card number, cvv, pin, ...).
///
/// Only ever persisted sealed. `Debug` prints field names, never values.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentDetails(BTreeMap<String, Scalar>);

impl PaymentDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Scalar>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a flat JSON object. Nested arrays or objects are refused.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(json).map_err(|_| {
            LedgerError::ValidationError(
                "Payment details must be a flat JSON object of scalar values".to_string(),
            )
        })
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// The opaque `iv.ciphertext.key` token stored in place of payment details.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedPayload(String);

impl SealedPayload {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedPayload(<{} bytes>)", self.0.len())
    }
}

/// Result of trying to reveal a withdrawal's payment details to a reviewer.
#[derive(Debug, Clone, PartialEq)]
pub enum Disclosure {
    Available(PaymentDetails),
    Unavailable(DecryptError),
}

impl Disclosure {
    pub fn details(&self) -> Option<&PaymentDetails> {
        match self {
            Disclosure::Available(details) => Some(details),
            Disclosure::Unavailable(_) => None,
        }
    }
}

impl From<Result<PaymentDetails, DecryptError>> for Disclosure {
    fn from(result: Result<PaymentDetails, DecryptError>) -> Self {
        match result {
            Ok(details) => Disclosure::Available(details),
            Err(e) => Disclosure::Unavailable(e),
        }
    }
}
