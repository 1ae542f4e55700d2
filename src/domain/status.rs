//! Status labels for ledger records.
//!
//! Built-in labels are matched case-insensitively ("Complete" and "complete"
//! are the same status). Anything else is a reviewer-defined custom label and
//! is kept verbatim.

use crate::domain::ids::RecordId;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Complete,
    Custom(String),
}

impl TransactionStatus {
    /// Only complete transactions contribute to the settled balance.
    pub fn is_complete(&self) -> bool {
        *self == TransactionStatus::Complete
    }

    pub fn builtins() -> [TransactionStatus; 2] {
        [TransactionStatus::Pending, TransactionStatus::Complete]
    }

    /// A custom label must name something; a blank one is never stored.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            TransactionStatus::Custom(label) => require_label(label),
            _ => Ok(()),
        }
    }
}

fn require_label(label: &str) -> Result<(), LedgerError> {
    if label.trim().is_empty() {
        return Err(LedgerError::ValidationError(
            "Status label is required".to_string(),
        ));
    }
    Ok(())
}

impl From<String> for TransactionStatus {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => TransactionStatus::Pending,
            "complete" => TransactionStatus::Complete,
            _ => TransactionStatus::Custom(label.trim().to_string()),
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("pending"),
            TransactionStatus::Complete => f.write_str("complete"),
            TransactionStatus::Custom(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Custom(String),
}

impl WithdrawalStatus {
    /// Every status except `rejected` keeps the requested amount reserved.
    pub fn holds_reservation(&self) -> bool {
        *self != WithdrawalStatus::Rejected
    }

    /// `approved` and `rejected` can never be left once reached.
    pub fn is_final(&self) -> bool {
        matches!(self, WithdrawalStatus::Approved | WithdrawalStatus::Rejected)
    }

    pub fn builtins() -> [WithdrawalStatus; 3] {
        [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ]
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            WithdrawalStatus::Custom(label) => require_label(label),
            _ => Ok(()),
        }
    }
}

impl From<String> for WithdrawalStatus {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => WithdrawalStatus::Pending,
            "approved" => WithdrawalStatus::Approved,
            "rejected" => WithdrawalStatus::Rejected,
            _ => WithdrawalStatus::Custom(label.trim().to_string()),
        }
    }
}

impl From<&str> for WithdrawalStatus {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<WithdrawalStatus> for String {
    fn from(status: WithdrawalStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalStatus::Pending => f.write_str("pending"),
            WithdrawalStatus::Approved => f.write_str("approved"),
            WithdrawalStatus::Rejected => f.write_str("rejected"),
            WithdrawalStatus::Custom(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for BuyRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuyRequestStatus::Pending => f.write_str("pending"),
            BuyRequestStatus::Approved => f.write_str("approved"),
            BuyRequestStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// A reviewer-defined status label. Purely advisory vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusType {
    pub id: RecordId,
    pub name: String,
}

impl StatusType {
    pub fn new(id: RecordId, name: &str) -> Result<Self, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::ValidationError(
                "Status type name is required".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: name.to_string(),
        })
    }
}
