use super::ids::{AccountId, RecordId};
use super::money::Amount;
use super::payment::SealedPayload;
use super::status::WithdrawalStatus;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Bank,
    Card,
}

impl fmt::Display for WithdrawalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalMethod::Bank => f.write_str("bank"),
            WithdrawalMethod::Card => f.write_str("card"),
        }
    }
}

/// A request to pay funds out of the account.
///
/// The amount is reserved against the balance from creation until the request
/// is rejected. The sealed payment payload is write-once: there is no setter.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WithdrawalRequest {
    pub id: RecordId,
    pub account: AccountId,
    pub amount: Amount,
    pub method: WithdrawalMethod,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    encrypted_payload: SealedPayload,
}

impl WithdrawalRequest {
    pub fn new(
        id: RecordId,
        account: AccountId,
        amount: Amount,
        method: WithdrawalMethod,
        encrypted_payload: SealedPayload,
    ) -> Self {
        Self {
            id,
            account,
            amount,
            method,
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            encrypted_payload,
        }
    }

    pub fn encrypted_payload(&self) -> &SealedPayload {
        &self.encrypted_payload
    }

    /// Moves the request to `next`.
    ///
    /// Returns `Ok(None)` when the status is unchanged. A request never returns
    /// to `pending`, and `approved` / `rejected` are never left. A blank custom
    /// label is a `ValidationError`.
    pub fn transition(&self, next: WithdrawalStatus) -> Result<Option<Self>, LedgerError> {
        next.validate()?;
        if self.status == next {
            return Ok(None);
        }
        if next == WithdrawalStatus::Pending || self.status.is_final() {
            return Err(LedgerError::ValidationError(format!(
                "Withdrawal request {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        let mut updated = self.clone();
        updated.status = next;
        Ok(Some(updated))
    }
}
