use super::ids::{AccountId, RecordId};
use super::money::Amount;
use super::status::BuyRequestStatus;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request to buy `asset` for `amount` USD of the account's balance.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BuyRequest {
    pub id: RecordId,
    pub account: AccountId,
    pub asset: String,
    pub amount: Amount,
    pub status: BuyRequestStatus,
    pub created_at: DateTime<Utc>,
}

impl BuyRequest {
    pub fn new(
        id: RecordId,
        account: AccountId,
        asset: &str,
        amount: Amount,
    ) -> Result<Self, LedgerError> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(LedgerError::ValidationError(
                "Buy request asset is required".to_string(),
            ));
        }
        Ok(Self {
            id,
            account,
            asset: asset.to_string(),
            amount,
            status: BuyRequestStatus::Pending,
            created_at: Utc::now(),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == BuyRequestStatus::Pending
    }

    pub fn with_status(&self, status: BuyRequestStatus) -> Self {
        let mut updated = self.clone();
        updated.status = status;
        updated
    }
}
