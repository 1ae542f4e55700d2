//! Buy request creation and settlement.
//!
//! Approval is a single commit: the request is marked `approved` and the
//! completed `buy` debit is inserted together, after the balance was
//! re-derived at the same ledger version. Either both writes land or neither.

use super::identity::Reviewer;
use super::retry::RetryPolicy;
use crate::domain::buy_request::BuyRequest;
use crate::domain::ids::{AccountId, RecordId};
use crate::domain::ledger::{LedgerRecord, LedgerWrite, RecordFilter};
use crate::domain::money::Amount;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::status::BuyRequestStatus;
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use tracing::info;

pub struct BuySettlement {
    store: LedgerStoreRef,
    retry: RetryPolicy,
}

impl BuySettlement {
    pub fn new(store: LedgerStoreRef, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Creates a `pending` buy request. Nothing is reserved until approval.
    pub async fn request(
        &self,
        account: &AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<BuyRequest> {
        let amount = Amount::new(amount)?;
        let request = BuyRequest::new(RecordId::generate(), account.clone(), asset, amount)?;

        self.retry
            .run("request_buy", || async {
                let snapshot = self.store.snapshot(account).await?;
                self.store
                    .commit(
                        account,
                        snapshot.version,
                        vec![LedgerWrite::Insert(LedgerRecord::BuyRequest(request.clone()))],
                    )
                    .await
            })
            .await?;

        info!(%account, request = %request.id, asset = %request.asset, %amount, "Buy request created");
        Ok(request)
    }

    /// Settles a pending buy request and returns the recorded debit.
    ///
    /// Fails with `StaleRequest` if the request is gone or no longer pending,
    /// and with `InsufficientBalance` if the available balance does not cover
    /// it. Neither failure changes anything.
    pub async fn approve(&self, reviewer: &Reviewer, id: &RecordId) -> Result<Transaction> {
        let account = self
            .store
            .find_buy_request(id)
            .await?
            .map(|b| b.account)
            .ok_or_else(|| {
                LedgerError::StaleRequest(format!("Buy request {} no longer exists", id))
            })?;
        let transaction_id = RecordId::generate();

        let settlement = self
            .retry
            .run("approve_buy", || async {
                let snapshot = self.store.snapshot(&account).await?;
                let request = snapshot.buy_request(id).ok_or_else(|| {
                    LedgerError::StaleRequest(format!("Buy request {} no longer exists", id))
                })?;
                if !request.is_pending() {
                    return Err(LedgerError::StaleRequest(format!(
                        "Buy request {} is already {}",
                        id, request.status
                    )));
                }

                let available = snapshot.balance_sheet().available;
                if !available.covers(request.amount) {
                    return Err(LedgerError::InsufficientBalance {
                        requested: request.amount.value(),
                        available: available.value(),
                    });
                }

                let settlement = Transaction::buy_settlement(
                    transaction_id.clone(),
                    account.clone(),
                    request.amount,
                    request.asset.clone(),
                    id.clone(),
                );
                self.store
                    .commit(
                        &account,
                        snapshot.version,
                        vec![
                            LedgerWrite::Update(LedgerRecord::BuyRequest(
                                request.with_status(BuyRequestStatus::Approved),
                            )),
                            LedgerWrite::Insert(LedgerRecord::Transaction(settlement.clone())),
                        ],
                    )
                    .await?;
                Ok(settlement)
            })
            .await?;

        info!(%reviewer, %account, request = %id, transaction = %settlement.id, amount = %settlement.amount, "Buy request settled");
        Ok(settlement)
    }

    /// Rejects a pending buy request. No balance effect.
    ///
    /// Rejecting an already rejected request is a no-op; an approved request
    /// cannot be rejected.
    pub async fn reject(&self, reviewer: &Reviewer, id: &RecordId) -> Result<BuyRequest> {
        let account = self
            .store
            .find_buy_request(id)
            .await?
            .map(|b| b.account)
            .ok_or_else(|| LedgerError::NotFound(format!("Buy request {}", id)))?;

        let (request, changed) = self
            .retry
            .run("reject_buy", || async {
                let snapshot = self.store.snapshot(&account).await?;
                let current = snapshot
                    .buy_request(id)
                    .ok_or_else(|| LedgerError::NotFound(format!("Buy request {}", id)))?;
                match current.status {
                    BuyRequestStatus::Rejected => Ok((current.clone(), false)),
                    BuyRequestStatus::Approved => Err(LedgerError::StaleRequest(format!(
                        "Buy request {} is already approved",
                        id
                    ))),
                    BuyRequestStatus::Pending => {
                        let rejected = current.with_status(BuyRequestStatus::Rejected);
                        let writes =
                            vec![LedgerWrite::Update(LedgerRecord::BuyRequest(rejected.clone()))];
                        self.store.commit(&account, snapshot.version, writes).await?;
                        Ok((rejected, true))
                    }
                }
            })
            .await?;

        if changed {
            info!(%reviewer, %account, request = %id, "Buy request rejected");
        }
        Ok(request)
    }

    /// Reviewer listing, newest first.
    pub async fn requests(&self, filter: &RecordFilter) -> Result<Vec<BuyRequest>> {
        self.store.buy_requests(filter).await
    }
}
