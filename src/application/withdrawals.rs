//! Withdrawal request lifecycle: submission against the derived balance,
//! reviewer status changes and reviewer-only access to payment details.

use super::identity::Reviewer;
use super::retry::RetryPolicy;
use crate::domain::ids::{AccountId, RecordId};
use crate::domain::ledger::{LedgerRecord, LedgerWrite, RecordFilter};
use crate::domain::money::Amount;
use crate::domain::payment::{Disclosure, PaymentDetails};
use crate::domain::ports::{LedgerStoreRef, PayloadCipherRef};
use crate::domain::status::WithdrawalStatus;
use crate::domain::withdrawal::{WithdrawalMethod, WithdrawalRequest};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// A withdrawal request as shown to a reviewer, with its details revealed
/// when they can be.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedWithdrawal {
    pub request: WithdrawalRequest,
    pub details: Disclosure,
}

pub struct WithdrawalDesk {
    store: LedgerStoreRef,
    cipher: PayloadCipherRef,
    retry: RetryPolicy,
}

impl WithdrawalDesk {
    pub fn new(store: LedgerStoreRef, cipher: PayloadCipherRef, retry: RetryPolicy) -> Self {
        Self {
            store,
            cipher,
            retry,
        }
    }

    /// Creates a `pending` withdrawal request that reserves `amount`.
    ///
    /// The balance is re-derived and checked inside the same commit that
    /// stores the request; a client-side balance is never trusted. An amount
    /// equal to the available balance is accepted.
    pub async fn submit(
        &self,
        account: &AccountId,
        amount: Decimal,
        method: WithdrawalMethod,
        details: &PaymentDetails,
    ) -> Result<WithdrawalRequest> {
        let amount = Amount::new(amount)?;
        let sealed = self.cipher.seal(details)?;
        let id = RecordId::generate();

        let request = self
            .retry
            .run("submit_withdrawal", || async {
                let snapshot = self.store.snapshot(account).await?;
                let available = snapshot.balance_sheet().available;
                if !available.covers(amount) {
                    return Err(LedgerError::InsufficientBalance {
                        requested: amount.value(),
                        available: available.value(),
                    });
                }
                let request = WithdrawalRequest::new(
                    id.clone(),
                    account.clone(),
                    amount,
                    method,
                    sealed.clone(),
                );
                self.store
                    .commit(
                        account,
                        snapshot.version,
                        vec![LedgerWrite::Insert(LedgerRecord::Withdrawal(request.clone()))],
                    )
                    .await?;
                Ok(request)
            })
            .await?;

        info!(%account, request = %request.id, %amount, %method, "Withdrawal request submitted");
        Ok(request)
    }

    /// Moves a request to `status`. Re-setting the current status is a no-op.
    ///
    /// Has no balance side effect of its own: the reservation follows the
    /// status through the derived balance.
    pub async fn set_status(
        &self,
        reviewer: &Reviewer,
        id: &RecordId,
        status: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let account = self.owner(id).await?;

        let (request, changed) = self
            .retry
            .run("set_withdrawal_status", || async {
                let snapshot = self.store.snapshot(&account).await?;
                let current = snapshot
                    .withdrawal(id)
                    .ok_or_else(|| LedgerError::NotFound(format!("Withdrawal request {}", id)))?;
                let Some(updated) = current.transition(status.clone())? else {
                    return Ok((current.clone(), false));
                };
                self.store
                    .commit(
                        &account,
                        snapshot.version,
                        vec![LedgerWrite::Update(LedgerRecord::Withdrawal(updated.clone()))],
                    )
                    .await?;
                Ok((updated, true))
            })
            .await?;

        if changed {
            info!(%reviewer, %account, request = %id, status = %request.status, "Withdrawal status changed");
        }
        Ok(request)
    }

    /// Reveals the payment details of one request.
    ///
    /// An unreadable token is reported as `Disclosure::Unavailable`, never as
    /// an error.
    pub async fn view_details(&self, reviewer: &Reviewer, id: &RecordId) -> Result<Disclosure> {
        let request = self
            .store
            .find_withdrawal(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Withdrawal request {}", id)))?;
        info!(%reviewer, request = %id, "Payment details viewed");
        Ok(self.disclose(&request))
    }

    /// Reviewer listing, newest first. Each row is decrypted on its own so one
    /// bad token does not hide the rest.
    pub async fn review_queue(
        &self,
        reviewer: &Reviewer,
        filter: &RecordFilter,
    ) -> Result<Vec<ReviewedWithdrawal>> {
        let requests = self.store.withdrawals(filter).await?;
        info!(%reviewer, count = requests.len(), "Withdrawal requests listed");
        Ok(requests
            .into_iter()
            .map(|request| {
                let details = self.disclose(&request);
                ReviewedWithdrawal { request, details }
            })
            .collect())
    }

    /// The account holder's own requests, without details.
    pub async fn requests_of(&self, account: &AccountId) -> Result<Vec<WithdrawalRequest>> {
        self.store
            .withdrawals(&RecordFilter::account(account.clone()))
            .await
    }

    fn disclose(&self, request: &WithdrawalRequest) -> Disclosure {
        let disclosure = Disclosure::from(self.cipher.open(request.encrypted_payload()));
        if let Disclosure::Unavailable(reason) = &disclosure {
            warn!(request = %request.id, %reason, "Payment details unavailable");
        }
        disclosure
    }

    async fn owner(&self, id: &RecordId) -> Result<AccountId> {
        self.store
            .find_withdrawal(id)
            .await?
            .map(|w| w.account)
            .ok_or_else(|| LedgerError::NotFound(format!("Withdrawal request {}", id)))
    }
}
