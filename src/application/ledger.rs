//! Balance derivation, deposit entry and transaction status management.

use super::identity::Reviewer;
use super::retry::RetryPolicy;
use crate::domain::buy_request::BuyRequest;
use crate::domain::ids::{AccountId, RecordId};
use crate::domain::ledger::{BalanceSheet, LedgerRecord, LedgerWrite, RecordFilter};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::status::TransactionStatus;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// What an account holder sees about their own account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountStatement {
    pub account: AccountId,
    pub balance: BalanceSheet,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    /// The most recent withdrawal requests, newest first.
    pub recent_withdrawals: Vec<WithdrawalRequest>,
    pub buy_requests: Vec<BuyRequest>,
}

pub struct LedgerService {
    store: LedgerStoreRef,
    retry: RetryPolicy,
    recent_limit: usize,
}

impl LedgerService {
    pub fn new(store: LedgerStoreRef, retry: RetryPolicy, recent_limit: usize) -> Self {
        Self {
            store,
            retry,
            recent_limit,
        }
    }

    /// The authoritative available balance, derived from the ledger on every call.
    pub async fn available_balance(&self, account: &AccountId) -> Result<Balance> {
        Ok(self.balance_sheet(account).await?.available)
    }

    pub async fn balance_sheet(&self, account: &AccountId) -> Result<BalanceSheet> {
        self.retry
            .run("balance_sheet", || async {
                Ok(self.store.snapshot(account).await?.balance_sheet())
            })
            .await
    }

    /// Balance plus the account's records, all read at one version.
    pub async fn statement(&self, account: &AccountId) -> Result<AccountStatement> {
        let snapshot = self
            .retry
            .run("statement", || self.store.snapshot(account))
            .await?;
        let balance = snapshot.balance_sheet();
        let mut recent_withdrawals = snapshot.withdrawals;
        recent_withdrawals.truncate(self.recent_limit);
        Ok(AccountStatement {
            account: snapshot.account,
            balance,
            transactions: snapshot.transactions,
            recent_withdrawals,
            buy_requests: snapshot.buy_requests,
        })
    }

    /// Every account with ledger records, with its derived balance.
    pub async fn balances(&self) -> Result<Vec<(AccountId, BalanceSheet)>> {
        let mut balances = Vec::new();
        for account in self.store.accounts().await? {
            let sheet = self.balance_sheet(&account).await?;
            balances.push((account, sheet));
        }
        Ok(balances)
    }

    pub async fn transactions(&self, filter: &RecordFilter) -> Result<Vec<Transaction>> {
        self.store.transactions(filter).await
    }

    /// Enters a deposit on behalf of an account. It stays `pending`, and so
    /// outside the balance, until a reviewer marks it `complete`.
    pub async fn record_deposit(
        &self,
        reviewer: &Reviewer,
        account: &AccountId,
        amount: Decimal,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        let id = RecordId::generate();
        let deposit = self
            .retry
            .run("record_deposit", || async {
                let snapshot = self.store.snapshot(account).await?;
                let deposit = Transaction::deposit(id.clone(), account.clone(), amount);
                self.store
                    .commit(
                        account,
                        snapshot.version,
                        vec![LedgerWrite::Insert(LedgerRecord::Transaction(deposit.clone()))],
                    )
                    .await?;
                Ok(deposit)
            })
            .await?;
        info!(%reviewer, %account, transaction = %deposit.id, %amount, "Deposit recorded");
        Ok(deposit)
    }

    /// Moves a transaction to `status`. Kind and amount never change.
    ///
    /// Refused with `InsufficientBalance` when the change would push a
    /// non-negative available balance below zero, or lower one that is
    /// already negative.
    pub async fn set_transaction_status(
        &self,
        reviewer: &Reviewer,
        id: &RecordId,
        status: TransactionStatus,
    ) -> Result<Transaction> {
        status.validate()?;
        let account = self
            .store
            .find_transaction(id)
            .await?
            .map(|tx| tx.account)
            .ok_or_else(|| LedgerError::NotFound(format!("Transaction {}", id)))?;

        let (updated, changed) = self
            .retry
            .run("set_transaction_status", || async {
                let snapshot = self.store.snapshot(&account).await?;
                let current = snapshot
                    .transaction(id)
                    .ok_or_else(|| LedgerError::NotFound(format!("Transaction {}", id)))?;
                if current.status == status {
                    return Ok((current.clone(), false));
                }

                let mut updated = current.clone();
                updated.status = status.clone();

                let before = snapshot.balance_sheet().available;
                let transactions: Vec<Transaction> = snapshot
                    .transactions
                    .iter()
                    .map(|tx| if &tx.id == id { updated.clone() } else { tx.clone() })
                    .collect();
                let after = BalanceSheet::derive(&transactions, &snapshot.withdrawals).available;
                if after < before && after.is_negative() {
                    return Err(LedgerError::InsufficientBalance {
                        requested: updated.amount.value(),
                        available: before.value(),
                    });
                }

                self.store
                    .commit(
                        &account,
                        snapshot.version,
                        vec![LedgerWrite::Update(LedgerRecord::Transaction(updated.clone()))],
                    )
                    .await?;
                Ok((updated, true))
            })
            .await?;

        if changed {
            info!(%reviewer, %account, transaction = %id, status = %updated.status, "Transaction status changed");
        }
        Ok(updated)
    }
}
