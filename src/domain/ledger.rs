//! Per-account view of the ledger and the balance derived from it.

use super::buy_request::BuyRequest;
use super::ids::{AccountId, RecordId};
use super::money::Balance;
use super::transaction::Transaction;
use super::withdrawal::WithdrawalRequest;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything the ledger holds for one account, read at a single version.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub account: AccountId,
    /// Incremented by every commit for the account; 0 when nothing was ever written.
    pub version: u64,
    pub transactions: Vec<Transaction>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub buy_requests: Vec<BuyRequest>,
}

impl LedgerSnapshot {
    pub fn empty(account: AccountId) -> Self {
        Self {
            account,
            version: 0,
            transactions: Vec::new(),
            withdrawals: Vec::new(),
            buy_requests: Vec::new(),
        }
    }

    pub fn transaction(&self, id: &RecordId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| &t.id == id)
    }

    pub fn withdrawal(&self, id: &RecordId) -> Option<&WithdrawalRequest> {
        self.withdrawals.iter().find(|w| &w.id == id)
    }

    pub fn buy_request(&self, id: &RecordId) -> Option<&BuyRequest> {
        self.buy_requests.iter().find(|b| &b.id == id)
    }

    pub fn balance_sheet(&self) -> BalanceSheet {
        BalanceSheet::derive(&self.transactions, &self.withdrawals)
    }
}

/// The derived balance of an account.
///
/// `settled` sums complete transactions (credits minus debits), `reserved`
/// sums every withdrawal request that still holds its amount, and
/// `available = settled - reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BalanceSheet {
    pub settled: Balance,
    pub reserved: Balance,
    pub available: Balance,
}

impl BalanceSheet {
    pub fn derive(transactions: &[Transaction], withdrawals: &[WithdrawalRequest]) -> Self {
        let settled = transactions
            .iter()
            .filter(|tx| tx.status.is_complete())
            .fold(Balance::ZERO, |acc, tx| acc + tx.signed_amount());
        let reserved = withdrawals
            .iter()
            .filter(|w| w.status.holds_reservation())
            .fold(Balance::ZERO, |acc, w| acc + Balance::from(w.amount));
        Self {
            settled,
            reserved,
            available: settled - reserved,
        }
    }
}

/// A record that lives in the ledger of exactly one account.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerRecord {
    Transaction(Transaction),
    Withdrawal(WithdrawalRequest),
    BuyRequest(BuyRequest),
}

impl LedgerRecord {
    pub fn id(&self) -> &RecordId {
        match self {
            LedgerRecord::Transaction(tx) => &tx.id,
            LedgerRecord::Withdrawal(w) => &w.id,
            LedgerRecord::BuyRequest(b) => &b.id,
        }
    }

    pub fn account(&self) -> &AccountId {
        match self {
            LedgerRecord::Transaction(tx) => &tx.account,
            LedgerRecord::Withdrawal(w) => &w.account,
            LedgerRecord::BuyRequest(b) => &b.account,
        }
    }
}

/// One write of an atomic ledger commit.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite {
    /// Creates a record; the id must not exist yet.
    Insert(LedgerRecord),
    /// Replaces an existing record of the same account.
    Update(LedgerRecord),
}

impl LedgerWrite {
    pub fn record(&self) -> &LedgerRecord {
        match self {
            LedgerWrite::Insert(record) | LedgerWrite::Update(record) => record,
        }
    }
}

/// Narrows a listing to one account and/or one status label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub account: Option<AccountId>,
    pub status: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn account(account: AccountId) -> Self {
        Self {
            account: Some(account),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Status labels compare case-insensitively, like the status types do.
    pub fn matches(&self, account: &AccountId, status: &str) -> bool {
        self.account.as_ref().is_none_or(|a| a == account)
            && self
                .status
                .as_ref()
                .is_none_or(|s| s.trim().eq_ignore_ascii_case(status))
    }
}

/// Checks a batch of writes against the current ledger contents.
///
/// Shared by every adapter so they reject exactly the same batches.
pub(crate) fn validate_writes(
    account: &AccountId,
    writes: &[LedgerWrite],
    mut existing_owner: impl FnMut(&LedgerRecord) -> Result<Option<AccountId>>,
) -> Result<()> {
    let mut inserted: BTreeSet<(u8, &RecordId)> = BTreeSet::new();
    for write in writes {
        let record = write.record();
        if record.account() != account {
            return Err(LedgerError::ValidationError(format!(
                "Record {} belongs to account {}, not {}",
                record.id(),
                record.account(),
                account
            )));
        }
        let owner = existing_owner(record)?;
        match write {
            LedgerWrite::Insert(_) => {
                let slot = (collection_tag(record), record.id());
                if owner.is_some() || !inserted.insert(slot) {
                    return Err(LedgerError::ValidationError(format!(
                        "Duplicate record id {}",
                        record.id()
                    )));
                }
            }
            LedgerWrite::Update(_) => {
                if owner.as_ref() != Some(account) {
                    return Err(LedgerError::ValidationError(format!(
                        "Record {} does not exist for account {}",
                        record.id(),
                        account
                    )));
                }
            }
        }
    }
    Ok(())
}

fn collection_tag(record: &LedgerRecord) -> u8 {
    match record {
        LedgerRecord::Transaction(_) => 0,
        LedgerRecord::Withdrawal(_) => 1,
        LedgerRecord::BuyRequest(_) => 2,
    }
}

/// Sorts records by creation time, newest first.
pub(crate) fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::payment::SealedPayload;
    use crate::domain::status::{TransactionStatus, WithdrawalStatus};
    use crate::domain::transaction::TransactionKind;
    use crate::domain::withdrawal::WithdrawalMethod;
    use rust_decimal_macros::dec;

    fn account() -> AccountId {
        AccountId::new("a1").unwrap()
    }

    fn tx(
        id: &str,
        kind: TransactionKind,
        amount: rust_decimal::Decimal,
        status: &str,
    ) -> Transaction {
        let amount = Amount::new(amount).unwrap();
        let mut tx = Transaction::deposit(RecordId::from(id), account(), amount);
        tx.kind = kind;
        tx.status = TransactionStatus::from(status);
        tx
    }

    fn withdrawal(id: &str, amount: rust_decimal::Decimal, status: &str) -> WithdrawalRequest {
        let mut w = WithdrawalRequest::new(
            RecordId::from(id),
            account(),
            Amount::new(amount).unwrap(),
            WithdrawalMethod::Card,
            SealedPayload::new("x.y.z".to_string()),
        );
        w.status = WithdrawalStatus::from(status);
        w
    }

    #[test]
    fn test_validate_writes_rules() {
        let insert = |id: &str| {
            LedgerWrite::Insert(LedgerRecord::Transaction(tx(
                id,
                TransactionKind::Deposit,
                dec!(1),
                "pending",
            )))
        };
        let none = |_: &LedgerRecord| Ok(None);

        assert!(validate_writes(&account(), &[insert("t1"), insert("t2")], none).is_ok());
        assert!(validate_writes(&account(), &[insert("t1"), insert("t1")], none).is_err());
        let update = LedgerWrite::Update(insert("t1").record().clone());
        assert!(validate_writes(&account(), std::slice::from_ref(&update), none).is_err());
        let owned = |_: &LedgerRecord| Ok(Some(account()));
        assert!(validate_writes(&account(), &[update], owned).is_ok());
    }

    #[test]
    fn test_newest_first_orders_by_creation_time() {
        let mut older = tx("t1", TransactionKind::Deposit, dec!(1), "pending");
        older.created_at -= chrono::Duration::seconds(60);
        let newer = tx("t2", TransactionKind::Deposit, dec!(1), "pending");
        let mut items = vec![older, newer];
        newest_first(&mut items, |t| t.created_at);
        assert_eq!(items[0].id, RecordId::from("t2"));
    }

    #[test]
    fn test_only_complete_transactions_are_settled() {
        let txs = vec![
            tx("t1", TransactionKind::Deposit, dec!(100), "complete"),
            tx("t2", TransactionKind::Deposit, dec!(500), "pending"),
            tx("t3", TransactionKind::Sell, dec!(20), "Complete"),
            tx("t4", TransactionKind::Buy, dec!(30), "complete"),
            tx("t5", TransactionKind::Withdraw, dec!(10), "complete"),
            tx("t6", TransactionKind::Deposit, dec!(999), "Under Review"),
        ];
        let sheet = BalanceSheet::derive(&txs, &[]);
        assert_eq!(sheet.settled, Balance::new(dec!(80)));
        assert_eq!(sheet.available, Balance::new(dec!(80)));
    }

    #[test]
    fn test_reservation_released_only_on_rejection() {
        let txs = vec![tx("t1", TransactionKind::Deposit, dec!(200), "complete")];
        let withdrawals = vec![
            withdrawal("w1", dec!(50), "pending"),
            withdrawal("w2", dec!(20), "approved"),
            withdrawal("w3", dec!(70), "rejected"),
            withdrawal("w4", dec!(5), "On Hold"),
        ];
        let sheet = BalanceSheet::derive(&txs, &withdrawals);
        assert_eq!(sheet.reserved, Balance::new(dec!(75)));
        assert_eq!(sheet.available, Balance::new(dec!(125)));
    }

    #[test]
    fn test_negative_legacy_balance_is_reported_as_is() {
        let txs = vec![tx("t1", TransactionKind::Deposit, dec!(10), "complete")];
        let withdrawals = vec![withdrawal("w1", dec!(25), "approved")];
        let sheet = BalanceSheet::derive(&txs, &withdrawals);
        assert_eq!(sheet.available, Balance::new(dec!(-15)));
    }

    #[test]
    fn test_record_filter_matching() {
        let other = AccountId::new("a2").unwrap();
        let filter = RecordFilter::account(account()).with_status("Pending");
        assert!(filter.matches(&account(), "pending"));
        assert!(!filter.matches(&other, "pending"));
        assert!(!filter.matches(&account(), "approved"));
        assert!(RecordFilter::all().matches(&other, "anything"));
    }
}
