use super::ids::{AccountId, RecordId};
use super::money::{Amount, Balance};
use super::status::TransactionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Sell,
    Withdraw,
    Buy,
}

impl TransactionKind {
    /// Deposits and sells credit the account; withdrawals and buys debit it.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::Sell)
    }
}

/// A ledger event. Kind and amount never change after creation; only the
/// status moves.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: RecordId,
    pub account: AccountId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: TransactionStatus,
    /// Asset bought or sold, when the transaction came from a trade.
    #[serde(default)]
    pub asset: Option<String>,
    /// The request this transaction settles, if any.
    #[serde(default)]
    pub origin: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A reviewer-entered deposit, counted once marked complete.
    pub fn deposit(id: RecordId, account: AccountId, amount: Amount) -> Self {
        Self {
            id,
            account,
            kind: TransactionKind::Deposit,
            amount,
            status: TransactionStatus::Pending,
            asset: None,
            origin: None,
            created_at: Utc::now(),
        }
    }

    /// The completed debit recorded when a buy request is approved.
    pub fn buy_settlement(
        id: RecordId,
        account: AccountId,
        amount: Amount,
        asset: String,
        origin: RecordId,
    ) -> Self {
        Self {
            id,
            account,
            kind: TransactionKind::Buy,
            amount,
            status: TransactionStatus::Complete,
            asset: Some(asset),
            origin: Some(origin),
            created_at: Utc::now(),
        }
    }

    /// Contribution of this transaction to the balance, ignoring status.
    pub fn signed_amount(&self) -> Balance {
        let amount = Balance::from(self.amount);
        if self.kind.is_credit() {
            amount
        } else {
            Balance::ZERO - amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amount_by_kind() {
        let account = AccountId::new("a1").unwrap();
        let mut tx = Transaction::deposit(
            RecordId::from("t1"),
            account,
            Amount::new(dec!(40)).unwrap(),
        );
        assert_eq!(tx.signed_amount(), Balance::new(dec!(40)));

        tx.kind = TransactionKind::Sell;
        assert_eq!(tx.signed_amount(), Balance::new(dec!(40)));

        tx.kind = TransactionKind::Withdraw;
        assert_eq!(tx.signed_amount(), Balance::new(dec!(-40)));

        tx.kind = TransactionKind::Buy;
        assert_eq!(tx.signed_amount(), Balance::new(dec!(-40)));
    }

    #[test]
    fn test_transaction_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "t1",
            "account": "a1",
            "kind": "deposit",
            "amount": "100",
            "status": "Complete",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let tx: Transaction =
            serde_json::from_str(json).expect("Failed to deserialize transaction");
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert!(tx.status.is_complete());
        assert_eq!(tx.origin, None);
    }
}
