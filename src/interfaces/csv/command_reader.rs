use crate::domain::ids::AccountId;
use crate::domain::payment::PaymentDetails;
use crate::domain::status::{TransactionStatus, WithdrawalStatus};
use crate::domain::withdrawal::WithdrawalMethod;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum Op {
    Register,
    Deposit,
    TransactionStatus,
    Withdraw,
    WithdrawalStatus,
    Buy,
    ApproveBuy,
    RejectBuy,
    AddStatus,
    RemoveStatus,
    Purge,
}

/// One CSV row as written. Which columns matter depends on `op`; the rest
/// may be empty or absent.
#[derive(Debug, Deserialize)]
struct CommandRow {
    op: Op,
    account: Option<String>,
    /// Batch-local label for the record a row creates or targets.
    id: Option<String>,
    amount: Option<Decimal>,
    method: Option<WithdrawalMethod>,
    asset: Option<String>,
    status: Option<String>,
    /// Payment details of a withdrawal, as a flat JSON object.
    details: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// A single instruction for the engine.
///
/// `reference` fields are batch-local labels: a row that creates a record
/// may name it, and later rows target it by that name.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register {
        account: AccountId,
        email: String,
        full_name: String,
    },
    Deposit {
        account: AccountId,
        reference: Option<String>,
        amount: Decimal,
    },
    SetTransactionStatus {
        reference: String,
        status: TransactionStatus,
    },
    Withdraw {
        account: AccountId,
        reference: Option<String>,
        amount: Decimal,
        method: WithdrawalMethod,
        details: PaymentDetails,
    },
    SetWithdrawalStatus {
        reference: String,
        status: WithdrawalStatus,
    },
    Buy {
        account: AccountId,
        reference: Option<String>,
        asset: String,
        amount: Decimal,
    },
    ApproveBuy {
        reference: String,
    },
    RejectBuy {
        reference: String,
    },
    AddStatus {
        reference: Option<String>,
        name: String,
    },
    RemoveStatus {
        reference: String,
    },
    Purge {
        account: AccountId,
    },
}

fn required<T>(value: Option<T>, column: &str, op: Op) -> Result<T> {
    value.ok_or_else(|| {
        LedgerError::ValidationError(format!("Column '{}' is required for {:?}", column, op))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TryFrom<CommandRow> for Command {
    type Error = LedgerError;

    fn try_from(row: CommandRow) -> Result<Self> {
        let op = row.op;
        let account =
            || required(non_empty(row.account.clone()), "account", op).and_then(AccountId::new);
        let reference = || required(non_empty(row.id.clone()), "id", op);
        let amount = || required(row.amount, "amount", op);
        let status = || required(non_empty(row.status.clone()), "status", op);

        Ok(match op {
            Op::Register => Command::Register {
                account: account()?,
                email: required(non_empty(row.email.clone()), "email", op)?,
                full_name: row.name.clone().unwrap_or_default(),
            },
            Op::Deposit => Command::Deposit {
                account: account()?,
                reference: non_empty(row.id.clone()),
                amount: amount()?,
            },
            Op::TransactionStatus => Command::SetTransactionStatus {
                reference: reference()?,
                status: TransactionStatus::from(status()?),
            },
            Op::Withdraw => Command::Withdraw {
                account: account()?,
                reference: non_empty(row.id.clone()),
                amount: amount()?,
                method: required(row.method, "method", op)?,
                details: match non_empty(row.details.clone()) {
                    Some(json) => PaymentDetails::from_json(&json)?,
                    None => PaymentDetails::new(),
                },
            },
            Op::WithdrawalStatus => Command::SetWithdrawalStatus {
                reference: reference()?,
                status: WithdrawalStatus::from(status()?),
            },
            Op::Buy => Command::Buy {
                account: account()?,
                reference: non_empty(row.id.clone()),
                asset: required(non_empty(row.asset.clone()), "asset", op)?,
                amount: amount()?,
            },
            Op::ApproveBuy => Command::ApproveBuy {
                reference: reference()?,
            },
            Op::RejectBuy => Command::RejectBuy {
                reference: reference()?,
            },
            Op::AddStatus => Command::AddStatus {
                reference: non_empty(row.id.clone()),
                name: required(non_empty(row.name.clone().or(row.status.clone())), "name", op)?,
            },
            Op::RemoveStatus => Command::RemoveStatus {
                reference: reference()?,
            },
            Op::Purge => Command::Purge { account: account()? },
        })
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It trims whitespace and accepts rows with fewer columns than the header.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates commands, so large
    /// files are processed without loading them into memory.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<CommandRow>()
            .map(|result| result.map_err(LedgerError::from).and_then(Command::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op,account,id,amount,method,asset,status,details,email,name";

    fn read(rows: &str) -> Vec<Result<Command>> {
        let data = format!("{}\n{}", HEADER, rows);
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "deposit, alice, d1, 100.0,,,,,,\n\
             transaction-status,, d1,,,, Complete,,,\n\
             buy, alice, b1, 30,, BTC,,,,",
        );

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::Deposit {
                account: AccountId::new("alice").unwrap(),
                reference: Some("d1".to_string()),
                amount: dec!(100.0),
            }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::SetTransactionStatus {
                reference: "d1".to_string(),
                status: TransactionStatus::Complete,
            }
        );
        assert!(matches!(results[2], Ok(Command::Buy { ref asset, .. }) if asset == "BTC"));
    }

    #[test]
    fn test_reader_withdrawal_details() {
        let results = read(
            "withdraw,alice,w1,25,card,,,\"{\"\"cardNumber\"\":\"\"4111\"\",\"\"cvv\"\":123}\",,",
        );

        let Ok(Command::Withdraw { method, details, .. }) = &results[0] else {
            panic!("expected a withdraw command, got {:?}", results[0]);
        };
        assert_eq!(*method, WithdrawalMethod::Card);
        assert_eq!(details.get("cardNumber").map(|v| v.to_string()), Some("4111".to_string()));
        assert_eq!(details.len(), 2);
    }

    #[test]
    fn test_reader_malformed_line() {
        let results = read("invalid,alice,x1,1.0,,,,,,");
        assert!(matches!(results[0], Err(LedgerError::CsvError(_))));
    }

    #[test]
    fn test_reader_missing_columns() {
        let results = read(
            "deposit,,d1,10,,,,,,\n\
             withdraw,alice,w1,10,,,,,,\n\
             approve-buy,,,,,,,,,\n\
             withdraw,alice,w2,10,bank,,,[1],,",
        );
        assert!(results.iter().all(|r| matches!(r, Err(LedgerError::ValidationError(_)))));
    }

    #[test]
    fn test_reader_short_rows() {
        let data = "op,account,id\npurge,alice";
        let results: Vec<Result<Command>> =
            CommandReader::new(data.as_bytes()).commands().collect();
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::Purge {
                account: AccountId::new("alice").unwrap()
            }
        );
    }
}
