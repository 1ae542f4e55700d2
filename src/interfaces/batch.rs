use super::csv::command_reader::Command;
use crate::application::engine::CustodyEngine;
use crate::application::identity::Reviewer;
use crate::domain::ids::RecordId;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub rejected: usize,
}

/// Feeds commands to a `CustodyEngine` in order.
///
/// The batch operator acts as the reviewer for privileged commands. Labels
/// given in the `id` column are mapped to the ids the engine generates;
/// a label never seen in this batch is used as a record id verbatim.
pub struct BatchRunner<'a> {
    engine: &'a CustodyEngine,
    operator: Reviewer,
    min_withdrawal: Decimal,
    references: HashMap<String, RecordId>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a CustodyEngine, operator: Reviewer, min_withdrawal: Decimal) -> Self {
        Self {
            engine,
            operator,
            min_withdrawal,
            references: HashMap::new(),
        }
    }

    /// Applies every command. A failing row is logged and skipped; it never
    /// stops the batch.
    pub async fn run(&mut self, commands: impl Iterator<Item = Result<Command>>) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, command) in commands.enumerate() {
            let row = index + 1;
            match command {
                Ok(command) => match self.apply(command).await {
                    Ok(()) => report.applied += 1,
                    Err(e) => {
                        warn!(row, error = %e, "Error applying command");
                        report.rejected += 1;
                    }
                },
                Err(e) => {
                    warn!(row, error = %e, "Error reading command");
                    report.rejected += 1;
                }
            }
        }
        report
    }

    pub async fn apply(&mut self, command: Command) -> Result<()> {
        let engine = self.engine;
        match command {
            Command::Register {
                account,
                email,
                full_name,
            } => {
                engine.directory().register(&account, &email, &full_name).await?;
            }
            Command::Deposit {
                account,
                reference,
                amount,
            } => {
                let deposit = engine
                    .ledger()
                    .record_deposit(&self.operator, &account, amount)
                    .await?;
                self.remember(reference, deposit.id);
            }
            Command::SetTransactionStatus { reference, status } => {
                let id = self.resolve(&reference);
                engine
                    .ledger()
                    .set_transaction_status(&self.operator, &id, status)
                    .await?;
            }
            Command::Withdraw {
                account,
                reference,
                amount,
                method,
                details,
            } => {
                if amount < self.min_withdrawal {
                    return Err(LedgerError::ValidationError(format!(
                        "Withdrawal amount {} is below the minimum of {}",
                        amount.normalize(),
                        self.min_withdrawal.normalize()
                    )));
                }
                let request = engine
                    .withdrawals()
                    .submit(&account, amount, method, &details)
                    .await?;
                self.remember(reference, request.id);
            }
            Command::SetWithdrawalStatus { reference, status } => {
                let id = self.resolve(&reference);
                engine
                    .withdrawals()
                    .set_status(&self.operator, &id, status)
                    .await?;
            }
            Command::Buy {
                account,
                reference,
                asset,
                amount,
            } => {
                let request = engine.settlement().request(&account, &asset, amount).await?;
                self.remember(reference, request.id);
            }
            Command::ApproveBuy { reference } => {
                let id = self.resolve(&reference);
                engine.settlement().approve(&self.operator, &id).await?;
            }
            Command::RejectBuy { reference } => {
                let id = self.resolve(&reference);
                engine.settlement().reject(&self.operator, &id).await?;
            }
            Command::AddStatus { reference, name } => {
                let status = engine.statuses().create(&self.operator, &name).await?;
                self.remember(reference, status.id);
            }
            Command::RemoveStatus { reference } => {
                let id = self.resolve(&reference);
                engine.statuses().delete(&self.operator, &id).await?;
            }
            Command::Purge { account } => {
                engine.directory().purge(&self.operator, &account).await?;
            }
        }
        Ok(())
    }

    fn remember(&mut self, reference: Option<String>, id: RecordId) {
        if let Some(reference) = reference {
            self.references.insert(reference, id);
        }
    }

    fn resolve(&self, reference: &str) -> RecordId {
        self.references
            .get(reference)
            .cloned()
            .unwrap_or_else(|| RecordId::from(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::ids::AccountId;
    use crate::domain::money::Balance;
    use crate::infrastructure::in_memory::in_memory_stores;
    use crate::interfaces::csv::command_reader::CommandReader;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op,account,id,amount,method,asset,status,details,email,name";

    async fn run(engine: &CustodyEngine, rows: &str) -> BatchReport {
        let data = format!("{}\n{}", HEADER, rows);
        let mut runner = BatchRunner::new(engine, Reviewer::new("batch"), dec!(10));
        runner.run(CommandReader::new(data.as_bytes()).commands()).await
    }

    #[tokio::test]
    async fn test_labels_link_rows() {
        let engine = CustodyEngine::new(in_memory_stores(), &EngineConfig::default());
        let report = run(
            &engine,
            "deposit,alice,d1,200,,,,,,\n\
             transaction-status,,d1,,,,complete,,,\n\
             withdraw,alice,w1,50,bank,,,\"{\"\"iban\"\":\"\"DE89\"\"}\",,\n\
             buy,alice,b1,30,,BTC,,,,\n\
             approve-buy,,b1,,,,,,,",
        )
        .await;

        assert_eq!(report, BatchReport { applied: 5, rejected: 0 });
        let alice = AccountId::new("alice").unwrap();
        let sheet = engine.ledger().balance_sheet(&alice).await.unwrap();
        assert_eq!(sheet.settled, Balance::new(dec!(170)));
        assert_eq!(sheet.reserved, Balance::new(dec!(50)));
        assert_eq!(sheet.available, Balance::new(dec!(120)));
    }

    #[tokio::test]
    async fn test_minimum_withdrawal_is_enforced_by_the_batch() {
        let engine = CustodyEngine::new(in_memory_stores(), &EngineConfig::default());
        let report = run(
            &engine,
            "deposit,alice,d1,100,,,,,,\n\
             transaction-status,,d1,,,,complete,,,\n\
             withdraw,alice,w1,9.99,card,,,,,\n\
             withdraw,alice,w2,10,card,,,,,",
        )
        .await;

        assert_eq!(report, BatchReport { applied: 3, rejected: 1 });
        let alice = AccountId::new("alice").unwrap();
        assert_eq!(
            engine.ledger().available_balance(&alice).await.unwrap(),
            Balance::new(dec!(90))
        );
    }

    #[tokio::test]
    async fn test_bad_rows_do_not_stop_the_batch() {
        let engine = CustodyEngine::new(in_memory_stores(), &EngineConfig::default());
        let report = run(
            &engine,
            "deposit,alice,d1,100,,,,,,\n\
             bogus,alice,x,1,,,,,,\n\
             approve-buy,,nope,,,,,,,\n\
             transaction-status,,d1,,,,complete,,,",
        )
        .await;

        assert_eq!(report, BatchReport { applied: 2, rejected: 2 });
    }
}
