#![allow(dead_code)]

use custody_ledger::application::engine::CustodyEngine;
use custody_ledger::application::identity::Reviewer;
use custody_ledger::config::EngineConfig;
use custody_ledger::domain::ids::AccountId;
use custody_ledger::domain::status::TransactionStatus;
use custody_ledger::infrastructure::in_memory::in_memory_stores;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 10] = [
    "op", "account", "id", "amount", "method", "asset", "status", "details", "email", "name",
];

pub fn engine() -> CustodyEngine {
    CustodyEngine::new(in_memory_stores(), &EngineConfig::default())
}

pub fn reviewer() -> Reviewer {
    Reviewer::new("ops")
}

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

/// Records a deposit and marks it complete.
pub async fn fund(engine: &CustodyEngine, account: &AccountId, amount: Decimal) {
    let deposit = engine
        .ledger()
        .record_deposit(&reviewer(), account, amount)
        .await
        .unwrap();
    engine
        .ledger()
        .set_transaction_status(&reviewer(), &deposit.id, TransactionStatus::Complete)
        .await
        .unwrap();
}

/// Writes a command CSV with `rows` settled deposits of 1.0 for account "1".
pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;

    for i in 1..=rows {
        let label = format!("d{}", i);
        wtr.write_record(["deposit", "1", &label, "1.0", "", "", "", "", "", ""])?;
        wtr.write_record(["transaction-status", "", &label, "", "", "", "complete", "", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
