use crate::domain::ids::AccountId;
use crate::domain::ledger::BalanceSheet;
use crate::error::Result;
use std::io::Write;

/// Writes derived balances as `account,settled,reserved,available` rows.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_balances(&mut self, balances: &[(AccountId, BalanceSheet)]) -> Result<()> {
        self.writer
            .write_record(["account", "settled", "reserved", "available"])?;
        for (account, sheet) in balances {
            self.writer.write_record([
                account.as_str(),
                &sheet.settled.to_string(),
                &sheet.reserved.to_string(),
                &sheet.available.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
