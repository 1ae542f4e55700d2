use clap::Parser;
use custody_ledger::application::engine::CustodyEngine;
use custody_ledger::application::identity::Reviewer;
use custody_ledger::application::retry::RetryPolicy;
use custody_ledger::config::EngineConfig;
use custody_ledger::domain::ports::Stores;
use custody_ledger::infrastructure::codec::MasterKey;
use custody_ledger::infrastructure::in_memory::in_memory_stores;
#[cfg(feature = "storage-rocksdb")]
use custody_ledger::infrastructure::rocksdb::RocksDBStore;
use custody_ledger::interfaces::batch::BatchRunner;
use custody_ledger::interfaces::csv::balance_writer::BalanceWriter;
use custody_ledger::interfaces::csv::command_reader::CommandReader;
use custody_ledger::telemetry;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CUSTODY_DB_PATH")]
    db_path: Option<PathBuf>,

    /// 64 hex chars. Seals payment-detail keys under this master key.
    #[arg(long, env = "CUSTODY_MASTER_KEY", hide_env_values = true)]
    master_key: Option<String>,

    /// Smallest withdrawal amount accepted from the batch.
    #[arg(long, default_value = "10")]
    min_withdrawal: Decimal,

    /// Commit attempts before a contended operation gives up.
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Delay before the first retry; doubles on every further retry.
    #[arg(long, default_value_t = 10)]
    retry_delay_ms: u64,

    /// Withdrawal requests shown per account statement.
    #[arg(long, default_value_t = 5)]
    recent_limit: usize,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let master_key = self
            .master_key
            .as_deref()
            .map(MasterKey::from_hex)
            .transpose()
            .into_diagnostic()?;
        let config = EngineConfig {
            retry: RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms)),
            recent_limit: self.recent_limit,
            min_withdrawal: self.min_withdrawal,
            master_key,
        };
        config.validate().into_diagnostic()?;
        Ok(config)
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(&db_path).into_diagnostic()?;
            info!(path = %db_path.display(), "Using RocksDB storage");
            Ok(Stores::shared(store))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        tracing::warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level);

    let config = cli.engine_config()?;
    let engine = CustodyEngine::new(open_stores(cli.db_path.clone())?, &config);

    // Apply commands
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = BatchRunner::new(&engine, Reviewer::new("batch"), config.min_withdrawal);
    let report = runner.run(reader.commands()).await;
    info!(applied = report.applied, rejected = report.rejected, "Batch finished");

    // Output derived balances
    let balances = engine.balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(&balances).into_diagnostic()?;

    Ok(())
}
