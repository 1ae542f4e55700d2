use crate::domain::account::AccountProfile;
use crate::domain::buy_request::BuyRequest;
use crate::domain::ids::{AccountId, RecordId};
use crate::domain::ledger::{
    LedgerRecord, LedgerSnapshot, LedgerWrite, RecordFilter, newest_first, validate_writes,
};
use crate::domain::ports::{AccountStore, LedgerStore, StatusTypeStore};
use crate::domain::status::StatusType;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for transactions, keyed by record id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for withdrawal requests, keyed by record id.
pub const CF_WITHDRAWALS: &str = "withdrawals";
/// Column Family for buy requests, keyed by record id.
pub const CF_BUY_REQUESTS: &str = "buy_requests";
/// Column Family for per-account ledger versions (big-endian u64).
pub const CF_VERSIONS: &str = "versions";
/// Column Family for reviewer-defined status types.
pub const CF_STATUS_TYPES: &str = "status_types";
/// Column Family for account profiles.
pub const CF_ACCOUNTS: &str = "accounts";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_TRANSACTIONS,
    CF_WITHDRAWALS,
    CF_BUY_REQUESTS,
    CF_VERSIONS,
    CF_STATUS_TYPES,
    CF_ACCOUNTS,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family as JSON. Ledger commits are
/// serialized by an in-process lock and written as one `WriteBatch`, so the
/// version check and all writes of a commit land together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read_one<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.handle(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.handle(cf_name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    fn write_one<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.handle(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn version(&self, account: &AccountId) -> Result<u64> {
        let cf = self.handle(CF_VERSIONS)?;
        match self.db.get_pinned_cf(cf, account.as_str().as_bytes())? {
            Some(bytes) => {
                let raw = <[u8; 8]>::try_from(&bytes[..]).map_err(|_| {
                    LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                        "Corrupt version for account {}",
                        account
                    ))))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn owner_of(&self, record: &LedgerRecord) -> Result<Option<AccountId>> {
        let key = record.id().as_str().as_bytes();
        Ok(match record {
            LedgerRecord::Transaction(_) => self
                .read_one::<Transaction>(CF_TRANSACTIONS, key)?
                .map(|t| t.account),
            LedgerRecord::Withdrawal(_) => self
                .read_one::<WithdrawalRequest>(CF_WITHDRAWALS, key)?
                .map(|w| w.account),
            LedgerRecord::BuyRequest(_) => self
                .read_one::<BuyRequest>(CF_BUY_REQUESTS, key)?
                .map(|b| b.account),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.commit_lock.lock().map_err(|_| {
            LedgerError::InternalError(Box::new(std::io::Error::other("Commit lock poisoned")))
        })
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn snapshot(&self, account: &AccountId) -> Result<LedgerSnapshot> {
        let filter = RecordFilter::account(account.clone());
        let mut snapshot = LedgerSnapshot::empty(account.clone());
        snapshot.version = self.version(account)?;
        snapshot.transactions = self.transactions(&filter).await?;
        snapshot.withdrawals = self.withdrawals(&filter).await?;
        snapshot.buy_requests = self.buy_requests(&filter).await?;
        // A commit may have landed between the reads above; re-read if so.
        if self.version(account)? != snapshot.version {
            return Err(LedgerError::Conflict(account.to_string()));
        }
        Ok(snapshot)
    }

    async fn commit(
        &self,
        account: &AccountId,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<()> {
        let _guard = self.lock()?;
        let current = self.version(account)?;
        if current != expected_version {
            return Err(LedgerError::Conflict(account.to_string()));
        }
        validate_writes(account, &writes, |record| self.owner_of(record))?;

        let mut batch = WriteBatch::default();
        for write in &writes {
            let record = write.record();
            let (cf, value) = match record {
                LedgerRecord::Transaction(tx) => {
                    (self.handle(CF_TRANSACTIONS)?, serde_json::to_vec(tx)?)
                }
                LedgerRecord::Withdrawal(w) => {
                    (self.handle(CF_WITHDRAWALS)?, serde_json::to_vec(w)?)
                }
                LedgerRecord::BuyRequest(b) => {
                    (self.handle(CF_BUY_REQUESTS)?, serde_json::to_vec(b)?)
                }
            };
            batch.put_cf(cf, record.id().as_str().as_bytes(), value);
        }
        batch.put_cf(
            self.handle(CF_VERSIONS)?,
            account.as_str().as_bytes(),
            (current + 1).to_be_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn find_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        self.read_one(CF_TRANSACTIONS, id.as_str().as_bytes())
    }

    async fn find_withdrawal(&self, id: &RecordId) -> Result<Option<WithdrawalRequest>> {
        self.read_one(CF_WITHDRAWALS, id.as_str().as_bytes())
    }

    async fn find_buy_request(&self, id: &RecordId) -> Result<Option<BuyRequest>> {
        self.read_one(CF_BUY_REQUESTS, id.as_str().as_bytes())
    }

    async fn transactions(&self, filter: &RecordFilter) -> Result<Vec<Transaction>> {
        let mut found: Vec<Transaction> = self
            .read_all::<Transaction>(CF_TRANSACTIONS)?
            .into_iter()
            .filter(|t| filter.matches(&t.account, &t.status.to_string()))
            .collect();
        newest_first(&mut found, |t| t.created_at);
        Ok(found)
    }

    async fn withdrawals(&self, filter: &RecordFilter) -> Result<Vec<WithdrawalRequest>> {
        let mut found: Vec<WithdrawalRequest> = self
            .read_all::<WithdrawalRequest>(CF_WITHDRAWALS)?
            .into_iter()
            .filter(|w| filter.matches(&w.account, &w.status.to_string()))
            .collect();
        newest_first(&mut found, |w| w.created_at);
        Ok(found)
    }

    async fn buy_requests(&self, filter: &RecordFilter) -> Result<Vec<BuyRequest>> {
        let mut found: Vec<BuyRequest> = self
            .read_all::<BuyRequest>(CF_BUY_REQUESTS)?
            .into_iter()
            .filter(|b| filter.matches(&b.account, &b.status.to_string()))
            .collect();
        newest_first(&mut found, |b| b.created_at);
        Ok(found)
    }

    async fn accounts(&self) -> Result<Vec<AccountId>> {
        let mut accounts = BTreeSet::new();
        let transactions = self.read_all::<Transaction>(CF_TRANSACTIONS)?;
        let withdrawals = self.read_all::<WithdrawalRequest>(CF_WITHDRAWALS)?;
        let buy_requests = self.read_all::<BuyRequest>(CF_BUY_REQUESTS)?;
        accounts.extend(transactions.into_iter().map(|t| t.account));
        accounts.extend(withdrawals.into_iter().map(|w| w.account));
        accounts.extend(buy_requests.into_iter().map(|b| b.account));
        Ok(accounts.into_iter().collect())
    }

    async fn purge(&self, account: &AccountId) -> Result<()> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();

        for tx in self.read_all::<Transaction>(CF_TRANSACTIONS)? {
            if &tx.account == account {
                batch.delete_cf(self.handle(CF_TRANSACTIONS)?, tx.id.as_str().as_bytes());
            }
        }
        for w in self.read_all::<WithdrawalRequest>(CF_WITHDRAWALS)? {
            if &w.account == account {
                batch.delete_cf(self.handle(CF_WITHDRAWALS)?, w.id.as_str().as_bytes());
            }
        }
        for b in self.read_all::<BuyRequest>(CF_BUY_REQUESTS)? {
            if &b.account == account {
                batch.delete_cf(self.handle(CF_BUY_REQUESTS)?, b.id.as_str().as_bytes());
            }
        }
        let next = self.version(account)? + 1;
        batch.put_cf(self.handle(CF_VERSIONS)?, account.as_str().as_bytes(), next.to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl StatusTypeStore for RocksDBStore {
    async fn insert(&self, status: StatusType) -> Result<()> {
        let key = status.id.as_str().as_bytes().to_vec();
        if self.read_one::<StatusType>(CF_STATUS_TYPES, &key)?.is_some() {
            return Err(LedgerError::ValidationError(format!(
                "Duplicate status type id {}",
                status.id
            )));
        }
        self.write_one(CF_STATUS_TYPES, &key, &status)
    }

    async fn all(&self) -> Result<Vec<StatusType>> {
        self.read_all(CF_STATUS_TYPES)
    }

    async fn remove(&self, id: &RecordId) -> Result<bool> {
        let key = id.as_str().as_bytes();
        let existed = self.read_one::<StatusType>(CF_STATUS_TYPES, key)?.is_some();
        if existed {
            self.db.delete_cf(self.handle(CF_STATUS_TYPES)?, key)?;
        }
        Ok(existed)
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn insert_new(&self, profile: AccountProfile) -> Result<bool> {
        let _guard = self.lock()?;
        let key = profile.id.as_str().as_bytes();
        if self.read_one::<AccountProfile>(CF_ACCOUNTS, key)?.is_some() {
            return Ok(false);
        }
        self.write_one(CF_ACCOUNTS, key, &profile)?;
        Ok(true)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<AccountProfile>> {
        self.read_one(CF_ACCOUNTS, id.as_str().as_bytes())
    }

    async fn all(&self) -> Result<Vec<AccountProfile>> {
        self.read_all(CF_ACCOUNTS)
    }

    async fn remove(&self, id: &AccountId) -> Result<bool> {
        let key = id.as_str().as_bytes();
        let existed = self.read_one::<AccountProfile>(CF_ACCOUNTS, key)?.is_some();
        if existed {
            self.db.delete_cf(self.handle(CF_ACCOUNTS)?, key)?;
        }
        Ok(existed)
    }
}
