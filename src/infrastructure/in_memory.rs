use crate::domain::account::AccountProfile;
use crate::domain::buy_request::BuyRequest;
use crate::domain::ids::{AccountId, RecordId};
use crate::domain::ledger::{
    LedgerRecord, LedgerSnapshot, LedgerWrite, RecordFilter, newest_first, validate_writes,
};
use crate::domain::ports::{AccountStore, LedgerStore, StatusTypeStore, Stores};
use crate::domain::status::StatusType;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    versions: HashMap<AccountId, u64>,
    transactions: HashMap<RecordId, Transaction>,
    withdrawals: HashMap<RecordId, WithdrawalRequest>,
    buy_requests: HashMap<RecordId, BuyRequest>,
}

impl Ledger {
    fn contains(&self, record: &LedgerRecord) -> Option<&AccountId> {
        match record {
            LedgerRecord::Transaction(tx) => self.transactions.get(&tx.id).map(|t| &t.account),
            LedgerRecord::Withdrawal(w) => self.withdrawals.get(&w.id).map(|w| &w.account),
            LedgerRecord::BuyRequest(b) => self.buy_requests.get(&b.id).map(|b| &b.account),
        }
    }

    fn put(&mut self, record: LedgerRecord) {
        match record {
            LedgerRecord::Transaction(tx) => {
                self.transactions.insert(tx.id.clone(), tx);
            }
            LedgerRecord::Withdrawal(w) => {
                self.withdrawals.insert(w.id.clone(), w);
            }
            LedgerRecord::BuyRequest(b) => {
                self.buy_requests.insert(b.id.clone(), b);
            }
        }
    }
}

/// A thread-safe in-memory ledger.
///
/// Uses `Arc<RwLock<..>>` so clones share state; a commit holds the write lock
/// for its whole check-and-apply, which makes it atomic. Ideal for tests and
/// single-process runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn snapshot(&self, account: &AccountId) -> Result<LedgerSnapshot> {
        let ledger = self.ledger.read().await;
        let mut snapshot = LedgerSnapshot::empty(account.clone());
        snapshot.version = ledger.versions.get(account).copied().unwrap_or(0);
        snapshot.transactions = ledger
            .transactions
            .values()
            .filter(|t| &t.account == account)
            .cloned()
            .collect();
        snapshot.withdrawals = ledger
            .withdrawals
            .values()
            .filter(|w| &w.account == account)
            .cloned()
            .collect();
        snapshot.buy_requests = ledger
            .buy_requests
            .values()
            .filter(|b| &b.account == account)
            .cloned()
            .collect();
        newest_first(&mut snapshot.transactions, |t| t.created_at);
        newest_first(&mut snapshot.withdrawals, |w| w.created_at);
        newest_first(&mut snapshot.buy_requests, |b| b.created_at);
        Ok(snapshot)
    }

    async fn commit(
        &self,
        account: &AccountId,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let current = ledger.versions.get(account).copied().unwrap_or(0);
        if current != expected_version {
            return Err(LedgerError::Conflict(account.to_string()));
        }
        validate_writes(account, &writes, |record| Ok(ledger.contains(record).cloned()))?;

        for write in writes {
            match write {
                LedgerWrite::Insert(record) | LedgerWrite::Update(record) => ledger.put(record),
            }
        }
        ledger.versions.insert(account.clone(), current + 1);
        Ok(())
    }

    async fn find_transaction(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.transactions.get(id).cloned())
    }

    async fn find_withdrawal(&self, id: &RecordId) -> Result<Option<WithdrawalRequest>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.withdrawals.get(id).cloned())
    }

    async fn find_buy_request(&self, id: &RecordId) -> Result<Option<BuyRequest>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.buy_requests.get(id).cloned())
    }

    async fn transactions(&self, filter: &RecordFilter) -> Result<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        let mut found: Vec<Transaction> = ledger
            .transactions
            .values()
            .filter(|t| filter.matches(&t.account, &t.status.to_string()))
            .cloned()
            .collect();
        newest_first(&mut found, |t| t.created_at);
        Ok(found)
    }

    async fn withdrawals(&self, filter: &RecordFilter) -> Result<Vec<WithdrawalRequest>> {
        let ledger = self.ledger.read().await;
        let mut found: Vec<WithdrawalRequest> = ledger
            .withdrawals
            .values()
            .filter(|w| filter.matches(&w.account, &w.status.to_string()))
            .cloned()
            .collect();
        newest_first(&mut found, |w| w.created_at);
        Ok(found)
    }

    async fn buy_requests(&self, filter: &RecordFilter) -> Result<Vec<BuyRequest>> {
        let ledger = self.ledger.read().await;
        let mut found: Vec<BuyRequest> = ledger
            .buy_requests
            .values()
            .filter(|b| filter.matches(&b.account, &b.status.to_string()))
            .cloned()
            .collect();
        newest_first(&mut found, |b| b.created_at);
        Ok(found)
    }

    async fn accounts(&self) -> Result<Vec<AccountId>> {
        let ledger = self.ledger.read().await;
        let accounts: BTreeSet<AccountId> = ledger
            .transactions
            .values()
            .map(|t| t.account.clone())
            .chain(ledger.withdrawals.values().map(|w| w.account.clone()))
            .chain(ledger.buy_requests.values().map(|b| b.account.clone()))
            .collect();
        Ok(accounts.into_iter().collect())
    }

    async fn purge(&self, account: &AccountId) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        ledger.transactions.retain(|_, t| &t.account != account);
        ledger.withdrawals.retain(|_, w| &w.account != account);
        ledger.buy_requests.retain(|_, b| &b.account != account);
        *ledger.versions.entry(account.clone()).or_insert(0) += 1;
        Ok(())
    }
}

/// In-memory registry of reviewer-defined status types.
#[derive(Default, Clone)]
pub struct InMemoryStatusTypeStore {
    statuses: Arc<RwLock<Vec<StatusType>>>,
}

impl InMemoryStatusTypeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusTypeStore for InMemoryStatusTypeStore {
    async fn insert(&self, status: StatusType) -> Result<()> {
        let mut statuses = self.statuses.write().await;
        if statuses.iter().any(|s| s.id == status.id) {
            return Err(LedgerError::ValidationError(format!(
                "Duplicate status type id {}",
                status.id
            )));
        }
        statuses.push(status);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StatusType>> {
        Ok(self.statuses.read().await.clone())
    }

    async fn remove(&self, id: &RecordId) -> Result<bool> {
        let mut statuses = self.statuses.write().await;
        let before = statuses.len();
        statuses.retain(|s| &s.id != id);
        Ok(statuses.len() != before)
    }
}

/// A thread-safe in-memory store for account profiles.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, AccountProfile>>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert_new(&self, profile: AccountProfile) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&profile.id) {
            return Ok(false);
        }
        accounts.insert(profile.id.clone(), profile);
        Ok(true)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<AccountProfile>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(id).cloned())
    }

    async fn all(&self) -> Result<Vec<AccountProfile>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<AccountProfile> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn remove(&self, id: &AccountId) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.remove(id).is_some())
    }
}

/// Fresh, empty in-memory collaborators for an engine.
pub fn in_memory_stores() -> Stores {
    Stores::new(
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryStatusTypeStore::new()),
        Arc::new(InMemoryAccountStore::new()),
    )
}
