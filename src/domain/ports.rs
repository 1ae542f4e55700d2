use super::account::AccountProfile;
use super::buy_request::BuyRequest;
use super::ids::{AccountId, RecordId};
use super::ledger::{LedgerSnapshot, LedgerWrite, RecordFilter};
use super::payment::{PaymentDetails, SealedPayload};
use super::status::StatusType;
use super::transaction::Transaction;
use super::withdrawal::WithdrawalRequest;
use crate::error::{DecryptError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable store of transactions, withdrawal requests and buy requests.
///
/// `commit` is the only write path for ledger records and is the atomic unit
/// every balance-sensitive operation runs in.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Reads every record of `account` together with its current version.
    async fn snapshot(&self, account: &AccountId) -> Result<LedgerSnapshot>;

    /// Applies all `writes` or none of them.
    ///
    /// Fails with `LedgerError::Conflict` if the account's version is no longer
    /// `expected_version`, and with `LedgerError::ValidationError` if a write
    /// targets another account, inserts an existing id or updates a missing one.
    async fn commit(
        &self,
        account: &AccountId,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<()>;

    async fn find_transaction(&self, id: &RecordId) -> Result<Option<Transaction>>;
    async fn find_withdrawal(&self, id: &RecordId) -> Result<Option<WithdrawalRequest>>;
    async fn find_buy_request(&self, id: &RecordId) -> Result<Option<BuyRequest>>;

    /// Listings are ordered newest first.
    async fn transactions(&self, filter: &RecordFilter) -> Result<Vec<Transaction>>;
    async fn withdrawals(&self, filter: &RecordFilter) -> Result<Vec<WithdrawalRequest>>;
    async fn buy_requests(&self, filter: &RecordFilter) -> Result<Vec<BuyRequest>>;

    /// Every account owning at least one ledger record.
    async fn accounts(&self) -> Result<Vec<AccountId>>;

    /// Deletes every ledger record of `account` in one step.
    async fn purge(&self, account: &AccountId) -> Result<()>;
}

#[async_trait]
pub trait StatusTypeStore: Send + Sync {
    async fn insert(&self, status: StatusType) -> Result<()>;
    async fn all(&self) -> Result<Vec<StatusType>>;
    async fn remove(&self, id: &RecordId) -> Result<bool>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Stores `profile` unless its id is already taken. Returns whether it was stored.
    async fn insert_new(&self, profile: AccountProfile) -> Result<bool>;
    async fn get(&self, id: &AccountId) -> Result<Option<AccountProfile>>;
    async fn all(&self) -> Result<Vec<AccountProfile>>;
    async fn remove(&self, id: &AccountId) -> Result<bool>;
}

/// Turns payment details into an opaque token and back.
pub trait PayloadCipher: Send + Sync {
    fn seal(&self, details: &PaymentDetails) -> Result<SealedPayload>;
    fn open(&self, token: &SealedPayload) -> std::result::Result<PaymentDetails, DecryptError>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type StatusTypeStoreRef = Arc<dyn StatusTypeStore>;
pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type PayloadCipherRef = Arc<dyn PayloadCipher>;

/// The persistence collaborators an engine is built from.
#[derive(Clone)]
pub struct Stores {
    pub ledger: LedgerStoreRef,
    pub statuses: StatusTypeStoreRef,
    pub accounts: AccountStoreRef,
}

impl Stores {
    pub fn new(
        ledger: LedgerStoreRef,
        statuses: StatusTypeStoreRef,
        accounts: AccountStoreRef,
    ) -> Self {
        Self {
            ledger,
            statuses,
            accounts,
        }
    }

    /// Uses one backend for every collaborator (e.g. a single database handle).
    pub fn shared<S>(store: S) -> Self
    where
        S: LedgerStore + StatusTypeStore + AccountStore + Clone + 'static,
    {
        Self {
            ledger: Arc::new(store.clone()),
            statuses: Arc::new(store.clone()),
            accounts: Arc::new(store),
        }
    }
}
