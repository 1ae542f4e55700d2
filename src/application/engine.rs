use super::accounts::AccountDirectory;
use super::ledger::LedgerService;
use super::settlement::BuySettlement;
use super::status_registry::StatusRegistry;
use super::withdrawals::WithdrawalDesk;
use crate::config::EngineConfig;
use crate::domain::ids::AccountId;
use crate::domain::ledger::BalanceSheet;
use crate::domain::ports::{PayloadCipherRef, Stores};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The main entry point of the custody core.
///
/// `CustodyEngine` wires every service to the same stores. It holds no state
/// of its own besides those handles, so it can be shared across concurrent
/// request handlers behind an `Arc`.
pub struct CustodyEngine {
    ledger: LedgerService,
    withdrawals: WithdrawalDesk,
    settlement: BuySettlement,
    statuses: StatusRegistry,
    directory: AccountDirectory,
}

impl CustodyEngine {
    /// Creates an engine whose token codec follows `config`.
    pub fn new(stores: Stores, config: &EngineConfig) -> Self {
        Self::with_cipher(stores, Arc::new(config.codec()), config)
    }

    /// Creates an engine with a caller-supplied payload cipher.
    pub fn with_cipher(stores: Stores, cipher: PayloadCipherRef, config: &EngineConfig) -> Self {
        let Stores {
            ledger,
            statuses,
            accounts,
        } = stores;
        Self {
            ledger: LedgerService::new(ledger.clone(), config.retry, config.recent_limit),
            withdrawals: WithdrawalDesk::new(ledger.clone(), cipher, config.retry),
            settlement: BuySettlement::new(ledger.clone(), config.retry),
            statuses: StatusRegistry::new(statuses),
            directory: AccountDirectory::new(accounts, ledger),
        }
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn withdrawals(&self) -> &WithdrawalDesk {
        &self.withdrawals
    }

    pub fn settlement(&self) -> &BuySettlement {
        &self.settlement
    }

    pub fn statuses(&self) -> &StatusRegistry {
        &self.statuses
    }

    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    /// Derived balances of every known account, ordered by account id.
    ///
    /// Registered accounts without ledger records are reported with a zero
    /// balance.
    pub async fn balances(&self) -> Result<Vec<(AccountId, BalanceSheet)>> {
        let mut balances: BTreeMap<AccountId, BalanceSheet> = self
            .directory
            .list()
            .await?
            .into_iter()
            .map(|profile| (profile.id, BalanceSheet::default()))
            .collect();
        balances.extend(self.ledger.balances().await?);
        Ok(balances.into_iter().collect())
    }
}
