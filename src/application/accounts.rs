use super::identity::Reviewer;
use crate::domain::account::AccountProfile;
use crate::domain::ids::AccountId;
use crate::domain::ports::{AccountStoreRef, LedgerStoreRef};
use crate::error::{LedgerError, Result};
use tracing::info;

/// Registration and removal of account holders.
pub struct AccountDirectory {
    accounts: AccountStoreRef,
    ledger: LedgerStoreRef,
}

impl AccountDirectory {
    pub fn new(accounts: AccountStoreRef, ledger: LedgerStoreRef) -> Self {
        Self { accounts, ledger }
    }

    /// Creates a profile with a freshly generated deposit wallet code.
    ///
    /// An id that is already registered keeps its existing profile.
    pub async fn register(
        &self,
        account: &AccountId,
        email: &str,
        full_name: &str,
    ) -> Result<AccountProfile> {
        let profile = AccountProfile::new(account.clone(), email, full_name)?;
        if !self.accounts.insert_new(profile.clone()).await? {
            return Err(LedgerError::ValidationError(format!(
                "Account {} is already registered",
                account
            )));
        }
        info!(%account, "Account registered");
        Ok(profile)
    }

    pub async fn profile(&self, account: &AccountId) -> Result<AccountProfile> {
        self.accounts
            .get(account)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Account {}", account)))
    }

    pub async fn list(&self) -> Result<Vec<AccountProfile>> {
        self.accounts.all().await
    }

    /// Deletes the profile and every ledger record of the account.
    pub async fn purge(&self, reviewer: &Reviewer, account: &AccountId) -> Result<()> {
        self.ledger.purge(account).await?;
        self.accounts.remove(account).await?;
        info!(%reviewer, %account, "Account purged");
        Ok(())
    }
}
