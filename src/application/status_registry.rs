use super::identity::Reviewer;
use crate::domain::ids::RecordId;
use crate::domain::ports::StatusTypeStoreRef;
use crate::domain::status::{StatusType, TransactionStatus, WithdrawalStatus};
use crate::error::{LedgerError, Result};
use tracing::info;

/// Reviewer-extensible status vocabulary.
///
/// Entries are advisory: records are never validated against the registry,
/// and deleting an entry leaves records that carry the label untouched.
pub struct StatusRegistry {
    store: StatusTypeStoreRef,
}

impl StatusRegistry {
    pub fn new(store: StatusTypeStoreRef) -> Self {
        Self { store }
    }

    /// Adds a label. Names are not deduplicated.
    pub async fn create(&self, reviewer: &Reviewer, name: &str) -> Result<StatusType> {
        let status = StatusType::new(RecordId::generate(), name)?;
        self.store.insert(status.clone()).await?;
        info!(%reviewer, id = %status.id, name = %status.name, "Status type created");
        Ok(status)
    }

    pub async fn list(&self) -> Result<Vec<StatusType>> {
        self.store.all().await
    }

    pub async fn delete(&self, reviewer: &Reviewer, id: &RecordId) -> Result<()> {
        if !self.store.remove(id).await? {
            return Err(LedgerError::NotFound(format!("Status type {}", id)));
        }
        info!(%reviewer, %id, "Status type deleted");
        Ok(())
    }

    /// Built-in transaction statuses followed by every custom label.
    pub async fn transaction_vocabulary(&self) -> Result<Vec<TransactionStatus>> {
        let mut vocabulary = TransactionStatus::builtins().to_vec();
        for status in self.store.all().await? {
            let status = TransactionStatus::from(status.name);
            if !vocabulary.contains(&status) {
                vocabulary.push(status);
            }
        }
        Ok(vocabulary)
    }

    /// Built-in withdrawal statuses followed by every custom label.
    pub async fn withdrawal_vocabulary(&self) -> Result<Vec<WithdrawalStatus>> {
        let mut vocabulary = WithdrawalStatus::builtins().to_vec();
        for status in self.store.all().await? {
            let status = WithdrawalStatus::from(status.name);
            if !vocabulary.contains(&status) {
                vocabulary.push(status);
            }
        }
        Ok(vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryStatusTypeStore;
    use std::sync::Arc;

    fn registry() -> StatusRegistry {
        StatusRegistry::new(Arc::new(InMemoryStatusTypeStore::new()))
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let registry = registry();
        let reviewer = Reviewer::new("ops");

        let hold = registry.create(&reviewer, " On Hold ").await.unwrap();
        assert_eq!(hold.name, "On Hold");
        assert_eq!(registry.list().await.unwrap(), vec![hold.clone()]);

        registry.delete(&reviewer, &hold.id).await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());
        assert!(matches!(
            registry.delete(&reviewer, &hold.id).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let result = registry().create(&Reviewer::new("ops"), "   ").await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_vocabularies_start_with_builtins() {
        let registry = registry();
        let reviewer = Reviewer::new("ops");
        registry.create(&reviewer, "Under Review").await.unwrap();
        registry.create(&reviewer, "Complete").await.unwrap();

        assert_eq!(
            registry.transaction_vocabulary().await.unwrap(),
            vec![
                TransactionStatus::Pending,
                TransactionStatus::Complete,
                TransactionStatus::Custom("Under Review".to_string()),
            ]
        );
        assert_eq!(
            registry.withdrawal_vocabulary().await.unwrap(),
            vec![
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved,
                WithdrawalStatus::Rejected,
                WithdrawalStatus::Custom("Under Review".to_string()),
                WithdrawalStatus::Custom("Complete".to_string()),
            ]
        );
    }
}
