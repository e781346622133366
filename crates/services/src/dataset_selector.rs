use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use quiz_core::model::{DEFAULT_CALL_TIMEOUT, DatasetId, Subject};
use quiz_core::Clock;
use storage::repository::ClientStateRepository;

use crate::collaborators::{RequestScope, SetRegistry, call_within};
use crate::error::SelectorError;

/// Owns the active dataset: the ambient scope of every collaborator call.
///
/// The selection is process-wide and outlives sessions. Changing it never
/// touches a session that is already loaded.
pub struct DataSetSelector {
    registry: Arc<dyn SetRegistry>,
    client_state: Arc<dyn ClientStateRepository>,
    clock: Clock,
    call_timeout: Duration,
    active: RwLock<Option<DatasetId>>,
}

impl DataSetSelector {
    #[must_use]
    pub fn new(
        registry: Arc<dyn SetRegistry>,
        client_state: Arc<dyn ClientStateRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            registry,
            client_state,
            clock,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            active: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = limit;
        self
    }

    /// Load the persisted selection, typically once at startup.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::Storage` if the stored value cannot be read.
    pub async fn restore(&self) -> Result<Option<DatasetId>, SelectorError> {
        let stored = self.client_state.active_dataset().await?;
        if let Some(id) = &stored {
            tracing::debug!(dataset = %id, "restored dataset selection");
        }
        self.set_active(stored.clone());
        Ok(stored)
    }

    /// Datasets offered by the registry, in registry order.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::Registry` if the registry is unreachable.
    pub async fn list(&self) -> Result<Vec<DatasetId>, SelectorError> {
        let sets = call_within(self.call_timeout, self.registry.list()).await?;
        tracing::debug!(count = sets.len(), "listed datasets");
        Ok(sets)
    }

    /// Make `id` the active dataset and persist it.
    ///
    /// The in-memory selection only changes once the write succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::Storage` if the selection cannot be persisted.
    pub async fn select(&self, id: DatasetId) -> Result<(), SelectorError> {
        self.client_state
            .save_active_dataset(&id, self.clock.now())
            .await?;
        tracing::info!(dataset = %id, "dataset selected");
        self.set_active(Some(id));
        Ok(())
    }

    /// Parse `name` and select it.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::InvalidId` for a blank name, otherwise as `select`.
    pub async fn select_by_name(&self, name: &str) -> Result<DatasetId, SelectorError> {
        let id = DatasetId::parse(name)?;
        self.select(id.clone()).await?;
        Ok(id)
    }

    /// Drop the selection, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::Storage` if the persisted key cannot be removed.
    pub async fn clear(&self) -> Result<(), SelectorError> {
        self.client_state.clear_active_dataset().await?;
        tracing::info!("dataset selection cleared");
        self.set_active(None);
        Ok(())
    }

    #[must_use]
    pub fn active(&self) -> Option<DatasetId> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scope for a new request under the current selection.
    #[must_use]
    pub fn scope(&self, subject: Subject) -> Option<RequestScope> {
        self.active().map(|dataset| RequestScope::new(dataset, subject))
    }

    fn set_active(&self, id: Option<DatasetId>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;
    use quiz_core::time::fixed_now;
    use storage::repository::{ClientStateRecord, InMemoryRepository, StorageError};

    struct FixedRegistry(Vec<&'static str>);

    #[async_trait]
    impl SetRegistry for FixedRegistry {
        async fn list(&self) -> Result<Vec<DatasetId>, CollaboratorError> {
            Ok(self
                .0
                .iter()
                .map(|name| DatasetId::parse(*name).unwrap())
                .collect())
        }
    }

    struct ReadOnlyState;

    #[async_trait]
    impl ClientStateRepository for ReadOnlyState {
        async fn get_entry(&self, _key: &str) -> Result<Option<ClientStateRecord>, StorageError> {
            Ok(None)
        }

        async fn put_entry(&self, _record: &ClientStateRecord) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }

        async fn remove_entry(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }
    }

    fn selector(state: Arc<dyn ClientStateRepository>) -> DataSetSelector {
        DataSetSelector::new(
            Arc::new(FixedRegistry(vec!["AI_prob.db", "Python_prob.db"])),
            state,
            Clock::fixed(fixed_now()),
        )
    }

    #[tokio::test]
    async fn list_keeps_registry_order() {
        let selector = selector(Arc::new(InMemoryRepository::new()));
        let names: Vec<String> = selector
            .list()
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["AI_prob.db", "Python_prob.db"]);
    }

    #[tokio::test]
    async fn selection_is_persisted_and_restored() {
        let state = Arc::new(InMemoryRepository::new());
        let first = selector(state.clone());
        assert_eq!(first.restore().await.unwrap(), None);

        first.select_by_name("Python_prob.db").await.unwrap();
        let scope = first.scope(Subject::all()).unwrap();
        assert_eq!(scope.dataset.as_str(), "Python_prob.db");

        let restarted = selector(state);
        assert_eq!(restarted.active(), None);
        let restored = restarted.restore().await.unwrap();
        assert_eq!(restored, DatasetId::parse("Python_prob.db").ok());
        assert_eq!(restarted.active(), restored);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_selection() {
        let selector = selector(Arc::new(ReadOnlyState));
        let err = selector
            .select(DatasetId::parse("AI_prob.db").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectorError::Storage(_)));
        assert_eq!(selector.active(), None);
        assert!(selector.scope(Subject::all()).is_none());
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let selector = selector(Arc::new(InMemoryRepository::new()));
        let err = selector.select_by_name("  ").await.unwrap_err();
        assert!(matches!(err, SelectorError::InvalidId(_)));
    }

    #[tokio::test]
    async fn clear_forgets_selection() {
        let state = Arc::new(InMemoryRepository::new());
        let selector = selector(state.clone());
        selector.select_by_name("AI_prob.db").await.unwrap();
        selector.clear().await.unwrap();

        assert_eq!(selector.active(), None);
        assert_eq!(state.active_dataset().await.unwrap(), None);
    }
}
