use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::DatasetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key under which the selected dataset is persisted.
pub const ACTIVE_DATASET_KEY: &str = "active_dataset";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one client-state entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStateRecord {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl ClientStateRecord {
    #[must_use]
    pub fn active_dataset(id: &DatasetId, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: ACTIVE_DATASET_KEY.to_string(),
            value: id.as_str().to_string(),
            updated_at,
        }
    }

    /// Interpret the value as a dataset identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value is blank.
    pub fn into_dataset_id(self) -> Result<DatasetId, StorageError> {
        DatasetId::parse(self.value).map_err(|err| StorageError::Serialization(err.to_string()))
    }
}

/// Durable client-side state that must survive a restart.
#[async_trait]
pub trait ClientStateRepository: Send + Sync {
    /// Fetch a raw entry by key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_entry(&self, key: &str) -> Result<Option<ClientStateRecord>, StorageError>;

    /// Insert or overwrite an entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn put_entry(&self, record: &ClientStateRecord) -> Result<(), StorageError>;

    /// Remove an entry. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_entry(&self, key: &str) -> Result<(), StorageError>;

    /// The persisted dataset selection, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures or a corrupt stored value.
    async fn active_dataset(&self) -> Result<Option<DatasetId>, StorageError> {
        self.get_entry(ACTIVE_DATASET_KEY)
            .await?
            .map(ClientStateRecord::into_dataset_id)
            .transpose()
    }

    /// Persist the dataset selection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the selection cannot be stored.
    async fn save_active_dataset(
        &self,
        id: &DatasetId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.put_entry(&ClientStateRecord::active_dataset(id, at))
            .await
    }

    /// Forget the dataset selection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn clear_active_dataset(&self) -> Result<(), StorageError> {
        self.remove_entry(ACTIVE_DATASET_KEY).await
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<String, ClientStateRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStateRepository for InMemoryRepository {
    async fn get_entry(&self, key: &str) -> Result<Option<ClientStateRecord>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_entry(&self, record: &ClientStateRecord) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn remove_entry(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub client_state: Arc<dyn ClientStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            client_state: Arc::new(InMemoryRepository::new()),
        }
    }
}
