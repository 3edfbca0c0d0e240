//! In-memory stream repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{RepositoryError, StreamRepository};
use crate::domain::stream::StreamIntentRecord;

/// In-memory implementation of `StreamRepository`.
///
/// Records live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryStreamRepository {
    streams: RwLock<HashMap<String, StreamIntentRecord>>,
}

impl InMemoryStreamRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }
}

#[async_trait]
impl StreamRepository for InMemoryStreamRepository {
    async fn save(&self, record: &StreamIntentRecord) -> Result<(), RepositoryError> {
        let mut streams = self.streams.write();
        if streams.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate(record.id.clone()));
        }
        streams.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StreamIntentRecord>, RepositoryError> {
        Ok(self.streams.read().get(id).cloned())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.len())
    }
}
