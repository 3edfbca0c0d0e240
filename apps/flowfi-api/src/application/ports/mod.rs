//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `StreamRepository`: Storage for recorded stream intents

use async_trait::async_trait;

use crate::domain::stream::StreamIntentRecord;

/// Repository errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    /// The backing store is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A record with this id already exists.
    #[error("stream {0} already exists")]
    Duplicate(String),
}

/// Port for stream intent persistence.
#[async_trait]
pub trait StreamRepository: Send + Sync {
    /// Save a new stream intent.
    async fn save(&self, record: &StreamIntentRecord) -> Result<(), RepositoryError>;

    /// Find a stream intent by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<StreamIntentRecord>, RepositoryError>;

    /// Count stored stream intents.
    async fn count(&self) -> Result<usize, RepositoryError>;
}
