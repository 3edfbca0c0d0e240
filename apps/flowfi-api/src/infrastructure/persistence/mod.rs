//! Persistence Adapters
//!
//! Storage implementations of `StreamRepository` and the per-mode store pair.

mod in_memory;

use std::sync::Arc;

pub use in_memory::InMemoryStreamRepository;

use crate::application::ports::StreamRepository;
use crate::domain::sandbox::DataMode;

/// Production and sandbox repositories, selected per request by `DataMode`.
///
/// The two stores are fully independent: a record saved in one is never
/// visible through the other.
#[derive(Debug)]
pub struct StreamStores<R: StreamRepository> {
    production: Arc<R>,
    sandbox: Arc<R>,
}

impl<R: StreamRepository> Clone for StreamStores<R> {
    fn clone(&self) -> Self {
        Self {
            production: Arc::clone(&self.production),
            sandbox: Arc::clone(&self.sandbox),
        }
    }
}

impl<R: StreamRepository> StreamStores<R> {
    /// Create a store pair.
    pub const fn new(production: Arc<R>, sandbox: Arc<R>) -> Self {
        Self {
            production,
            sandbox,
        }
    }

    /// Get the repository for `mode`.
    #[must_use]
    pub const fn for_mode(&self, mode: DataMode) -> &Arc<R> {
        match mode {
            DataMode::Production => &self.production,
            DataMode::Sandbox => &self.sandbox,
        }
    }
}

impl StreamStores<InMemoryStreamRepository> {
    /// Create a pair of empty in-memory repositories.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStreamRepository::new()),
            Arc::new(InMemoryStreamRepository::new()),
        )
    }
}
