//! In-memory object storage backend.
//!
//! Used as the `memory` backend in config files and as the storage of
//! choice in tests.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{ObjStorage, ObjectId, Result, StorageError};

/// An object storage keeping all objects in a process-local map.
///
/// Cloning the storage yields a handle to the same underlying state,
/// so a test can hold a reference while the replayer owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjStorage {
    state: Arc<RwLock<HashMap<ObjectId, Vec<u8>>>>,
}

impl InMemoryObjStorage {
    /// Create an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    /// Check whether the storage holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Remove an object, returning whether it was present.
    ///
    /// Only used by tests to simulate missing source objects.
    pub async fn remove(&self, id: &ObjectId) -> bool {
        self.state.write().await.remove(id).is_some()
    }
}

#[async_trait::async_trait]
impl ObjStorage for InMemoryObjStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.state
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StorageError::NotFound { id: *id })
    }

    async fn add(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        debug!("storing {} ({} bytes)", id, data.len());
        self.state.write().await.insert(*id, data.to_vec());
        Ok(())
    }

    async fn contains(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.state.read().await.contains_key(id))
    }
}
