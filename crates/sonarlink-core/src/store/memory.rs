// # Memory Connection Store
//
// In-memory implementation of ConnectionStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing, embedding, and hosts that supply their own persistence
// around the service.
//
// ## Crash Behavior
//
// - All records are lost on restart/crash
// - Identities start again at 1 after a restart

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{Connection, ConnectionId, ConnectionPatch, NewConnection};
use crate::store::table::ConnectionTable;
use crate::traits::ConnectionStore;

/// In-memory connection store implementation
///
/// This implementation stores all records in a table protected by a RwLock.
/// The uniqueness check and the insert run under one write guard.
///
/// # Example
///
/// ```rust,no_run
/// use sonarlink_core::{ConnectionStore, MemoryConnectionStore, NewConnection};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryConnectionStore::new();
///
///     let created = store
///         .insert(NewConnection::new("sonar", "http://localhost:9000/api/", "squ_1"))
///         .await?;
///
///     let fetched = store.get(created.id).await?;
///     assert_eq!(fetched, Some(created));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryConnectionStore {
    inner: Arc<RwLock<ConnectionTable>>,
}

impl MemoryConnectionStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConnectionTable::new())),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.len() == 0
    }
}

impl Default for MemoryConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn insert(&self, new: NewConnection) -> Result<Connection, Error> {
        let mut guard = self.inner.write().await;
        guard.insert(new)
    }

    async fn get(&self, id: ConnectionId) -> Result<Option<Connection>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(id))
    }

    async fn update(
        &self,
        id: ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<Option<Connection>, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.update(id, patch)?.map(|(connection, _)| connection))
    }

    async fn remove(&self, id: ConnectionId) -> Result<Option<Connection>, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(id))
    }

    async fn list(&self) -> Result<Vec<Connection>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.list())
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}
