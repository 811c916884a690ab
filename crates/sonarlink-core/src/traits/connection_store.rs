// # Connection Store Trait
//
// Defines the interface for the connection record store.
//
// ## Purpose
//
// The store is the single owner of every connection record. It is responsible
// for:
// - Assigning identities on insert
// - Keeping connection names unique at all times
// - Applying partial updates atomically
//
// Callers only ever receive clones of stored records.
//
// ## Implementations
//
// - Memory: `MemoryConnectionStore`
// - File-based: `FileConnectionStore` (JSON document with crash recovery)
//
// ## Usage
//
// ```rust,ignore
// use sonarlink_core::{ConnectionStore, NewConnection};
//
// let store = /* ConnectionStore implementation */;
// let created = store
//     .insert(NewConnection::new("sonar", "http://localhost:9000/api/", "squ_1"))
//     .await?;
// let fetched = store.get(created.id).await?;
// ```

use async_trait::async_trait;

use crate::model::{Connection, ConnectionId, ConnectionPatch, NewConnection};

/// Trait for connection store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Atomicity
///
/// `insert` and `update` must check name uniqueness and write the record as one
/// step with respect to other mutations on the same store. Two concurrent
/// inserts with the same name must never both succeed.
///
/// A failed `insert` or `update` must leave the store exactly as it was.
///
/// # Payloads
///
/// Stores receive payloads that the service has already validated and do not
/// re-validate them.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert a new connection
    ///
    /// # Returns
    ///
    /// - `Ok(Connection)`: The stored record with its assigned identity
    /// - `Err(Error::Conflict)`: Another connection already uses the name
    /// - `Err(Error)`: Storage error
    async fn insert(&self, new: NewConnection) -> Result<Connection, crate::Error>;

    /// Get a connection by identity
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Connection))`: The stored record
    /// - `Ok(None)`: No connection with this identity
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: ConnectionId) -> Result<Option<Connection>, crate::Error>;

    /// Merge a partial update into an existing connection
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Connection))`: The record after the merge
    /// - `Ok(None)`: No connection with this identity
    /// - `Err(Error::Conflict)`: The new name belongs to another connection
    /// - `Err(Error)`: Storage error
    async fn update(
        &self,
        id: ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<Option<Connection>, crate::Error>;

    /// Remove a connection
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Connection))`: The removed record
    /// - `Ok(None)`: No connection with this identity
    /// - `Err(Error)`: Storage error
    async fn remove(&self, id: ConnectionId) -> Result<Option<Connection>, crate::Error>;

    /// List all connections, ordered by identity
    async fn list(&self) -> Result<Vec<Connection>, crate::Error>;

    /// Persist any pending changes
    ///
    /// Some implementations may buffer writes. This ensures all changes are
    /// flushed to persistent storage.
    async fn flush(&self) -> Result<(), crate::Error>;
}
