//! Connection service
//!
//! The ConnectionService is responsible for:
//! - Validating every payload before it goes anywhere
//! - Creating, patching, deleting and reading connection records
//! - Running the live connectivity check against an analytics server
//!
//! ## Architecture
//!
//! ```text
//!                       ┌───────────────────┐
//!    payload ─────────► │ ConnectionService │
//!                       └───────────────────┘
//!                                 │
//!               ┌─────────────────┴─────────────────┐
//!               │                                   │
//!               ▼                                   ▼
//!      ┌─────────────────┐                ┌────────────────────┐
//!      │ ConnectionStore │                │ ConnectivityProber │
//!      │ (records)       │                │ (server/version)   │
//!      └─────────────────┘                └────────────────────┘
//! ```
//!
//! The probe path never touches the store, and the record path never touches
//! the network.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Connection, ConnectionId, ConnectionPatch, NewConnection, TestConnectionRequest};
use crate::traits::{ConnectionStore, ConnectivityProber, ProbeTarget};
use crate::validation;

/// Orchestrates validation, storage and probing of connections
///
/// Cheap to clone; clones share the same store and prober.
#[derive(Clone)]
pub struct ConnectionService {
    store: Arc<dyn ConnectionStore>,
    prober: Arc<dyn ConnectivityProber>,
}

impl ConnectionService {
    /// Create a service over an injected store and prober
    pub fn new(store: Arc<dyn ConnectionStore>, prober: Arc<dyn ConnectivityProber>) -> Self {
        Self { store, prober }
    }

    /// Check that the given credentials can reach the analytics server
    ///
    /// Stateless: nothing is read from or written to the store.
    ///
    /// # Errors
    ///
    /// - validation errors if the request is invalid (the prober is not called)
    /// - [`Error::Connectivity`] if the server cannot be reached
    /// - [`Error::UnexpectedStatus`] if it answers with anything but 200
    pub async fn test_connection(&self, request: TestConnectionRequest) -> Result<()> {
        let request = validation::check(request)?;
        let target = ProbeTarget::from_request(&request)?;
        self.probe(&target).await
    }

    /// Run the connectivity check with the credentials of a stored connection
    pub async fn test_stored_connection(&self, id: ConnectionId) -> Result<()> {
        let connection = self.get(id).await?;
        let target = ProbeTarget::from_request(&connection.to_test_request())?;
        self.probe(&target).await
    }

    async fn probe(&self, target: &ProbeTarget) -> Result<()> {
        debug!(
            "Probing {} via {} prober",
            target.endpoint(),
            self.prober.prober_name()
        );

        match self.prober.probe(target).await {
            Ok(()) => {
                info!("Connectivity check passed for {}", target.endpoint());
                Ok(())
            }
            Err(e) => {
                info!("Connectivity check failed for {}: {}", target.endpoint(), e);
                Err(e)
            }
        }
    }

    /// Create a connection
    ///
    /// # Errors
    ///
    /// - validation errors if the payload is invalid (the store is not called)
    /// - [`Error::Conflict`] if the name is already taken
    pub async fn create(&self, new: NewConnection) -> Result<Connection> {
        let new = validation::check(new)?;
        let created = self.store.insert(new).await?;
        info!("Created connection {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Merge a partial update into an existing connection
    ///
    /// An empty patch returns the record unchanged.
    pub async fn patch(&self, id: ConnectionId, patch: ConnectionPatch) -> Result<Connection> {
        let patch = validation::check(patch)?;

        if patch.is_empty() {
            debug!("Empty patch for connection {}", id);
            return self.get(id).await;
        }

        match self.store.update(id, &patch).await {
            Ok(Some(updated)) => {
                info!("Patched connection {} ({})", updated.id, updated.name);
                Ok(updated)
            }
            Ok(None) => Err(not_found(id)),
            Err(e) => {
                if !matches!(e, Error::Conflict(_)) {
                    warn!("Failed to patch connection {}: {}", id, e);
                }
                Err(e)
            }
        }
    }

    /// Delete a connection, returning the removed record
    pub async fn delete(&self, id: ConnectionId) -> Result<Connection> {
        let removed = self.store.remove(id).await?.ok_or_else(|| not_found(id))?;
        info!("Deleted connection {} ({})", removed.id, removed.name);
        Ok(removed)
    }

    /// Get a connection by identity
    pub async fn get(&self, id: ConnectionId) -> Result<Connection> {
        debug!("Fetching connection {}", id);
        self.store.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// All connections, ordered by identity
    pub async fn list(&self) -> Result<Vec<Connection>> {
        let connections = self.store.list().await?;
        debug!("Listed {} connections", connections.len());
        Ok(connections)
    }
}

fn not_found(id: ConnectionId) -> Error {
    Error::not_found(format!("connection {}", id))
}
