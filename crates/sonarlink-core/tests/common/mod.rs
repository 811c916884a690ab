//! Test doubles and common utilities for connection contract tests
//!
//! This module provides minimal test doubles that count how often the
//! service reaches its collaborators.

#![allow(dead_code)]

use sonarlink_core::error::{Error, Result};
use sonarlink_core::model::{Connection, ConnectionId, ConnectionPatch, NewConnection};
use sonarlink_core::traits::{ConnectionStore, ConnectivityProber, ProbeTarget};
use sonarlink_core::{ConnectionService, MemoryConnectionStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome a [`ScriptedProber`] reports for every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Upstream answered 200
    Reachable,
    /// Upstream answered with this status
    Status(u16),
    /// Upstream could not be reached
    Unreachable,
}

/// A prober that reports a fixed outcome and tracks calls
pub struct ScriptedProber {
    outcome: ProbeOutcome,
    /// Call counter for probe()
    probe_call_count: Arc<AtomicUsize>,
    /// Version URLs seen by probe()
    probed_urls: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ScriptedProber {
    pub fn new(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            probe_call_count: Arc::new(AtomicUsize::new(0)),
            probed_urls: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Get the number of times probe() was called
    pub fn probe_call_count(&self) -> usize {
        self.probe_call_count.load(Ordering::SeqCst)
    }

    /// Get the version URLs that were probed
    pub fn probed_urls(&self) -> Vec<String> {
        self.probed_urls.lock().unwrap().clone()
    }

    /// Create a new ScriptedProber that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            outcome: other.outcome,
            probe_call_count: Arc::clone(&other.probe_call_count),
            probed_urls: Arc::clone(&other.probed_urls),
        }
    }
}

#[async_trait::async_trait]
impl ConnectivityProber for ScriptedProber {
    async fn probe(&self, target: &ProbeTarget) -> Result<()> {
        self.probe_call_count.fetch_add(1, Ordering::SeqCst);
        self.probed_urls
            .lock()
            .unwrap()
            .push(target.version_url()?.to_string());

        match self.outcome {
            ProbeOutcome::Reachable => Ok(()),
            ProbeOutcome::Status(status) => Err(Error::unexpected_status(status)),
            ProbeOutcome::Unreachable => Err(Error::connectivity("connection refused")),
        }
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// A store wrapper that tracks calls into a real memory store
pub struct CountingStore {
    inner: MemoryConnectionStore,
    /// Call counter for insert(), update() and remove()
    write_call_count: Arc<AtomicUsize>,
    /// Call counter for get() and list()
    read_call_count: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryConnectionStore::new(),
            write_call_count: Arc::new(AtomicUsize::new(0)),
            read_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of mutating calls
    pub fn write_call_count(&self) -> usize {
        self.write_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of reading calls
    pub fn read_call_count(&self) -> usize {
        self.read_call_count.load(Ordering::SeqCst)
    }

    /// Create a new CountingStore that shares records and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            write_call_count: Arc::clone(&other.write_call_count),
            read_call_count: Arc::clone(&other.read_call_count),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionStore for CountingStore {
    async fn insert(&self, new: NewConnection) -> Result<Connection> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(new).await
    }

    async fn get(&self, id: ConnectionId) -> Result<Option<Connection>> {
        self.read_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn update(&self, id: ConnectionId, patch: &ConnectionPatch) -> Result<Option<Connection>> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, patch).await
    }

    async fn remove(&self, id: ConnectionId) -> Result<Option<Connection>> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(id).await
    }

    async fn list(&self) -> Result<Vec<Connection>> {
        self.read_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.list().await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

/// Build a service over counting doubles, returning handles that share their counters
pub fn counted_service(outcome: ProbeOutcome) -> (ConnectionService, CountingStore, ScriptedProber) {
    let store = CountingStore::new();
    let prober = ScriptedProber::new(outcome);

    let service = ConnectionService::new(
        Arc::new(CountingStore::sharing_counters_with(&store)),
        Arc::new(ScriptedProber::sharing_counters_with(&prober)),
    );

    (service, store, prober)
}

/// Helper to create a valid creation payload
pub fn new_connection(name: &str) -> NewConnection {
    NewConnection::new(name, "http://localhost:9000/api/", "squ_test_token")
}
