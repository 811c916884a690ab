// # sonarlink-core
//
// Core library for managing analytics-server connections.
//
// ## Architecture Overview
//
// This library provides the connection record lifecycle and the live
// connectivity check used to decide whether a credential set is usable:
// - **ConnectionStore**: Trait for the record store (identity + name uniqueness)
// - **ConnectivityProber**: Trait for the bounded-time reachability check
// - **validation**: Single parse-and-validate step for incoming payloads
// - **ConnectionService**: Orchestrates validation, storage and probing
//
// ## Design Principles
//
// 1. **Injected collaborators**: The service owns `Arc`s to its store and prober,
//    there is no process-global state
// 2. **Validate first**: No payload reaches a store or the network unvalidated
// 3. **No partial writes**: A failed create or patch leaves the store untouched
// 4. **Library-First**: The daemon is a thin HTTP shell over this crate

pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod store;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use config::{ServerConfig, SonarlinkConfig, StoreConfig};
pub use error::{Error, Result};
pub use model::{Connection, ConnectionId, ConnectionPatch, NewConnection, TestConnectionRequest};
pub use service::ConnectionService;
pub use store::{FileConnectionStore, MemoryConnectionStore};
pub use traits::{ConnectionStore, ConnectivityProber, ProbeTarget};
