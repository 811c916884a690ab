//! Core traits for sonarlink
//!
//! This module defines the abstract interfaces the connection service depends on.
//!
//! - [`ConnectionStore`]: Owns connection records, their identity and name uniqueness
//! - [`ConnectivityProber`]: Checks that a credential set can reach the analytics server

pub mod connection_store;
pub mod prober;

pub use connection_store::ConnectionStore;
pub use prober::{ConnectivityProber, DEFAULT_PROBE_TIMEOUT, ProbeTarget, VERSION_PATH};
