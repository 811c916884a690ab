// # Connection Store Implementations
//
// This module provides implementations of the ConnectionStore trait for
// different persistence strategies, and `open` to build one from config.

pub mod file;
pub mod memory;
mod table;

pub use file::FileConnectionStore;
pub use memory::MemoryConnectionStore;

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::traits::ConnectionStore;

/// Build the connection store described by `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn ConnectionStore>> {
    config.validate()?;

    let store: Arc<dyn ConnectionStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryConnectionStore::new()),
        StoreConfig::File { path } => Arc::new(FileConnectionStore::new(path).await?),
    };

    tracing::info!("Opened {} connection store", config.type_name());
    Ok(store)
}
