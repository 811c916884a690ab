// # File Connection Store
//
// File-based implementation of ConnectionStore with crash recovery.
//
// ## Purpose
//
// Keeps connection records across daemon restarts and crashes. Every
// successful mutation is on disk before the caller sees its result.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good document
// - Recovery: Falls back to backup if corruption detected
// - Refusal: A corrupt file with no usable backup fails the load and is
//   left on disk untouched
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "next_id": 3,
//   "connections": [
//     {
//       "id": 1,
//       "name": "sonar-prod",
//       "endpoint": "https://sonar.example.com/api/",
//       "token": "squ_...",
//       "createdAt": "2025-01-09T12:00:00Z",
//       "updatedAt": "2025-01-09T12:00:00Z"
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{Connection, ConnectionId, ConnectionPatch, NewConnection};
use crate::store::table::ConnectionTable;
use crate::traits::ConnectionStore;

/// Store file format version
/// Used for future migration if format changes
const FILE_FORMAT_VERSION: &str = "1.0";

/// File-based connection store with crash recovery
///
/// # Crash Recovery
///
/// - **Atomic writes**: New document written to temporary file, then renamed
/// - **Backup**: Last known good document kept in `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Automatic recovery**: Falls back to backup if main file corrupted
/// - **No silent reset**: Without a usable backup, loading a corrupted file
///   fails instead of starting empty
///
/// # Failed writes
///
/// Mutations are staged on a copy of the table and only committed in memory
/// once the file has been replaced. A failed write leaves both the file and
/// the in-memory records untouched.
///
/// # Example
///
/// ```rust,no_run
/// use sonarlink_core::{ConnectionStore, FileConnectionStore, NewConnection};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileConnectionStore::new("/var/lib/sonarlink/connections.json").await?;
///
///     // Insert (atomically written to disk)
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
#[derive(Debug)]
pub struct FileConnectionStore {
    path: PathBuf,
    table: Arc<RwLock<ConnectionTable>>,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    next_id: ConnectionId,
    connections: Vec<Connection>,
}

impl StoreFileFormat {
    fn from_table(table: &ConnectionTable) -> Self {
        Self {
            version: FILE_FORMAT_VERSION.to_string(),
            next_id: table.next_id(),
            connections: table.list(),
        }
    }

    fn into_table(self) -> Result<ConnectionTable, Error> {
        ConnectionTable::from_parts(self.next_id, self.connections)
    }
}

impl FileConnectionStore {
    /// Create or load a file connection store
    ///
    /// This will:
    /// 1. Try to load existing store file
    /// 2. If corruption detected, try to load from backup
    /// 3. If there is no usable backup, return `Error::Store`
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let table = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            table: Arc::new(RwLock::new(table)),
        })
    }

    /// Load the table from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main store file
    /// 2. If JSON parse error, try loading backup
    /// 3. If backup is missing or also fails, refuse to load
    async fn load_with_recovery(path: &Path) -> Result<ConnectionTable, Error> {
        let err = match Self::load(path).await {
            Ok(table) => {
                tracing::debug!("Loaded connections from file: {} records", table.len());
                return Ok(table);
            }
            Err(err @ Error::Json(_)) => err,
            // Other error (not corruption)
            Err(err) => return Err(err),
        };

        tracing::warn!(
            "Store file appears corrupted: {}. Attempting recovery from backup.",
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::error!("No backup file found for corrupted store {}", path.display());
            return Err(Error::store(format!(
                "Store file {} is corrupted and no backup exists: {}",
                path.display(),
                err
            )));
        }

        match Self::load(&backup_path).await {
            Ok(table) => {
                tracing::info!("Recovered connections from backup: {} records", table.len());

                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!("Failed to restore store file from backup: {}", restore_err);
                }

                Ok(table)
            }
            Err(backup_err) => {
                tracing::error!("Backup also corrupted: {}", backup_err);
                Err(Error::store(format!(
                    "Store file {} and its backup are both unreadable: {}; backup: {}",
                    path.display(),
                    err,
                    backup_err
                )))
            }
        }
    }

    /// Load the table from file
    ///
    /// A missing file is an empty table. Parse failures surface as
    /// `Error::Json` so the caller can tell corruption apart from I/O trouble.
    async fn load(path: &Path) -> Result<ConnectionTable, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(ConnectionTable::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read store file {}: {}", path.display(), e))
        })?;

        let document: StoreFileFormat = serde_json::from_str(&content)?;

        if document.version != FILE_FORMAT_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                FILE_FORMAT_VERSION,
                document.version
            );
        }

        document.into_table()
    }

    /// Write a table to file atomically
    ///
    /// Callers hold the write guard, so at most one write is in flight.
    async fn write_table(&self, table: &ConnectionTable) -> Result<(), Error> {
        let document = StoreFileFormat::from_table(table);
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::store(format!("Failed to serialize connections: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Connections written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore store file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored store file from backup");
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Force immediate write to disk
    pub async fn sync(&self) -> Result<(), Error> {
        let guard = self.table.write().await;
        self.write_table(&guard).await
    }
}

#[async_trait]
impl ConnectionStore for FileConnectionStore {
    async fn insert(&self, new: NewConnection) -> Result<Connection, Error> {
        let mut guard = self.table.write().await;

        let mut staged = guard.clone();
        let created = staged.insert(new)?;
        self.write_table(&staged).await?;

        *guard = staged;
        Ok(created)
    }

    async fn get(&self, id: ConnectionId) -> Result<Option<Connection>, Error> {
        let guard = self.table.read().await;
        Ok(guard.get(id))
    }

    async fn update(
        &self,
        id: ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<Option<Connection>, Error> {
        let mut guard = self.table.write().await;

        let mut staged = guard.clone();
        let Some((updated, changed)) = staged.update(id, patch)? else {
            return Ok(None);
        };

        // Nothing to persist for a patch that restates current values
        if changed {
            self.write_table(&staged).await?;
            *guard = staged;
        }
        Ok(Some(updated))
    }

    async fn remove(&self, id: ConnectionId) -> Result<Option<Connection>, Error> {
        let mut guard = self.table.write().await;

        let mut staged = guard.clone();
        let Some(removed) = staged.remove(id) else {
            return Ok(None);
        };
        self.write_table(&staged).await?;

        *guard = staged;
        Ok(Some(removed))
    }

    async fn list(&self) -> Result<Vec<Connection>, Error> {
        let guard = self.table.read().await;
        Ok(guard.list())
    }

    async fn flush(&self) -> Result<(), Error> {
        self.sync().await
    }
}
