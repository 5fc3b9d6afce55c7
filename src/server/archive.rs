//! Reloadable handle on the archive database

use crate::resource::Resource;
use crate::storage::{SqliteStore, StoreError, StoreResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// The store the server reads from, swappable while serving
///
/// Requests take a clone of the current store; a reload swaps in a freshly
/// opened one and in-flight lookups finish against the old handle.
pub struct ArchiveHandle {
    db: PathBuf,
    bucket: String,
    store: RwLock<Arc<SqliteStore>>,
}

impl ArchiveHandle {
    /// Opens the archive read-only
    pub fn open(db: &Path, bucket: &str) -> StoreResult<Self> {
        let store = SqliteStore::open_read_only(db, bucket)?;
        tracing::info!(db = %db.display(), bucket, "Archive opened");

        Ok(Self {
            db: db.to_path_buf(),
            bucket: bucket.to_string(),
            store: RwLock::new(Arc::new(store)),
        })
    }

    /// Reopens the database, replacing the current handle
    ///
    /// On failure the previous handle stays in place.
    pub fn reload(&self) -> StoreResult<()> {
        let fresh = Arc::new(SqliteStore::open_read_only(&self.db, &self.bucket)?);
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        tracing::info!(db = %self.db.display(), "Archive reloaded");
        Ok(())
    }

    pub fn current(&self) -> Arc<SqliteStore> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Looks up a resource by storage key
    ///
    /// The query runs on the blocking thread pool.
    pub async fn lookup(&self, key: String) -> StoreResult<Option<Resource>> {
        let store = self.current();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| StoreError::Database(format!("lookup task failed: {}", e)))?
    }
}
