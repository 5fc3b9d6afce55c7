//! Resource store module
//!
//! This module handles persisting archived resources, including:
//! - The [`Store`] trait shared by every backend
//! - Selecting a backend from a `<scheme>:<path>` target string
//! - The embedded SQLite backend and an in-memory backend

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreError, StoreResult};

use std::path::Path;
use std::sync::Arc;

/// Bucket used by `sqlite:` targets that do not name one
pub const DEFAULT_BUCKET: &str = "staticator";

type Constructor = fn(&str) -> StoreResult<Arc<dyn Store>>;

/// Registered backends, by target scheme
const REGISTRY: &[(&str, Constructor)] = &[("sqlite", open_sqlite), ("memory", open_memory)];

/// Opens the store named by a target string
///
/// Targets have the form `<scheme>:<path>`:
///
/// * `sqlite:<file>[:<bucket>]` - embedded SQLite database
/// * `memory:` - in-process map, discarded at exit
///
/// # Returns
///
/// * `Ok(Arc<dyn Store>)` - The opened backend
/// * `Err(StoreError)` - Malformed target, unknown scheme, or backend failure
///
/// # Example
///
/// ```no_run
/// use staticator::storage::open_store;
///
/// let store = open_store("sqlite:archive.db:blog").unwrap();
/// ```
pub fn open_store(target: &str) -> StoreResult<Arc<dyn Store>> {
    let (scheme, path) = target
        .split_once(':')
        .ok_or_else(|| StoreError::InvalidTarget(target.to_string()))?;

    let constructor = REGISTRY
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, constructor)| constructor)
        .ok_or_else(|| StoreError::UnknownScheme(scheme.to_string()))?;

    tracing::debug!("Opening {} store at {:?}", scheme, path);
    constructor(path)
}

/// Splits a `sqlite:` path into database file and bucket
///
/// The bucket is whatever follows the last `:`, if anything does.
pub fn split_sqlite_path(path: &str) -> StoreResult<(&str, &str)> {
    let (file, bucket) = match path.rsplit_once(':') {
        Some((file, bucket)) if !bucket.contains('/') => (file, bucket),
        _ => (path, DEFAULT_BUCKET),
    };

    if file.is_empty() || bucket.is_empty() {
        return Err(StoreError::InvalidTarget(format!("sqlite:{}", path)));
    }

    Ok((file, bucket))
}

fn open_sqlite(path: &str) -> StoreResult<Arc<dyn Store>> {
    let (file, bucket) = split_sqlite_path(path)?;
    Ok(Arc::new(SqliteStore::open(Path::new(file), bucket)?))
}

fn open_memory(_path: &str) -> StoreResult<Arc<dyn Store>> {
    Ok(Arc::new(MemoryStore::new()))
}
