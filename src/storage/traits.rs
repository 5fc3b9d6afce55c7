//! Store trait and error types
//!
//! This module defines the write-side interface every resource store backend
//! implements, along with the associated error types.

use crate::resource::Resource;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store target {0:?}, expected <scheme>:<path>")]
    InvalidTarget(String),

    #[error("Unknown store scheme {0:?}")]
    UnknownScheme(String),

    #[error("Store is closed")]
    Closed,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for resource store implementations
///
/// Workers share one store through an `Arc`, so implementations must be safe
/// for concurrent writes. Writing an existing key replaces its resource.
pub trait Store: Send + Sync {
    /// Persists a resource under the given key
    ///
    /// # Arguments
    ///
    /// * `key` - Root-relative path and query of the archived URL
    /// * `resource` - The page or redirect record to store
    fn write(&self, key: &str, resource: &Resource) -> StoreResult<()>;

    /// Flushes and releases the backend; later writes fail with
    /// [`StoreError::Closed`]
    fn close(&self) -> StoreResult<()>;
}
