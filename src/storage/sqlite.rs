//! SQLite store implementation
//!
//! This module provides the embedded, file-backed implementation of the
//! [`Store`] trait. Resources are kept in named buckets so that several
//! archives can share one database file.

use crate::resource::Resource;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Store, StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite store backend
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    bucket: String,
}

impl SqliteStore {
    /// Opens or creates a store database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `bucket` - Bucket that every key of this handle lives in
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path, bucket: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn, bucket))
    }

    /// Opens an existing store database for reading
    ///
    /// Used by the read-path server, which never writes.
    pub fn open_read_only(path: &Path, bucket: &str) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Ok(Self::from_connection(conn, bucket))
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(bucket: &str) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn, bucket))
    }

    fn from_connection(conn: Connection, bucket: &str) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Reads the resource stored under a key
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Resource))` - The stored page or redirect record
    /// * `Ok(None)` - Nothing is stored under the key
    /// * `Err(StoreError)` - The lookup failed
    pub fn get(&self, key: &str) -> StoreResult<Option<Resource>> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let row = conn
            .query_row(
                "SELECT content, content_type, redirect FROM resources
                 WHERE bucket = ?1 AND key = ?2",
                params![self.bucket, key],
                |row| {
                    Ok((
                        row.get::<_, Option<Vec<u8>>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(content, content_type, redirect)| match redirect {
            Some(target) => Resource::redirect(target),
            None => Resource::page(content.unwrap_or_default(), content_type.unwrap_or_default()),
        }))
    }

    /// Lists every key in the bucket, sorted
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut stmt = conn.prepare("SELECT key FROM resources WHERE bucket = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![self.bucket], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(keys)
    }

    /// Counts the resources in the bucket
    pub fn count(&self) -> StoreResult<u64> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resources WHERE bucket = ?1",
            params![self.bucket],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }
}

impl Store for SqliteStore {
    fn write(&self, key: &str, resource: &Resource) -> StoreResult<()> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let now = Utc::now().to_rfc3339();

        let (content, content_type, redirect) = match resource {
            Resource::Page {
                content,
                content_type,
            } => (Some(content.as_slice()), Some(content_type.as_str()), None),
            Resource::Redirect { target } => (None, None, Some(target.as_str())),
        };

        conn.execute(
            "INSERT INTO resources (bucket, key, content, content_type, redirect, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(bucket, key) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                redirect = excluded.redirect,
                stored_at = excluded.stored_at",
            params![self.bucket, key, content, content_type, redirect, now],
        )?;

        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        }
        Ok(())
    }
}
