//! Database schema definitions
//!
//! This module contains the SQL schema for the embedded resource store.

/// SQL schema for the database
///
/// Exactly one of `content`/`content_type` or `redirect` is meaningful per
/// row, mirroring [`crate::resource::Resource`].
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    bucket TEXT NOT NULL,
    key TEXT NOT NULL,
    content BLOB,
    content_type TEXT,
    redirect TEXT,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (bucket, key),
    CHECK ((redirect IS NULL) != (content IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_resources_bucket ON resources(bucket);
"#;

/// Current schema version, recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
