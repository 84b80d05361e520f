//! # paywall-db
//!
//! SQLite storage for gating rules.
//!
//! The core keeps its state in memory. This crate holds the rule stores that
//! live outside it: the legacy rule table written by old deployments, read
//! during migration, and the extended rule table that migrated rules are
//! exported to for reporting.
//!
//! ## Schema
//!
//! - v1: `legacy_gating_rules`
//! - v2: adds `gating_rules`
//! - Schema version stored in `PRAGMA user_version`
//! - `u128` amounts stored as decimal TEXT, ids as 32-byte BLOBs

pub mod legacy_source;
pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

pub use legacy_source::SqliteLegacySource;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create a rule database at the given path and bring it to
/// [`SCHEMA_VERSION`].
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
