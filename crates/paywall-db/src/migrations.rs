//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are
//! forward-only. A legacy file written before the extended table existed
//! sits at v1 and is brought to v2 on open.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    run_to(conn, SCHEMA_VERSION)
}

/// Run migrations up to `target`. Used by tests and tooling to produce a
/// database at an older version.
pub fn run_to(conn: &Connection, target: u32) -> Result<()> {
    if target > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "target version {target} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    for version in (current_version + 1)..=target {
        tracing::info!("Running migration to v{version}");
        run_migration(conn, version)?;
        conn.pragma_update(None, "user_version", version)
            .map_err(DbError::Sqlite)?;
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: u32) -> Result<()> {
    let batch = match version {
        1 => schema::SCHEMA_V1,
        2 => schema::SCHEMA_V2,
        _ => {
            return Err(DbError::Migration(format!(
                "Unknown migration version: {version}"
            )))
        }
    };
    conn.execute_batch(batch).map_err(DbError::Sqlite)
}
