//! Schema migrations for the issue database.
//!
//! Applied versions are recorded in a `_migrations` table, so `run_all`
//! only executes what a given database file is missing. Column additions
//! check `PRAGMA table_info` first; a database that somehow already has
//! the column just records the version and moves on.

use rusqlite::Connection;

use super::error::DatabaseError;

/// One schema change, applied at most once, in version order.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    /// Execute the SQL unconditionally.
    Standard,
    /// ALTER TABLE ADD COLUMN, skipped when the column is already there.
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_issues_table",
        sql: include_str!("sql/001_create_issues.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 2,
        description: "add_external_video_link_to_issues",
        sql: include_str!("sql/002_add_external_video_link.sql"),
        kind: MigrationKind::AddColumn {
            table: "issues",
            column: "external_video_link",
        },
    },
];

/// Brings the connected database up to the current schema version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        let needed = match &migration.kind {
            MigrationKind::Standard => true,
            MigrationKind::AddColumn { table, column } => !column_exists(conn, table, column)?,
        };

        if needed {
            log::info!(
                "Applying schema migration v{}: {}",
                migration.version,
                migration.description
            );
            conn.execute_batch(migration.sql)
                .map_err(|e| DatabaseError::Migration {
                    version: migration.version,
                    reason: e.to_string(),
                })?;
        } else {
            log::info!(
                "Schema migration v{} already satisfied, recording it as applied",
                migration.version
            );
        }

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}

/// `PRAGMA table_info` lookup for one column.
///
/// Identifiers are interpolated into the PRAGMA (SQLite does not bind
/// them), so both are restricted to alphanumerics and underscores.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let valid = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid(table) || !valid(column) {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid identifier in column check: {table}.{column}"),
        });
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|name| name.map(|n| n == column).unwrap_or(false));
    Ok(exists)
}
