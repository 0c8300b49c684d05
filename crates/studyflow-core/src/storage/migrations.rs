//! Database schema migrations for studyflow.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: sessions, per-day history, goals, routines and the kv store,
/// plus the indexes the statistics queries filter on.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL,
            routine_id      INTEGER,
            kind            TEXT NOT NULL,
            planned_minutes INTEGER NOT NULL,
            start_time      TEXT NOT NULL,
            end_time        TEXT,
            completed       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS study_history (
            user_id         TEXT NOT NULL,
            date            TEXT NOT NULL,
            total_time      INTEGER NOT NULL DEFAULT 0,
            focus_count     INTEGER NOT NULL DEFAULT 0,
            completed_count INTEGER NOT NULL DEFAULT 0,
            short_breaks    INTEGER NOT NULL DEFAULT 0,
            long_breaks     INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS study_goals (
            user_id      TEXT PRIMARY KEY,
            daily_goal   INTEGER NOT NULL,
            weekly_goal  INTEGER NOT NULL,
            monthly_goal INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS routines (
            id                         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id                    TEXT NOT NULL,
            name                       TEXT NOT NULL,
            focus_minutes              INTEGER NOT NULL,
            short_break_minutes        INTEGER NOT NULL,
            long_break_minutes         INTEGER NOT NULL,
            sessions_before_long_break INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_start ON sessions(user_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_sessions_user_kind_completed
            ON sessions(user_id, kind, completed, start_time);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}
