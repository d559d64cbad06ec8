//! Database schema migrations for SQLite.
//!
//! Versioned migrations: each version transforms the schema from N-1 to N
//! inside one transaction, and is recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::traits::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: calling it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            tracing::info!(version, "applying journal schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: journal and checkpoints.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per committed mutating call
        CREATE TABLE ledger_events (
            seq INTEGER PRIMARY KEY,          -- journal position, dense from 1
            event_id BLOB NOT NULL UNIQUE,    -- 32 bytes, Blake3 of event_bytes
            caller BLOB NOT NULL,             -- 32 bytes, principal
            kind INTEGER NOT NULL,            -- CallKind as u16
            event_bytes BLOB NOT NULL,        -- CBOR-encoded LedgerEvent
            recorded_at INTEGER NOT NULL      -- local append time (Unix ms)
        );

        -- State digests after applying the event at seq
        CREATE TABLE checkpoints (
            seq INTEGER PRIMARY KEY,
            state_hash BLOB NOT NULL,         -- 32 bytes
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_events_caller ON ledger_events(caller);
        CREATE INDEX idx_events_kind ON ledger_events(kind);
        "#,
    )?;

    Ok(())
}
