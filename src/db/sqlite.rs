use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;
use crate::models::agent::AgentState;

/// Open a SQLite connection to the given path and run migrations.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_checkpoints.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Count tables in the database (for verification).
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Load the checkpointed `AgentState` for a thread, if one has ever been
/// committed (spec C8: "resumes from the last committed state").
pub fn load_checkpoint(
    conn: &Connection,
    thread_id: &str,
) -> Result<Option<AgentState>, DatabaseError> {
    let row: Option<String> = conn
        .query_row(
            "SELECT state_json FROM checkpoints WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )
        .optional()?;

    row.map(|json| serde_json::from_str(&json).map_err(DatabaseError::from))
        .transpose()
}

/// Atomically overwrite the checkpoint for a thread (spec C8: "atomic
/// snapshot of AgentState at every node boundary").
pub fn save_checkpoint(
    conn: &Connection,
    thread_id: &str,
    state: &AgentState,
) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(state)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO checkpoints (thread_id, state_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(thread_id) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at",
        params![thread_id, json, now],
    )?;
    Ok(())
}
