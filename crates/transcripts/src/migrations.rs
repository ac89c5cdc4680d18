//! Versioned schema for the transcript database.

use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

/// Bring the database up to [`SCHEMA_VERSION`].
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        migrate_v1(conn)?;
    }

    tracing::info!(from = current, to = SCHEMA_VERSION, "transcript schema migrated");
    Ok(())
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Ok(0);
    }
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS transcripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            speaker TEXT NOT NULL,
            transcript TEXT NOT NULL,
            agent_name TEXT,
            recorded_at INTEGER NOT NULL,
            UNIQUE(call_id, item_id)
        );
        CREATE INDEX IF NOT EXISTS idx_transcripts_call_id ON transcripts(call_id);
        CREATE INDEX IF NOT EXISTS idx_transcripts_recorded_at ON transcripts(recorded_at);

        CREATE TABLE IF NOT EXISTS call_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT UNIQUE NOT NULL,
            summary TEXT NOT NULL,
            full_transcript TEXT NOT NULL,
            agent_name TEXT,
            sentiment_analysis TEXT NOT NULL,
            overall_sentiment TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;
        "#,
    )
}
