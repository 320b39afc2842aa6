// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema and the migration ledger.

use rusqlite::Connection;

/// Versioned migrations, applied in order inside one transaction each.
/// Never edit an entry that has shipped; append a new version.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "
    CREATE TABLE sessions (
        session_id       TEXT PRIMARY KEY,
        created_at_ms    INTEGER NOT NULL,
        duration_ms      INTEGER NOT NULL,
        provider_primary TEXT NOT NULL,
        provider_used    TEXT,
        language         TEXT NOT NULL,
        output_mode      TEXT NOT NULL,
        status           TEXT NOT NULL
    );
    CREATE INDEX idx_sessions_created ON sessions (created_at_ms DESC);

    CREATE TABLE session_media (
        media_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL REFERENCES sessions (session_id) ON DELETE CASCADE,
        path       TEXT NOT NULL,
        format     TEXT NOT NULL,
        is_primary INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX idx_media_session ON session_media (session_id);

    CREATE TABLE session_transcripts (
        session_id TEXT PRIMARY KEY REFERENCES sessions (session_id) ON DELETE CASCADE,
        text       TEXT NOT NULL
    );

    CREATE TABLE session_events (
        event_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT REFERENCES sessions (session_id) ON DELETE SET NULL,
        event_seq  INTEGER NOT NULL,
        name       TEXT NOT NULL,
        attrs      TEXT NOT NULL DEFAULT '{}',
        at_ms      INTEGER NOT NULL
    );
    CREATE INDEX idx_events_session ON session_events (session_id, event_seq);

    CREATE TABLE settings_snapshots (
        snapshot_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        at_ms         INTEGER NOT NULL,
        redacted_json TEXT NOT NULL
    );

    CREATE TABLE session_metrics (
        metric_id  INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT REFERENCES sessions (session_id) ON DELETE SET NULL,
        name       TEXT NOT NULL,
        value      REAL NOT NULL,
        tags       TEXT NOT NULL DEFAULT '{}',
        at_ms      INTEGER NOT NULL
    );

    CREATE TABLE metrics_rollup_1m (
        name      TEXT NOT NULL,
        tags      TEXT NOT NULL DEFAULT '{}',
        minute_ms INTEGER NOT NULL,
        count     INTEGER NOT NULL,
        sum       REAL NOT NULL,
        min       REAL NOT NULL,
        max       REAL NOT NULL,
        PRIMARY KEY (name, tags, minute_ms)
    );
    ",
)];

/// Bring the database up to the current version.
pub fn apply_migrations(conn: &mut Connection, now_ms: u64) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version       INTEGER PRIMARY KEY,
            applied_at_ms INTEGER NOT NULL
        );",
    )?;

    for (version, sql) in MIGRATIONS {
        let applied: bool = conn
            .prepare("SELECT 1 FROM schema_migrations WHERE version = ?1")?
            .exists([version])?;
        if applied {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at_ms) VALUES (?1, ?2)",
            rusqlite::params![version, now_ms as i64],
        )?;
        tx.commit()?;
        tracing::info!(version, "applied schema migration");
    }
    Ok(())
}
