// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The history store.

use crate::schema;
use parking_lot::Mutex;
use quedo_core::event::SessionEvent;
use quedo_core::id::SessionId;
use quedo_core::metrics::MetricPoint;
use quedo_core::session::{SessionRecord, SessionStatus};
use quedo_core::settings::{OutputMode, ProviderKind};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history database error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("history database could not be opened or rebuilt: {0}")]
    OpenFailed(String),
    #[error("session {0} already exists")]
    DuplicateSession(SessionId),
}

/// Outcome of opening the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenReport {
    /// True when a corrupt database was renamed aside and rebuilt.
    pub recovered: bool,
}

/// Row shape for history listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at_ms: u64,
    pub duration_ms: u64,
    pub status: SessionStatus,
    pub provider_used: Option<ProviderKind>,
    pub language: String,
    pub preview: Option<String>,
}

/// Audio container of a media row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Wav,
    Flac,
}

impl MediaFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("flac") => MediaFormat::Flac,
            _ => MediaFormat::Wav,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Wav => "wav",
            MediaFormat::Flac => "flac",
        }
    }
}

/// SQLite-backed session history. The connection is exclusive; callers
/// go through this type or not at all.
pub struct HistoryStore {
    conn: Mutex<Connection>,
    base: PathBuf,
}

impl HistoryStore {
    /// Open (or create) the database at `db_path` with media under
    /// `base`. A corrupt file is renamed with a timestamp suffix and a
    /// fresh schema is created in its place; the report says so.
    pub fn open(db_path: &Path, base: &Path, now_ms: u64) -> Result<(Self, OpenReport), StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io { path: parent.to_path_buf(), source: e })?;
        }
        std::fs::create_dir_all(base.join("media"))
            .map_err(|e| StoreError::Io { path: base.to_path_buf(), source: e })?;

        match Self::open_raw(db_path, now_ms) {
            Ok(conn) => Ok((
                Self { conn: Mutex::new(conn), base: base.to_path_buf() },
                OpenReport { recovered: false },
            )),
            Err(first) => {
                warn!(error = %first, "history database unusable; renaming aside and rebuilding");
                let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
                let quarantine = db_path.with_extension(format!("sqlite.corrupt-{stamp}"));
                std::fs::rename(db_path, &quarantine)
                    .map_err(|e| StoreError::Io { path: db_path.to_path_buf(), source: e })?;
                // WAL side files belong to the corrupt database.
                for suffix in ["-wal", "-shm"] {
                    let side = sibling_with_suffix(db_path, suffix);
                    let _ = std::fs::remove_file(side);
                }
                let conn = Self::open_raw(db_path, now_ms)
                    .map_err(|e| StoreError::OpenFailed(e.to_string()))?;
                info!(quarantine = %quarantine.display(), "history database rebuilt");
                Ok((
                    Self { conn: Mutex::new(conn), base: base.to_path_buf() },
                    OpenReport { recovered: true },
                ))
            }
        }
    }

    fn open_raw(db_path: &Path, now_ms: u64) -> Result<Connection, rusqlite::Error> {
        let mut conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::apply_migrations(&mut conn, now_ms)?;
        Ok(conn)
    }

    pub fn storage_base_path(&self) -> &Path {
        &self.base
    }

    pub fn media_dir(&self, id: &SessionId) -> PathBuf {
        self.base.join("media").join(id.as_str())
    }

    /// Persist a finished session.
    ///
    /// The primary source file is copied to
    /// `<base>/media/<session_id>/recording.<ext>`; with `remove_sources`
    /// the source (a temp recording) is deleted afterwards. Legacy
    /// migration passes a secondary `.wav` and keeps its tree intact.
    pub fn save_session(
        &self,
        record: &SessionRecord,
        primary_source: &Path,
        secondary_source: Option<&Path>,
        remove_sources: bool,
    ) -> Result<PathBuf, StoreError> {
        if self.session_exists(&record.id)? {
            return Err(StoreError::DuplicateSession(record.id.clone()));
        }
        let media_dir = self.media_dir(&record.id);
        std::fs::create_dir_all(&media_dir)
            .map_err(|e| StoreError::Io { path: media_dir.clone(), source: e })?;

        let primary_format = MediaFormat::from_path(primary_source);
        let primary_dest = media_dir.join(format!("recording.{}", primary_format.extension()));
        std::fs::copy(primary_source, &primary_dest)
            .map_err(|e| StoreError::Io { path: primary_source.to_path_buf(), source: e })?;

        let secondary = match secondary_source {
            Some(source) => {
                let format = MediaFormat::from_path(source);
                let dest = media_dir.join(format!("recording.{}", format.extension()));
                std::fs::copy(source, &dest)
                    .map_err(|e| StoreError::Io { path: source.to_path_buf(), source: e })?;
                Some((dest, format))
            }
            None => None,
        };

        let insert = || -> Result<(), StoreError> {
            let mut conn = self.conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO sessions
                 (session_id, created_at_ms, duration_ms, provider_primary, provider_used,
                  language, output_mode, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.as_str(),
                    record.created_at_ms as i64,
                    record.duration_ms as i64,
                    record.provider_primary.as_str(),
                    record.provider_used.map(|p| p.as_str()),
                    record.language,
                    record.output.as_config_str(),
                    record.status.as_str(),
                ],
            )?;
            tx.execute(
                "INSERT INTO session_media (session_id, path, format, is_primary)
                 VALUES (?1, ?2, ?3, 1)",
                params![
                    record.id.as_str(),
                    primary_dest.to_string_lossy(),
                    primary_format.extension()
                ],
            )?;
            if let Some((dest, format)) = &secondary {
                tx.execute(
                    "INSERT INTO session_media (session_id, path, format, is_primary)
                     VALUES (?1, ?2, ?3, 0)",
                    params![record.id.as_str(), dest.to_string_lossy(), format.extension()],
                )?;
            }
            if let Some(text) = &record.transcript {
                tx.execute(
                    "INSERT INTO session_transcripts (session_id, text) VALUES (?1, ?2)",
                    params![record.id.as_str(), text],
                )?;
            }
            tx.commit()?;
            Ok(())
        };

        if let Err(e) = insert() {
            // Roll the media copy back so a failed insert leaves no
            // orphan files.
            let _ = std::fs::remove_dir_all(&media_dir);
            return Err(e);
        }

        if remove_sources {
            remove_file_logged(primary_source);
            if let Some(source) = secondary_source {
                remove_file_logged(source);
            }
        }
        info!(session = %record.id, path = %primary_dest.display(), "session saved");
        Ok(primary_dest)
    }

    /// Append an audit event; the per-session sequence is computed inside
    /// the insert transaction.
    pub fn append_event(&self, event: &SessionEvent) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let session_id = event.session_id.as_ref().map(|id| id.as_str().to_string());
        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(event_seq), 0) + 1 FROM session_events
             WHERE session_id IS ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        let attrs = serde_json::to_string(&event.attrs).unwrap_or_else(|_| "{}".into());
        tx.execute(
            "INSERT INTO session_events (session_id, event_seq, name, attrs, at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, seq, event.name, attrs, event.at_ms as i64],
        )?;
        tx.commit()?;
        Ok(seq)
    }

    /// Newest sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT s.session_id, s.created_at_ms, s.duration_ms, s.status, s.provider_used,
                    s.language, t.text
             FROM sessions s
             LEFT JOIN session_transcripts t ON t.session_id = s.session_id
             ORDER BY s.created_at_ms DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let id: String = row.get(0)?;
            let status: String = row.get(3)?;
            let provider: Option<String> = row.get(4)?;
            let text: Option<String> = row.get(6)?;
            Ok(SessionSummary {
                id: SessionId::new(id),
                created_at_ms: row.get::<_, i64>(1)? as u64,
                duration_ms: row.get::<_, i64>(2)? as u64,
                status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Failed),
                provider_used: provider.as_deref().and_then(parse_provider),
                language: row.get(5)?,
                preview: text.map(|t| t.chars().take(120).collect()),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn session(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT s.created_at_ms, s.duration_ms, s.provider_primary, s.provider_used,
                        s.language, s.output_mode, s.status, t.text,
                        (SELECT path FROM session_media m
                          WHERE m.session_id = s.session_id AND m.is_primary = 1)
                 FROM sessions s
                 LEFT JOIN session_transcripts t ON t.session_id = s.session_id
                 WHERE s.session_id = ?1",
                params![id.as_str()],
                |row| {
                    let primary: String = row.get(2)?;
                    let used: Option<String> = row.get(3)?;
                    let output: String = row.get(5)?;
                    let status: String = row.get(6)?;
                    let audio: Option<String> = row.get(8)?;
                    Ok(SessionRecord {
                        id: id.clone(),
                        created_at_ms: row.get::<_, i64>(0)? as u64,
                        duration_ms: row.get::<_, i64>(1)? as u64,
                        provider_primary: parse_provider(&primary).unwrap_or(ProviderKind::Groq),
                        provider_used: used.as_deref().and_then(parse_provider),
                        language: row.get(4)?,
                        output: OutputMode::from_config_str(&output)
                            .unwrap_or(OutputMode::Clipboard),
                        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Failed),
                        transcript: row.get(7)?,
                        audio_path: audio.map(PathBuf::from),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn transcript_text(&self, id: &SessionId) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT text FROM session_transcripts WHERE session_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn primary_audio_path(&self, id: &SessionId) -> Result<Option<PathBuf>, StoreError> {
        let conn = self.conn.lock();
        let path: Option<String> = conn
            .query_row(
                "SELECT path FROM session_media WHERE session_id = ?1 AND is_primary = 1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    /// Delete one session; media/transcripts cascade, events and metrics
    /// keep their rows with a nulled session id.
    pub fn delete_session(&self, id: &SessionId) -> Result<bool, StoreError> {
        let media_dir = self.media_dir(id);
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = tx.execute("DELETE FROM sessions WHERE session_id = ?1", params![id.as_str()])?;
        tx.commit()?;
        drop(conn);
        if deleted > 0 {
            let _ = std::fs::remove_dir_all(media_dir);
        }
        Ok(deleted > 0)
    }

    /// Raw metric sample plus the 1-minute rollup upsert.
    pub fn record_metric(
        &self,
        point: &MetricPoint,
        session: Option<&SessionId>,
    ) -> Result<(), StoreError> {
        let tags = serde_json::to_string(&point.tags).unwrap_or_else(|_| "{}".into());
        let minute_ms = (point.at_ms / 60_000) * 60_000;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO session_metrics (session_id, name, value, tags, at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.map(|id| id.as_str()),
                point.name,
                point.value,
                tags,
                point.at_ms as i64
            ],
        )?;
        tx.execute(
            "INSERT INTO metrics_rollup_1m (name, tags, minute_ms, count, sum, min, max)
             VALUES (?1, ?2, ?3, 1, ?4, ?4, ?4)
             ON CONFLICT (name, tags, minute_ms) DO UPDATE SET
                count = count + 1,
                sum = sum + excluded.sum,
                min = MIN(min, excluded.min),
                max = MAX(max, excluded.max)",
            params![point.name, tags, minute_ms as i64, point.value],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Most recent events, newest first, for the support bundle.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<SessionEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, event_seq, name, attrs, at_ms
             FROM session_events ORDER BY event_id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let session: Option<String> = row.get(0)?;
            let attrs: String = row.get(3)?;
            Ok(SessionEvent {
                session_id: session.map(SessionId::new),
                seq: row.get(1)?,
                name: row.get(2)?,
                attrs: serde_json::from_str::<BTreeMap<String, String>>(&attrs)
                    .unwrap_or_default(),
                at_ms: row.get::<_, i64>(4)? as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Metric rollups, newest minute first, for the support bundle.
    pub fn metric_rollups(&self, limit: usize) -> Result<Vec<serde_json::Value>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, tags, minute_ms, count, sum, min, max
             FROM metrics_rollup_1m ORDER BY minute_ms DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let tags: String = row.get(1)?;
            Ok(serde_json::json!({
                "name": row.get::<_, String>(0)?,
                "tags": serde_json::from_str::<serde_json::Value>(&tags)
                    .unwrap_or(serde_json::Value::Null),
                "minute_ms": row.get::<_, i64>(2)?,
                "count": row.get::<_, i64>(3)?,
                "sum": row.get::<_, f64>(4)?,
                "min": row.get::<_, f64>(5)?,
                "max": row.get::<_, f64>(6)?,
            }))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn snapshot_settings(&self, redacted_json: &str, at_ms: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings_snapshots (at_ms, redacted_json) VALUES (?1, ?2)",
            params![at_ms as i64, redacted_json],
        )?;
        Ok(())
    }

    /// True when a session with this id already exists.
    pub fn session_exists(&self, id: &SessionId) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT 1 FROM sessions WHERE session_id = ?1")?;
        Ok(stmt.exists(params![id.as_str()])?)
    }
}

fn parse_provider(s: &str) -> Option<ProviderKind> {
    match s {
        "groq" => Some(ProviderKind::Groq),
        "openai" => Some(ProviderKind::OpenAi),
        _ => None,
    }
}

fn remove_file_logged(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove source file after ingest");
    }
}

/// `history.sqlite` → `history.sqlite-wal` (not `history.-wal`).
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    name.push_str(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
