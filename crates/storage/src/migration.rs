// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot import of the legacy on-disk history.
//!
//! Layout: `<legacy>/history/YYYY-MM-DD/HHMMSS/` holding
//! `recording.{flac,wav}` and optionally `transcription.txt`. Session ids
//! are the first 16 bytes of SHA-256 of the time-folder path, so a second
//! run finds every session already present and imports nothing. The
//! legacy tree is never modified.

use crate::store::{HistoryStore, MediaFormat, StoreError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quedo_core::event::{names, SessionEvent};
use quedo_core::id::SessionId;
use quedo_core::session::{SessionRecord, SessionStatus};
use quedo_core::settings::{OutputMode, ProviderKind};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// Scanned / migrated / skipped counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub scanned: u32,
    pub migrated: u32,
    pub skipped: u32,
}

/// Deterministic id: first 16 bytes of SHA-256 of the folder path, hex.
pub fn legacy_session_id(folder: &Path) -> SessionId {
    let digest = Sha256::digest(folder.to_string_lossy().as_bytes());
    let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
    SessionId::new(hex)
}

/// Import every legacy time-folder under `legacy_history_root`.
pub fn migrate_legacy_history(
    store: &HistoryStore,
    legacy_history_root: &Path,
    now_ms: u64,
) -> Result<MigrationReport, StoreError> {
    let mut report = MigrationReport::default();
    if !legacy_history_root.is_dir() {
        return Ok(report);
    }

    let mut date_dirs: Vec<_> = std::fs::read_dir(legacy_history_root)
        .map_err(|e| StoreError::Io { path: legacy_history_root.to_path_buf(), source: e })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    date_dirs.sort();

    for date_dir in date_dirs {
        let Some(date) = parse_date(&date_dir) else {
            continue;
        };
        let mut time_dirs: Vec<_> = std::fs::read_dir(&date_dir)
            .map_err(|e| StoreError::Io { path: date_dir.clone(), source: e })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        time_dirs.sort();

        for folder in time_dirs {
            report.scanned += 1;
            match migrate_folder(store, &folder, date, now_ms)? {
                FolderOutcome::Migrated => report.migrated += 1,
                FolderOutcome::Skipped => report.skipped += 1,
                FolderOutcome::AlreadyPresent => {}
            }
        }
    }

    info!(
        scanned = report.scanned,
        migrated = report.migrated,
        skipped = report.skipped,
        "legacy history migration finished"
    );
    Ok(report)
}

enum FolderOutcome {
    Migrated,
    Skipped,
    /// Imported by a previous run; counted as neither migrated nor
    /// skipped so re-runs report zero work.
    AlreadyPresent,
}

fn migrate_folder(
    store: &HistoryStore,
    folder: &Path,
    date: NaiveDate,
    now_ms: u64,
) -> Result<FolderOutcome, StoreError> {
    let id = legacy_session_id(folder);
    if store.session_exists(&id)? {
        return Ok(FolderOutcome::AlreadyPresent);
    }

    let Some(time) = parse_time(folder) else {
        warn!(folder = %folder.display(), "unparseable time folder; skipping");
        return Ok(FolderOutcome::Skipped);
    };

    let flac = folder.join("recording.flac");
    let wav = folder.join("recording.wav");
    let (primary, secondary) = match (flac.is_file(), wav.is_file()) {
        (true, true) => (flac.clone(), Some(wav.clone())),
        (true, false) => (flac.clone(), None),
        (false, true) => (wav.clone(), None),
        (false, false) => {
            warn!(folder = %folder.display(), "no recording found; skipping");
            return Ok(FolderOutcome::Skipped);
        }
    };
    let primary_format = MediaFormat::from_path(&primary);

    let transcript = std::fs::read_to_string(folder.join("transcription.txt"))
        .ok()
        .map(|t| t.trim_end_matches('\n').to_string());

    let created_at_ms =
        NaiveDateTime::new(date, time).and_utc().timestamp_millis().max(0) as u64;

    let record = SessionRecord {
        id: id.clone(),
        created_at_ms,
        duration_ms: 0,
        provider_primary: ProviderKind::Groq,
        provider_used: Some(ProviderKind::Groq),
        language: "auto".into(),
        output: OutputMode::Clipboard,
        status: SessionStatus::Success,
        transcript,
        audio_path: None,
    };
    store.save_session(&record, &primary, secondary.as_deref(), false)?;

    let event = SessionEvent::new(names::MIGRATION_EVENT, now_ms)
        .for_session(id)
        .attr("source", folder.to_string_lossy())
        .attr("result", "imported")
        .attr("primary_format", primary_format.extension());
    store.append_event(&event)?;

    Ok(FolderOutcome::Migrated)
}

fn parse_date(dir: &Path) -> Option<NaiveDate> {
    let name = dir.file_name()?.to_str()?;
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

fn parse_time(dir: &Path) -> Option<NaiveTime> {
    let name = dir.file_name()?.to_str()?;
    NaiveTime::parse_from_str(name, "%H%M%S").ok()
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
