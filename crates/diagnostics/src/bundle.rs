// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Support bundle export.
//!
//! The archive carries log lines, the redacted settings snapshot, recent
//! session events, and metric rollups. Raw transcripts, audio, and
//! secrets are structurally impossible to include: the contents type has
//! no field for them.

use quedo_core::event::SessionEvent;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bundle archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("bundle encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything that goes into the archive.
#[derive(Debug, Clone, Default)]
pub struct BundleContents {
    /// Tail of the application log.
    pub log_lines: Vec<String>,
    pub redacted_settings: BTreeMap<String, String>,
    /// Recent session events (newest first).
    pub events: Vec<SessionEvent>,
    pub metric_rollups: Vec<serde_json::Value>,
}

/// Write `quedo-support-<stamp>.zip` into `exports_dir`.
pub fn write_bundle(
    contents: &BundleContents,
    exports_dir: &Path,
    now_ms: u64,
) -> Result<PathBuf, BundleError> {
    std::fs::create_dir_all(exports_dir)
        .map_err(|e| BundleError::Io { path: exports_dir.to_path_buf(), source: e })?;
    let path = exports_dir.join(format!("quedo-support-{now_ms}.zip"));
    let file = std::fs::File::create(&path)
        .map_err(|e| BundleError::Io { path: path.clone(), source: e })?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("app.log", options)?;
    for line in &contents.log_lines {
        writeln!(zip, "{line}").map_err(|e| BundleError::Io { path: path.clone(), source: e })?;
    }

    zip.start_file("settings.json", options)?;
    let settings = serde_json::to_vec_pretty(&contents.redacted_settings)?;
    zip.write_all(&settings).map_err(|e| BundleError::Io { path: path.clone(), source: e })?;

    zip.start_file("events.json", options)?;
    let events = serde_json::to_vec_pretty(&contents.events)?;
    zip.write_all(&events).map_err(|e| BundleError::Io { path: path.clone(), source: e })?;

    zip.start_file("metrics.json", options)?;
    let metrics = serde_json::to_vec_pretty(&contents.metric_rollups)?;
    zip.write_all(&metrics).map_err(|e| BundleError::Io { path: path.clone(), source: e })?;

    zip.finish()?;
    Ok(path)
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
