// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotating file logging: app.log, 2 MB per file, 5 files kept.
//!
//! tracing-appender only rotates by time, so the size policy lives in a
//! small writer that tracing-appender's non-blocking layer wraps.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Size threshold per log file.
const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// app.log plus app.log.1 … app.log.4.
const KEPT_FILES: usize = 5;

struct RotatingInner {
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

/// `io::Write` with size-based rotation. Cloneable so the non-blocking
/// appender can own one handle and the export path another.
#[derive(Clone)]
pub struct RotatingWriter {
    inner: Arc<Mutex<RotatingInner>>,
}

impl RotatingWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            inner: Arc::new(Mutex::new(RotatingInner { path, file: None, written: 0 })),
        }
    }

    fn rotate(inner: &mut RotatingInner) -> io::Result<()> {
        inner.file = None;
        // app.log.4 drops off; everything else shifts up by one.
        for index in (1..KEPT_FILES).rev() {
            let from = if index == 1 {
                inner.path.clone()
            } else {
                rotated_name(&inner.path, index - 1)
            };
            let to = rotated_name(&inner.path, index);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }
        inner.written = 0;
        Ok(())
    }

    fn ensure_open(inner: &mut RotatingInner) -> io::Result<()> {
        if inner.file.is_none() {
            if let Some(parent) = inner.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&inner.path)?;
            inner.written = file.metadata().map(|m| m.len()).unwrap_or(0);
            inner.file = Some(file);
        }
        Ok(())
    }
}

fn rotated_name(path: &std::path::Path, index: usize) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{name}.{index}"))
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.written + buf.len() as u64 > MAX_FILE_BYTES {
            Self::rotate(&mut inner)?;
        }
        Self::ensure_open(&mut inner)?;
        let file = inner.file.as_mut().ok_or_else(|| io::Error::other("log file closed"))?;
        let written = file.write(buf)?;
        inner.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if let Some(file) = inner.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global subscriber. Returns the non-blocking guard; keep
/// it alive for the process lifetime.
pub fn init(log_path: PathBuf, filter: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let writer = RotatingWriter::new(log_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    guard
}

/// Tail of the current log file for `quedo logs` and the support bundle.
pub fn tail_lines(log_path: &std::path::Path, max_lines: usize) -> Vec<String> {
    match std::fs::read_to_string(log_path) {
        Ok(content) => {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(max_lines);
            lines[start..].iter().map(|s| s.to_string()).collect()
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
