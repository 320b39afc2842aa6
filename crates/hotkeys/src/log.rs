// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only hotkeys.log for post-mortem analysis of lost shortcuts.

use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;

/// One line per register / dispatch / unregister. Failures to write are
/// swallowed; the log must never take the hot path down.
pub struct HotkeyLog {
    path: Option<PathBuf>,
    file: Mutex<Option<std::fs::File>>,
}

impl HotkeyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), file: Mutex::new(None) }
    }

    /// A log that goes nowhere (tests, CLI-only mode).
    pub fn disabled() -> Self {
        Self { path: None, file: Mutex::new(None) }
    }

    pub fn append(&self, epoch_ms: u64, line: &str) {
        let Some(path) = &self.path else { return };
        let mut guard = self.file.lock();
        if guard.is_none() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            *guard = std::fs::OpenOptions::new().create(true).append(true).open(path).ok();
        }
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{epoch_ms} {line}");
        }
    }
}
