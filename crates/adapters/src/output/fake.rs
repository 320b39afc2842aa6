// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording output fakes.

use super::{ClipboardSink, OutputError, PasteInjector};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Clipboard fake recording every write.
#[derive(Clone, Default)]
pub struct FakeClipboard {
    writes: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.writes.lock().last().cloned()
    }
}

impl ClipboardSink for FakeClipboard {
    fn write_text(&self, text: &str) -> Result<(), OutputError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OutputError::ClipboardFailed("fake clipboard failure".into()));
        }
        self.writes.lock().push(text.to_string());
        Ok(())
    }
}

/// Paste fake with controllable posture and outcome.
#[derive(Clone)]
pub struct FakePaste {
    granted: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
    pastes: Arc<AtomicU32>,
}

impl FakePaste {
    pub fn new() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
            fail: Arc::new(AtomicBool::new(false)),
            pastes: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn paste_count(&self) -> u32 {
        self.pastes.load(Ordering::SeqCst)
    }
}

impl Default for FakePaste {
    fn default() -> Self {
        Self::new()
    }
}

impl PasteInjector for FakePaste {
    fn accessibility_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn send_paste(&self) -> Result<(), OutputError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OutputError::SyntheticPasteFailed {
                reason: "fake paste failure".into(),
                delivered: vec![],
            });
        }
        self.pastes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
