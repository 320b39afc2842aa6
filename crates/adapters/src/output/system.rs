// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System clipboard (arboard) and synthetic paste (enigo).

use super::{ClipboardSink, OutputError, PasteInjector};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use parking_lot::Mutex;
use tracing::debug;

/// arboard-backed clipboard. The handle is created lazily and kept for
/// the process lifetime; arboard requires exclusive access per write.
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { inner: Mutex::new(None) }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), OutputError> {
        let mut guard = self.inner.lock();
        if guard.is_none() {
            *guard = Some(
                arboard::Clipboard::new()
                    .map_err(|e| OutputError::ClipboardFailed(e.to_string()))?,
            );
        }
        let clipboard = guard.as_mut().ok_or_else(|| {
            OutputError::ClipboardFailed("clipboard handle unavailable".to_string())
        })?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| OutputError::ClipboardFailed(e.to_string()))
    }
}

/// enigo-backed paste keystroke (cmd+V on macOS, ctrl+V elsewhere).
pub struct SystemPaste;

impl SystemPaste {
    pub fn new() -> Self {
        Self
    }

    fn paste_modifier() -> Key {
        #[cfg(target_os = "macos")]
        {
            Key::Meta
        }
        #[cfg(not(target_os = "macos"))]
        {
            Key::Control
        }
    }
}

impl Default for SystemPaste {
    fn default() -> Self {
        Self::new()
    }
}

impl PasteInjector for SystemPaste {
    fn accessibility_granted(&self) -> bool {
        // On macOS the assistive-access posture is exported by the app
        // wrapper (which can call the trust API without prompting); other
        // platforms gate synthetic events elsewhere or not at all.
        #[cfg(target_os = "macos")]
        {
            std::env::var("QUEDO_AX_TRUSTED").map(|v| v == "1").unwrap_or(false)
        }
        #[cfg(not(target_os = "macos"))]
        {
            true
        }
    }

    fn send_paste(&self) -> Result<(), OutputError> {
        let failed = |e: enigo::InputError| OutputError::SyntheticPasteFailed {
            reason: e.to_string(),
            delivered: vec![],
        };
        let mut enigo = Enigo::new(&Settings::default()).map_err(|e| {
            OutputError::SyntheticPasteFailed { reason: e.to_string(), delivered: vec![] }
        })?;
        let modifier = Self::paste_modifier();
        debug!("posting synthetic paste keystroke");
        enigo.key(modifier, Direction::Press).map_err(failed)?;
        let result = enigo.key(Key::Unicode('v'), Direction::Click).map_err(failed);
        // Always release the modifier, even if the click failed.
        let release = enigo.key(modifier, Direction::Release).map_err(failed);
        result.and(release)
    }
}
