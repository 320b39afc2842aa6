// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output router: clipboard and synthetic paste.
//!
//! The policy table is fixed per distribution profile. Synthetic paste
//! checks the accessibility posture without prompting; a clipboard write
//! that landed before a paste failure still counts and is reported inside
//! the error.

mod system;

pub use system::{SystemClipboard, SystemPaste};

use quedo_core::settings::{DistributionProfile, OutputMode};
use thiserror::Error;
use tracing::debug;

/// Where a transcript was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    Clipboard,
    Paste,
}

#[derive(Debug, Clone, Error)]
pub enum OutputError {
    #[error("synthetic paste is unavailable in the sandboxed profile")]
    PasteUnavailableInProfile,
    #[error("accessibility permission is required for synthetic paste")]
    AccessibilityPermissionRequired { delivered: Vec<OutputTarget> },
    #[error("synthetic paste could not be posted: {reason}")]
    SyntheticPasteFailed { reason: String, delivered: Vec<OutputTarget> },
    #[error("clipboard write failed: {0}")]
    ClipboardFailed(String),
}

impl OutputError {
    /// Targets that succeeded before the failure.
    pub fn delivered(&self) -> &[OutputTarget] {
        match self {
            OutputError::AccessibilityPermissionRequired { delivered }
            | OutputError::SyntheticPasteFailed { delivered, .. } => delivered,
            _ => &[],
        }
    }
}

/// Clipboard surface.
pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), OutputError>;
}

/// Synthetic-paste surface.
pub trait PasteInjector: Send + Sync {
    /// Non-prompting posture check.
    fn accessibility_granted(&self) -> bool;
    fn send_paste(&self) -> Result<(), OutputError>;
}

/// Routes one transcript according to mode and profile.
pub struct OutputRouter {
    clipboard: Box<dyn ClipboardSink>,
    paste: Box<dyn PasteInjector>,
}

impl OutputRouter {
    pub fn new(clipboard: Box<dyn ClipboardSink>, paste: Box<dyn PasteInjector>) -> Self {
        Self { clipboard, paste }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemClipboard::new()), Box::new(SystemPaste::new()))
    }

    /// Deliver `text` and return the targets that succeeded, in order.
    pub fn route(
        &self,
        text: &str,
        mode: OutputMode,
        profile: DistributionProfile,
    ) -> Result<Vec<OutputTarget>, OutputError> {
        debug!(?mode, ?profile, chars = text.len(), "routing transcript");
        match (mode, profile) {
            (OutputMode::None, _) => Ok(vec![]),

            (OutputMode::Clipboard, _) => {
                self.clipboard.write_text(text)?;
                Ok(vec![OutputTarget::Clipboard])
            }

            (OutputMode::Paste, DistributionProfile::Sandboxed) => {
                Err(OutputError::PasteUnavailableInProfile)
            }

            // The sandboxed profile silently downgrades the combined mode
            // to clipboard-only.
            (OutputMode::ClipboardAndPaste, DistributionProfile::Sandboxed) => {
                self.clipboard.write_text(text)?;
                Ok(vec![OutputTarget::Clipboard])
            }

            (OutputMode::Paste | OutputMode::ClipboardAndPaste, DistributionProfile::Direct) => {
                self.clipboard.write_text(text)?;
                let delivered = vec![OutputTarget::Clipboard];
                if !self.paste.accessibility_granted() {
                    return Err(OutputError::AccessibilityPermissionRequired { delivered });
                }
                match self.paste.send_paste() {
                    Ok(()) => Ok(vec![OutputTarget::Clipboard, OutputTarget::Paste]),
                    Err(OutputError::SyntheticPasteFailed { reason, .. }) => {
                        Err(OutputError::SyntheticPasteFailed { reason, delivered })
                    }
                    Err(other) => Err(other),
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeClipboard, FakePaste};

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
