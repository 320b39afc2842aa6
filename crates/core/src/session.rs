// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record: one finished recording, immutable once written.
//!
//! Retranscription never mutates an existing session; it creates a new one
//! pointing at the same audio artifact.

use crate::id::SessionId;
use crate::settings::{OutputMode, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terminal outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Success,
    RetryAvailable,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Success => "success",
            SessionStatus::RetryAvailable => "retryAvailable",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SessionStatus::Success),
            "retryAvailable" => Some(SessionStatus::RetryAvailable),
            "cancelled" => Some(SessionStatus::Cancelled),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

/// Immutable record of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Creation wall-clock time, epoch milliseconds.
    pub created_at_ms: u64,
    pub duration_ms: u64,
    /// Provider configured as primary when the session started.
    pub provider_primary: ProviderKind,
    /// Provider that actually produced the transcript, when one did.
    pub provider_used: Option<ProviderKind>,
    pub language: String,
    pub output: OutputMode,
    pub status: SessionStatus,
    pub transcript: Option<String>,
    /// Primary audio artifact. Points into the history store's media tree
    /// once the session has been saved.
    pub audio_path: Option<PathBuf>,
}

/// Preview length used by history listings.
const PREVIEW_CHARS: usize = 120;

impl SessionRecord {
    /// First 120 characters of the transcript, on char boundaries.
    pub fn transcript_preview(&self) -> Option<String> {
        self.transcript
            .as_ref()
            .map(|t| t.chars().take(PREVIEW_CHARS).collect())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
