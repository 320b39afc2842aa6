// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the CLI and the daemon: newline-delimited JSON
//! over the Unix socket, tagged enums on both directions.

use quedo_capture::SystemSignal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request from CLI to daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping.
    Ping,
    /// Version handshake.
    Hello { version: String },
    /// Daemon + lifecycle status.
    Status,
    /// Request daemon shutdown.
    Shutdown,
    /// Run connectivity / device / storage checks.
    RunChecks,
    /// Reload settings from disk (config.env edited).
    ReloadSettings,
    /// List recent sessions.
    ListSessions { limit: usize },
    /// Transcript of the n-th most recent session (0-based).
    Transcript { index: usize },
    /// Primary audio path of the n-th most recent session.
    AudioPath { index: usize },
    /// Transcribe an arbitrary audio file; returns the text.
    TranscribeFile { path: String },
    /// Re-transcribe the n-th most recent session into a new session.
    Retranscribe { index: usize },
    /// Export a support bundle; returns the archive path.
    ExportBundle,
    /// Inject a system signal (sleep watcher, audio route collaborator).
    SystemSignal { signal: SystemSignal },
}

/// Lifecycle + UI contract, flattened into owned data for the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusBody {
    pub version: String,
    pub phase: String,
    pub degraded_reason: Option<String>,
    pub active_session: Option<String>,
    pub fallback_attempted: bool,
    pub last_error_code: Option<String>,
    pub icon: String,
    pub status_copy: Option<String>,
    pub actions: Vec<String>,
}

/// One row of `quedo history list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    pub id: String,
    pub created_at_ms: u64,
    pub duration_ms: u64,
    pub status: String,
    pub provider: Option<String>,
    pub preview: Option<String>,
}

/// Check results for `quedo doctor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecksBody {
    pub primary_ok: bool,
    pub fallback_ok: bool,
    pub microphone_ok: bool,
    pub storage_ok: bool,
    pub phase: String,
}

/// Response from daemon to CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello { version: String },
    Status { body: StatusBody },
    Sessions { sessions: Vec<SessionEntry> },
    Transcript { text: Option<String> },
    AudioPath { path: Option<String> },
    Transcribed { text: String, provider: String },
    Checks { body: ChecksBody },
    BundlePath { path: String },
    Ok,
    Error { message: String },
    /// Forward-compat: unknown responses decode here instead of failing.
    #[serde(other)]
    Unknown,
}

/// Convenience used by both sides of the socket.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

pub fn decode_request(line: &str) -> serde_json::Result<Request> {
    serde_json::from_str(line)
}

pub fn decode_response(line: &str) -> serde_json::Result<Response> {
    serde_json::from_str(line)
}

/// Opaque attribute map used in diagnostics-bearing responses.
pub type AttrMap = BTreeMap<String, String>;

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
