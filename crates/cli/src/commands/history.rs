// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `quedo history list|play <n>|transcribe <n>` — indices are 1-based
//! as printed by `list`, newest first.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use quedo_daemon::protocol::{Request, Response};

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List recent sessions, newest first.
    List {
        /// Maximum number of rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Play the n-th session's recording.
    Play { n: usize },
    /// Re-transcribe the n-th session into a new session.
    Transcribe { n: usize },
}

pub async fn run(command: HistoryCommand) -> Result<(), ExitError> {
    match command {
        HistoryCommand::List { limit } => list(limit).await,
        HistoryCommand::Play { n } => play(index_of(n)?).await,
        HistoryCommand::Transcribe { n } => transcribe(index_of(n)?).await,
    }
}

/// 1-based UI index → 0-based protocol index.
fn index_of(n: usize) -> Result<usize, ExitError> {
    n.checked_sub(1).ok_or_else(|| ExitError::data("indices start at 1"))
}

async fn list(limit: usize) -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.expect_ok(Request::ListSessions { limit }).await? {
        Response::Sessions { sessions } => {
            if sessions.is_empty() {
                println!("no sessions yet");
                return Ok(());
            }
            for (position, session) in sessions.iter().enumerate() {
                let seconds = session.duration_ms / 1000;
                let preview = session.preview.as_deref().unwrap_or("—");
                println!(
                    "{:>3}. [{}] {:>4}s {:<9} {}",
                    position + 1,
                    format_time(session.created_at_ms),
                    seconds,
                    session.status,
                    preview
                );
            }
            Ok(())
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}

async fn play(index: usize) -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.expect_ok(Request::AudioPath { index }).await? {
        Response::AudioPath { path: Some(path) } => {
            let player = platform_player();
            let status = std::process::Command::new(player)
                .arg(&path)
                .status()
                .map_err(|e| ExitError::io(format!("could not launch {player}: {e}")))?;
            if status.success() {
                Ok(())
            } else {
                Err(ExitError::io(format!("{player} exited with {status}")))
            }
        }
        Response::AudioPath { path: None } => {
            Err(ExitError::data("this session has no stored audio"))
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}

async fn transcribe(index: usize) -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.expect_ok(Request::Retranscribe { index }).await? {
        Response::Transcribed { text, provider } => {
            eprintln!("(re-transcribed via {provider})");
            println!("{text}");
            Ok(())
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}

fn platform_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else if cfg!(target_os = "windows") {
        "wmplayer"
    } else {
        "aplay"
    }
}

fn format_time(epoch_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}
