// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `quedo transcribe <path>` — one-off transcription through the daemon.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use quedo_daemon::protocol::{Request, Response};

pub async fn run(path: &str) -> Result<(), ExitError> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| ExitError::data(format!("cannot read {path}: {e}")))?;

    let client = DaemonClient::new()?;
    match client
        .expect_ok(Request::TranscribeFile { path: absolute.to_string_lossy().into_owned() })
        .await?
    {
        Response::Transcribed { text, provider } => {
            eprintln!("(transcribed via {provider})");
            println!("{text}");
            Ok(())
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}
