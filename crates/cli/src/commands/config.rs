// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `quedo config show|edit` — works without a running daemon; edits are
//! pushed to the daemon when one is up.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use quedo_config::{ConfigPaths, ConfigStore, NoLegacySecrets};
use quedo_daemon::protocol::Request;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the redacted configuration snapshot.
    Show,
    /// Open config.env in $EDITOR and reload the daemon.
    Edit,
}

pub async fn run(command: ConfigCommand) -> Result<(), ExitError> {
    match command {
        ConfigCommand::Show => show(),
        ConfigCommand::Edit => edit().await,
    }
}

fn store() -> Result<ConfigStore, ExitError> {
    let paths = ConfigPaths::resolve()
        .map_err(|e| ExitError::io(format!("cannot resolve paths: {e}")))?;
    // The CLI never triggers keychain prompts; secrets it cannot see
    // simply show as absent.
    Ok(ConfigStore::new(paths, Box::new(NoLegacySecrets)))
}

fn show() -> Result<(), ExitError> {
    let store = store()?;
    let snapshot = store
        .redacted_snapshot()
        .map_err(|e| ExitError::io(format!("cannot read configuration: {e}")))?;
    for (key, value) in snapshot {
        println!("{key}={value}");
    }
    Ok(())
}

async fn edit() -> Result<(), ExitError> {
    let store = store()?;
    let path = store.paths().env_file();
    if !path.exists() {
        // Seed the file so the editor has the full key set to work with.
        let settings = store
            .load()
            .map_err(|e| ExitError::io(format!("cannot load settings: {e}")))?;
        store
            .save(&settings)
            .map_err(|e| ExitError::io(format!("cannot write config.env: {e}")))?;
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .map_err(|e| ExitError::io(format!("could not launch {editor}: {e}")))?;
    if !status.success() {
        return Err(ExitError::io(format!("{editor} exited with {status}")));
    }

    // Best effort: a running daemon picks the change up immediately.
    if let Ok(client) = DaemonClient::new() {
        if client.is_running().await {
            let _ = client.request(Request::ReloadSettings).await;
            println!("configuration reloaded");
        }
    }
    Ok(())
}
