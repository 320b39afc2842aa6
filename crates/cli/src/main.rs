// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! quedo: CLI front end for the Quedo daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::{ExitError, EX_USAGE};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "quedo", version, about = "Background voice-to-text assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the background daemon.
    Start,
    /// Stop the background daemon.
    Stop,
    /// Restart the background daemon.
    Restart,
    /// Show daemon and lifecycle status.
    Status,
    /// Print the daemon log tail.
    Logs {
        /// Write to stderr instead of stdout.
        #[arg(long)]
        stderr: bool,
    },
    /// Run connectivity, microphone, and storage checks.
    Doctor,
    /// Show or edit the configuration.
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommand,
    },
    /// Inspect and replay past sessions.
    History {
        #[command(subcommand)]
        command: commands::history::HistoryCommand,
    },
    /// Transcribe an audio file through the daemon.
    Transcribe {
        /// Path to the audio file.
        path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not usage errors.
            if e.use_stderr() {
                let _ = e.print();
                return ExitCode::from(EX_USAGE as u8);
            }
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("quedo: {error}");
            ExitCode::from(error.code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    match cli.command {
        Command::Start => commands::daemon::start().await,
        Command::Stop => commands::daemon::stop().await,
        Command::Restart => commands::daemon::restart().await,
        Command::Status => commands::daemon::status().await,
        Command::Logs { stderr } => commands::daemon::logs(stderr),
        Command::Doctor => commands::daemon::doctor().await,
        Command::Config { command } => commands::config::run(command).await,
        Command::History { command } => commands::history::run(command).await,
        Command::Transcribe { path } => commands::transcribe::run(&path).await,
    }
}
