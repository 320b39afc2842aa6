// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! quedod: the Quedo background daemon.

use quedo_daemon::{env, lifecycle, listener, logging, watch};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match lifecycle::DaemonConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("quedod: {e}");
            return ExitCode::from(78); // EX_CONFIG
        }
    };

    let _log_guard = logging::init(config.log_path.clone(), &env::log_filter());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("quedod: could not start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config))
}

async fn run(config: lifecycle::DaemonConfig) -> ExitCode {
    let (state, socket) = match lifecycle::startup(config).await {
        Ok(ready) => ready,
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("quedod: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the watcher alive for the whole run.
    let _watcher = match watch::spawn_config_watch(
        &state.config.paths.config_dir.clone(),
        state.coordinator.clone(),
    ) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "config watcher unavailable");
            None
        }
    };

    // READY handshake for `quedo start`.
    println!("READY");

    let shutdown = CancellationToken::new();
    let serve = tokio::spawn(listener::serve(
        socket,
        state.coordinator.clone(),
        state.hotkeys.clone(),
        shutdown.clone(),
    ));

    wait_for_stop(&shutdown).await;
    shutdown.cancel();
    let _ = serve.await;
    state.shutdown().await;
    info!("bye");
    ExitCode::SUCCESS
}

/// Block until SIGTERM/SIGINT or a Shutdown request cancels the token.
async fn wait_for_stop(shutdown: &CancellationToken) {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => signal,
        Err(e) => {
            error!(error = %e, "could not install SIGTERM handler");
            shutdown.cancelled().await;
            return;
        }
    };
    tokio::select! {
        _ = shutdown.cancelled() => info!("shutdown requested over the socket"),
        _ = sigterm.recv() => info!("SIGTERM received"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "ctrl-c handler failed");
            } else {
                info!("interrupt received");
            }
        }
    }
}
