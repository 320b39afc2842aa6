// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process commands: start, stop, restart, status, logs, doctor.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use quedo_daemon::logging::tail_lines;
use quedo_daemon::protocol::{Request, Response};
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// How long `quedo start` waits for the READY handshake.
const START_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn start() -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    if client.is_running().await {
        println!("quedod is already running");
        return Ok(());
    }

    let binary = daemon_binary()?;
    let mut child = Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ExitError::io(format!("could not spawn {}: {e}", binary.display())))?;

    // Wait for the READY line, then let the process go.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExitError::io("quedod produced no stdout handle"))?;
    let ready = std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if line.trim() == "READY" {
                return true;
            }
        }
        false
    });

    let deadline = Instant::now() + START_TIMEOUT;
    loop {
        if ready.is_finished() {
            return match ready.join() {
                Ok(true) => {
                    println!("quedod started");
                    Ok(())
                }
                _ => Err(ExitError::unavailable(
                    "quedod exited before becoming ready (see `quedo logs`)",
                )),
            };
        }
        if Instant::now() >= deadline {
            return Err(ExitError::unavailable("quedod did not become ready in time"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

pub async fn stop() -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.request(Request::Shutdown).await {
        Ok(Response::Ok) => {
            println!("quedod stopped");
            Ok(())
        }
        Ok(other) => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
        Err(_) => {
            // Socket is gone; fall back to the pid file.
            match read_pid(&client)? {
                Some(pid) => {
                    use nix::sys::signal::{kill, Signal};
                    use nix::unistd::Pid;
                    kill(Pid::from_raw(pid), Signal::SIGTERM)
                        .map_err(|e| ExitError::io(format!("could not signal {pid}: {e}")))?;
                    println!("sent SIGTERM to quedod ({pid})");
                    Ok(())
                }
                None => Err(ExitError::unavailable("quedod is not running")),
            }
        }
    }
}

pub async fn restart() -> Result<(), ExitError> {
    // A daemon that is not running is fine; start it fresh.
    match stop().await {
        Ok(()) => tokio::time::sleep(Duration::from_millis(300)).await,
        Err(e) if e.code == crate::exit_error::EX_UNAVAILABLE => {}
        Err(e) => return Err(e),
    }
    start().await
}

pub async fn status() -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.expect_ok(Request::Status).await? {
        Response::Status { body } => {
            println!("quedod {}", body.version);
            match &body.degraded_reason {
                Some(reason) => println!("phase: {} ({reason})", body.phase),
                None => println!("phase: {}", body.phase),
            }
            if let Some(copy) = &body.status_copy {
                println!("status: {copy}");
            }
            if let Some(session) = &body.active_session {
                println!("session: {session}");
            }
            if let Some(code) = &body.last_error_code {
                println!("last error: {code}");
            }
            if !body.actions.is_empty() {
                println!("actions: {}", body.actions.join(", "));
            }
            Ok(())
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}

pub fn logs(to_stderr: bool) -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    let lines = tail_lines(&client.config().log_path, 500);
    if lines.is_empty() {
        println!("no log output yet at {}", client.config().log_path.display());
        return Ok(());
    }
    for line in lines {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn doctor() -> Result<(), ExitError> {
    let client = DaemonClient::new()?;
    match client.expect_ok(Request::RunChecks).await? {
        Response::Checks { body } => {
            let mark = |ok: bool| if ok { "ok" } else { "FAILED" };
            println!("primary provider:  {}", mark(body.primary_ok));
            println!("fallback provider: {}", mark(body.fallback_ok));
            println!("microphone:        {}", mark(body.microphone_ok));
            println!("storage:           {}", mark(body.storage_ok));
            println!("phase:             {}", body.phase);
            Ok(())
        }
        other => Err(ExitError::io(format!("unexpected reply: {other:?}"))),
    }
}

fn daemon_binary() -> Result<std::path::PathBuf, ExitError> {
    // quedod ships next to quedo.
    let own = std::env::current_exe()
        .map_err(|e| ExitError::io(format!("cannot locate own binary: {e}")))?;
    let sibling = own.with_file_name("quedod");
    if sibling.is_file() {
        return Ok(sibling);
    }
    // Fall back to PATH lookup.
    Ok(std::path::PathBuf::from("quedod"))
}

fn read_pid(client: &DaemonClient) -> Result<Option<i32>, ExitError> {
    match std::fs::read_to_string(&client.config().lock_path) {
        Ok(content) => Ok(content.trim().parse::<i32>().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ExitError::io(format!("cannot read pid file: {e}"))),
    }
}
