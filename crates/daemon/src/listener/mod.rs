// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener serving the CLI protocol.

use crate::coordinator::Coordinator;
use crate::env::PROTOCOL_VERSION;
use crate::lifecycle;
use crate::protocol::{ChecksBody, Request, Response, SessionEntry, StatusBody};
use quedo_capture::SystemSignal;
use quedo_core::clock::Clock;
use quedo_core::error_code;
use quedo_core::lifecycle::DegradedReason;
use quedo_core::ui::ui_contract;
use quedo_hotkeys::HotkeyService;
use quedo_storage::SessionSummary;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Accept loop. Runs until `shutdown` is cancelled.
pub async fn serve<C: Clock>(
    listener: UnixListener,
    coordinator: Arc<Coordinator<C>>,
    hotkeys: Arc<HotkeyService<C>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let coordinator = coordinator.clone();
                    let hotkeys = hotkeys.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, coordinator, hotkeys, shutdown).await
                        {
                            debug!(error = %e, "connection closed with error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            },
        }
    }
}

async fn handle_connection<C: Clock>(
    stream: UnixStream,
    coordinator: Arc<Coordinator<C>>,
    hotkeys: Arc<HotkeyService<C>>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (response, stop_after) = match crate::protocol::decode_request(&line) {
            Ok(request) => {
                let stop = matches!(request, Request::Shutdown);
                (handle_request(request, &coordinator, &hotkeys, &shutdown).await, stop)
            }
            Err(e) => (Response::Error { message: format!("bad request: {e}") }, false),
        };
        let mut encoded = crate::protocol::encode(&response)
            .unwrap_or_else(|_| r#"{"type":"Error","message":"encode failed"}"#.to_string());
        encoded.push('\n');
        write_half.write_all(encoded.as_bytes()).await?;
        if stop_after {
            break;
        }
    }
    Ok(())
}

/// One request, one response.
pub async fn handle_request<C: Clock>(
    request: Request,
    coordinator: &Arc<Coordinator<C>>,
    hotkeys: &Arc<HotkeyService<C>>,
    shutdown: &CancellationToken,
) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { version } => {
            debug!(client = %version, "hello");
            Response::Hello { version: PROTOCOL_VERSION.to_string() }
        }
        Request::Status => Response::Status { body: status_body(coordinator) },
        Request::Shutdown => {
            coordinator.begin_shutdown().await;
            shutdown.cancel();
            Response::Ok
        }
        Request::RunChecks => {
            let (primary_ok, fallback_ok, microphone_ok, storage_ok) =
                coordinator.run_checks().await;
            Response::Checks {
                body: ChecksBody {
                    primary_ok,
                    fallback_ok,
                    microphone_ok,
                    storage_ok,
                    phase: coordinator.snapshot().phase.as_str().to_string(),
                },
            }
        }
        Request::ReloadSettings => {
            match lifecycle::reload_settings(coordinator, "config.env").await {
                Ok(_) => Response::Ok,
                Err(e) => Response::Error { message: e.to_string() },
            }
        }
        Request::ListSessions { limit } => match coordinator.store().list_sessions(limit) {
            Ok(sessions) => Response::Sessions {
                sessions: sessions.iter().map(session_entry).collect(),
            },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Request::Transcript { index } => match nth_session(coordinator, index) {
            Some(summary) => match coordinator.store().transcript_text(&summary.id) {
                Ok(text) => Response::Transcript { text },
                Err(e) => Response::Error { message: e.to_string() },
            },
            None => Response::Error { message: format!("no session at index {index}") },
        },
        Request::AudioPath { index } => match nth_session(coordinator, index) {
            Some(summary) => match coordinator.store().primary_audio_path(&summary.id) {
                Ok(path) => Response::AudioPath {
                    path: path.map(|p| p.to_string_lossy().into_owned()),
                },
                Err(e) => Response::Error { message: e.to_string() },
            },
            None => Response::Error { message: format!("no session at index {index}") },
        },
        Request::TranscribeFile { path } => {
            let path = std::path::PathBuf::from(path);
            if !path.is_file() {
                return Response::Error { message: format!("no such file: {}", path.display()) };
            }
            match coordinator.transcribe_file(&path).await {
                Ok((text, provider)) => {
                    Response::Transcribed { text, provider: provider.to_string() }
                }
                Err(e) => Response::Error { message: e.to_string() },
            }
        }
        Request::Retranscribe { index } => match nth_session(coordinator, index) {
            Some(summary) => match coordinator.retranscribe(&summary.id).await {
                Ok(Some((_, text))) => {
                    let provider = coordinator.settings().provider.primary.to_string();
                    Response::Transcribed { text, provider }
                }
                Ok(None) => {
                    Response::Error { message: "session has no audio to re-transcribe".into() }
                }
                Err(e) => Response::Error { message: e.to_string() },
            },
            None => Response::Error { message: format!("no session at index {index}") },
        },
        Request::ExportBundle => match coordinator.export_bundle() {
            Ok(path) => Response::BundlePath { path: path.to_string_lossy().into_owned() },
            Err(message) => Response::Error { message },
        },
        Request::SystemSignal { signal } => {
            coordinator.handle_signal(signal).await;
            if signal == SystemSignal::DidWake {
                if let Err(e) = hotkeys.recover_after_wake().await {
                    warn!(error = %e, "hotkey recovery after wake failed");
                    coordinator
                        .degrade(
                            DegradedReason::HotkeyFailure,
                            error_code::HOTKEY_REGISTRATION_FAILED,
                        )
                        .await;
                }
            }
            Response::Ok
        }
    }
}

fn status_body<C: Clock>(coordinator: &Coordinator<C>) -> StatusBody {
    let snapshot = coordinator.snapshot();
    let contract = ui_contract(snapshot.phase, snapshot.degraded_reason);
    StatusBody {
        version: PROTOCOL_VERSION.to_string(),
        phase: snapshot.phase.as_str().to_string(),
        degraded_reason: snapshot.degraded_reason.map(|r| r.as_str().to_string()),
        active_session: snapshot.active_session.map(|id| id.to_string()),
        fallback_attempted: snapshot.fallback_attempted,
        last_error_code: snapshot.last_error_code,
        icon: contract.icon.to_string(),
        status_copy: contract.status.map(str::to_string),
        actions: contract
            .actions
            .iter()
            .map(|action| {
                serde_json::to_value(action)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            })
            .collect(),
    }
}

fn session_entry(summary: &SessionSummary) -> SessionEntry {
    SessionEntry {
        id: summary.id.to_string(),
        created_at_ms: summary.created_at_ms,
        duration_ms: summary.duration_ms,
        status: summary.status.as_str().to_string(),
        provider: summary.provider_used.map(|p| p.to_string()),
        preview: summary.preview.clone(),
    }
}

fn nth_session<C: Clock>(
    coordinator: &Arc<Coordinator<C>>,
    index: usize,
) -> Option<SessionSummary> {
    coordinator.store().list_sessions(index + 1).ok()?.into_iter().nth(index)
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
