// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::coordinator::CoordinatorDeps;
use quedo_adapters::provider::{FakeProvider, ProviderRegistry};
use quedo_adapters::{FakeClipboard, FakeNotifier, FakePaste};
use quedo_adapters::output::OutputRouter;
use quedo_capture::{CaptureEngine, FakeInput};
use quedo_config::{ConfigPaths, ConfigStore, NoLegacySecrets};
use quedo_core::clock::FakeClock;
use quedo_core::settings::{AppSettings, ProviderKind};
use quedo_diagnostics::{DiagnosticsCenter, MemorySink};
use quedo_hotkeys::{FakeBackend, HotkeyLog};
use quedo_pipeline::TranscriptionPipeline;
use quedo_storage::HistoryStore;

struct Rig {
    coordinator: Arc<Coordinator<FakeClock>>,
    hotkeys: Arc<HotkeyService<FakeClock>>,
    groq: FakeProvider,
    shutdown: CancellationToken,
    _dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let paths = ConfigPaths::rooted_at(dir.path());
    let config = Arc::new(ConfigStore::new(paths.clone(), Box::new(NoLegacySecrets)));
    let (store, _) =
        HistoryStore::open(&paths.db_file(), &paths.support_dir, clock.epoch_ms()).unwrap();

    let groq = FakeProvider::new(ProviderKind::Groq);
    let openai = FakeProvider::new(ProviderKind::OpenAi);
    let mut registry = ProviderRegistry::new();
    registry.insert(Arc::new(groq.clone()));
    registry.insert(Arc::new(openai.clone()));

    let coordinator = Arc::new(Coordinator::new(CoordinatorDeps {
        clock: clock.clone(),
        capture: CaptureEngine::new(
            Arc::new(FakeInput::new()),
            clock.clone(),
            dir.path().join("tmp"),
        ),
        pipeline: TranscriptionPipeline::new(registry, clock.clone()),
        router: OutputRouter::new(
            Box::new(FakeClipboard::new()),
            Box::new(FakePaste::new()),
        ),
        store: Arc::new(store),
        diag: Arc::new(DiagnosticsCenter::new(
            clock.clone(),
            Arc::new(MemorySink::new()),
        )),
        notifier: Arc::new(FakeNotifier::new()),
        config,
        settings: AppSettings::default(),
        log_path: dir.path().join("support/logs/app.log"),
    }));

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let native = FakeBackend::new("native", tx.clone());
    let monitor = FakeBackend::new("monitor", tx);
    let hotkeys = Arc::new(HotkeyService::new(
        Arc::new(native),
        Arc::new(monitor),
        rx,
        clock,
        HotkeyLog::disabled(),
    ));

    Rig { coordinator, hotkeys, groq, shutdown: CancellationToken::new(), _dir: dir }
}

async fn ask(rig: &Rig, request: Request) -> Response {
    handle_request(request, &rig.coordinator, &rig.hotkeys, &rig.shutdown).await
}

#[tokio::test]
async fn ping_pongs() {
    let rig = rig();
    assert_eq!(ask(&rig, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn hello_reports_the_daemon_version() {
    let rig = rig();
    match ask(&rig, Request::Hello { version: "0.0.1".into() }).await {
        Response::Hello { version } => assert_eq!(version, PROTOCOL_VERSION),
        other => panic!("expected Hello, got {other:?}"),
    }
}

#[tokio::test]
async fn status_carries_the_ui_contract() {
    let rig = rig();
    rig.coordinator.finish_boot(false, false).await;
    match ask(&rig, Request::Status).await {
        Response::Status { body } => {
            assert_eq!(body.phase, "ready");
            assert_eq!(body.icon, "mic");
            assert!(body.actions.contains(&"startRecording".to_string()));
            assert_eq!(body.active_session, None);
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_cancels_the_serve_token() {
    let rig = rig();
    rig.coordinator.finish_boot(false, false).await;
    assert_eq!(ask(&rig, Request::Shutdown).await, Response::Ok);
    assert!(rig.shutdown.is_cancelled());
    assert_eq!(rig.coordinator.snapshot().phase.as_str(), "shuttingDown");
}

#[tokio::test]
async fn empty_history_yields_empty_list_and_index_errors() {
    let rig = rig();
    match ask(&rig, Request::ListSessions { limit: 10 }).await {
        Response::Sessions { sessions } => assert!(sessions.is_empty()),
        other => panic!("expected Sessions, got {other:?}"),
    }
    match ask(&rig, Request::Transcript { index: 0 }).await {
        Response::Error { message } => assert!(message.contains("no session")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn transcribe_file_round_trips_through_the_pipeline() {
    let rig = rig();
    rig.coordinator.finish_boot(false, false).await;
    rig.groq.push_ok("file text");

    // A tiny valid wav for the chunker.
    let path = rig._dir.path().join("clip.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..8 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    match ask(&rig, Request::TranscribeFile { path: path.to_string_lossy().into() }).await {
        Response::Transcribed { text, provider } => {
            assert_eq!(text, "file text");
            assert_eq!(provider, "groq");
        }
        other => panic!("expected Transcribed, got {other:?}"),
    }
}

#[tokio::test]
async fn transcribe_file_rejects_missing_paths() {
    let rig = rig();
    match ask(&rig, Request::TranscribeFile { path: "/definitely/missing.wav".into() }).await {
        Response::Error { message } => assert!(message.contains("no such file")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_request_lines_do_not_kill_the_connection_handler() {
    // Decoding happens before handle_request; emulate the parse error.
    let error = crate::protocol::decode_request("this is not json");
    assert!(error.is_err());
}
