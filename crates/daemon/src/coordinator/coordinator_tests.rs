// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator tests run the full session flow against fakes: scripted
//! providers, a scripted input device, recording output sinks, and a
//! real history store in a scratch directory. Real time, frozen fake
//! clock: nothing here sleeps for long.

use super::*;
use quedo_adapters::provider::{FakeProvider, ProviderError, ProviderRegistry};
use quedo_adapters::{FakeClipboard, FakeNotifier, FakePaste};
use quedo_capture::FakeInput;
use quedo_config::{ConfigPaths, NoLegacySecrets};
use quedo_core::clock::FakeClock;
use quedo_core::settings::{DistributionProfile, OutputMode};
use quedo_diagnostics::MemorySink;
use std::sync::Arc;

struct Rig {
    coordinator: Arc<Coordinator<FakeClock>>,
    input: FakeInput,
    groq: FakeProvider,
    openai: FakeProvider,
    clipboard: FakeClipboard,
    paste: FakePaste,
    notifier: FakeNotifier,
    sink: MemorySink,
    _clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn rig_with(settings: AppSettings) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();

    let paths = ConfigPaths::rooted_at(dir.path());
    let config = Arc::new(ConfigStore::new(paths.clone(), Box::new(NoLegacySecrets)));

    let (store, _) = HistoryStore::open(
        &paths.db_file(),
        &paths.support_dir,
        clock.epoch_ms(),
    )
    .unwrap();
    let store = Arc::new(store);

    let input = FakeInput::new();
    let capture = CaptureEngine::new(
        Arc::new(input.clone()),
        clock.clone(),
        dir.path().join("tmp"),
    );

    let groq = FakeProvider::new(ProviderKind::Groq);
    let openai = FakeProvider::new(ProviderKind::OpenAi);
    let mut registry = ProviderRegistry::new();
    registry.insert(Arc::new(groq.clone()));
    registry.insert(Arc::new(openai.clone()));
    let pipeline = TranscriptionPipeline::new(registry, clock.clone());

    let clipboard = FakeClipboard::new();
    let paste = FakePaste::new();
    let router = OutputRouter::new(Box::new(clipboard.clone()), Box::new(paste.clone()));

    let sink = MemorySink::new();
    let diag = Arc::new(DiagnosticsCenter::new(clock.clone(), Arc::new(sink.clone())));
    let notifier = FakeNotifier::new();

    let coordinator = Arc::new(Coordinator::new(CoordinatorDeps {
        clock: clock.clone(),
        capture,
        pipeline,
        router,
        store,
        diag,
        notifier: Arc::new(notifier.clone()),
        config,
        settings,
        log_path: dir.path().join("support/logs/app.log"),
    }));

    Rig {
        coordinator,
        input,
        groq,
        openai,
        clipboard,
        paste,
        notifier,
        sink,
        _clock: clock,
        _dir: dir,
    }
}

fn rig() -> Rig {
    rig_with(AppSettings::default())
}

async fn boot(rig: &Rig) {
    rig.coordinator.finish_boot(false, false).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
}

/// Emit frames shortly after the engine opens the stream so
/// `wait_first_frame` sees audio.
fn feed_frames(input: &FakeInput) {
    let input = input.clone();
    tokio::spawn(async move {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(15)).await;
            input.emit_frames(480);
        }
    });
}

fn transitions(sink: &MemorySink) -> Vec<(String, String)> {
    sink.events()
        .iter()
        .filter(|e| e.name == "lifecycle_transition")
        .map(|e| {
            (
                e.attrs.get("from").cloned().unwrap_or_default(),
                e.attrs.get("to").cloned().unwrap_or_default(),
            )
        })
        .collect()
}

#[tokio::test]
async fn happy_path_toggle_session() {
    let rig = rig();
    rig.groq.push_ok("Thanks for watching. hello world");
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Recording);
    assert!(rig.coordinator.snapshot().active_session.is_some());

    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.active_session, None);
    assert!(!snapshot.fallback_attempted);

    // Cleanup ran before delivery.
    assert_eq!(rig.clipboard.last().unwrap(), "hello world");
    assert_eq!(rig.paste.paste_count(), 0);

    // The documented transition path.
    assert_eq!(
        transitions(&rig.sink),
        vec![
            ("booting".to_string(), "ready".to_string()),
            ("ready".to_string(), "arming".to_string()),
            ("arming".to_string(), "recording".to_string()),
            ("recording".to_string(), "processing".to_string()),
            ("processing".to_string(), "outputting".to_string()),
            ("outputting".to_string(), "ready".to_string()),
        ]
    );

    // Exactly one successful session in history, temp artifact ingested.
    let sessions = rig.coordinator.store().list_sessions(10).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Success);
    assert_eq!(sessions[0].preview.as_deref(), Some("hello world"));
}

#[tokio::test]
async fn fallback_path_visits_provider_fallback_and_records_the_switch() {
    let rig = rig();
    // Terminal primary failure: straight to fallback, no retry sleep.
    rig.groq.push_err(ProviderError::Auth { status: 401 });
    rig.openai.push_ok("hello from fallback");
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;

    assert_eq!(rig.clipboard.last().unwrap(), "hello from fallback");
    let path: Vec<String> = transitions(&rig.sink).into_iter().map(|(_, to)| to).collect();
    assert!(path.contains(&"providerFallback".to_string()));

    let events = rig.sink.events();
    let switched = events.iter().find(|e| e.name == "provider_switched").unwrap();
    assert_eq!(switched.attrs.get("primary").unwrap(), "groq");
    assert_eq!(switched.attrs.get("fallback").unwrap(), "openai");

    let sessions = rig.coordinator.store().list_sessions(1).unwrap();
    assert_eq!(sessions[0].provider_used, Some(ProviderKind::OpenAi));
    // end_session cleared the flag after the save.
    assert!(!rig.coordinator.snapshot().fallback_attempted);
}

#[tokio::test]
async fn no_input_device_goes_degraded_with_the_documented_code() {
    let rig = rig();
    rig.input.set_channels(0);
    boot(&rig).await;

    rig.coordinator.start_session().await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Degraded);
    assert_eq!(snapshot.degraded_reason, Some(DegradedReason::NoInputDevice));
    assert_eq!(snapshot.last_error_code.as_deref(), Some("capture_open_failed"));
    assert_eq!(snapshot.active_session, None);

    assert_eq!(
        rig.sink.metric_total("session_start_failed_total", "reason", "capture_open_failed"),
        1.0
    );
    assert!(!rig.notifier.sent().is_empty());
}

#[tokio::test]
async fn both_providers_failing_leaves_retry_available_with_the_artifact() {
    let rig = rig();
    rig.groq.push_err(ProviderError::Auth { status: 401 });
    rig.openai.push_err(ProviderError::Auth { status: 403 });
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::RetryAvailable);
    assert!(snapshot.active_session.is_some(), "retry keeps the session");
    assert_eq!(snapshot.last_error_code.as_deref(), Some("both_providers_failed"));

    // Retry succeeds from the same artifact.
    rig.groq.push_ok("recovered text");
    rig.coordinator.handle_hotkey(HotkeyAction::Retry, Edge::Pressed).await;

    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
    assert_eq!(rig.clipboard.last().unwrap(), "recovered text");
    let sessions = rig.coordinator.store().list_sessions(10).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Success);
}

#[tokio::test]
async fn cancel_during_recording_discards_everything() {
    let rig = rig();
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Recording);

    rig.coordinator.handle_hotkey(HotkeyAction::Cancel, Edge::Pressed).await;
    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.active_session, None);
    assert!(rig.coordinator.store().list_sessions(10).unwrap().is_empty());
    assert!(rig.clipboard.writes().is_empty());
}

#[tokio::test]
async fn cancel_from_retry_available_discards_the_artifact() {
    let rig = rig();
    rig.groq.push_err(ProviderError::Auth { status: 401 });
    rig.openai.push_err(ProviderError::Auth { status: 403 });
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::RetryAvailable);

    rig.coordinator.handle_hotkey(HotkeyAction::Cancel, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
    assert_eq!(rig.coordinator.snapshot().active_session, None);
}

#[tokio::test]
async fn route_change_during_recording_fails_the_stop_cleanly() {
    let rig = rig();
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_signal(SystemSignal::ConfigurationChanged).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.active_session, None);
    assert!(rig.coordinator.store().list_sessions(10).unwrap().is_empty());
    assert!(rig
        .sink
        .events()
        .iter()
        .any(|e| e.name == "session_failed"));
}

#[tokio::test]
async fn paste_denied_still_counts_the_clipboard_delivery() {
    let mut settings = AppSettings::default();
    settings.output = OutputMode::Paste;
    settings.profile = DistributionProfile::Direct;
    let rig = rig_with(settings);
    rig.groq.push_ok("pasted text");
    rig.paste.set_granted(false);
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.last_error_code.as_deref(), Some("paste_denied"));
    assert_eq!(rig.clipboard.last().unwrap(), "pasted text");

    let sessions = rig.coordinator.store().list_sessions(1).unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Success);
    assert!(!rig.notifier.sent().is_empty());
}

#[tokio::test]
async fn run_checks_recovers_a_degraded_daemon() {
    let rig = rig();
    rig.input.set_channels(0);
    boot(&rig).await;
    rig.coordinator.start_session().await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Degraded);

    // Microphone is back.
    rig.input.set_channels(1);
    let (primary_ok, fallback_ok, microphone_ok, storage_ok) =
        rig.coordinator.run_checks().await;
    assert!(primary_ok && fallback_ok && microphone_ok && storage_ok);

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.last_error_code, None);
    assert!(rig.sink.events().iter().any(|e| e.name == "permissions_recovered"));
}

#[tokio::test]
async fn db_recovery_boots_into_one_shot_degraded() {
    let rig = rig();
    rig.coordinator.finish_boot(true, false).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Degraded);
    assert_eq!(snapshot.degraded_reason, Some(DegradedReason::InternalError));
    assert_eq!(snapshot.last_error_code.as_deref(), Some("db_corrupt_recovered"));
    assert!(rig.sink.events().iter().any(|e| e.name == "db_corruption_recovered"));

    let (_, _, _, _) = rig.coordinator.run_checks().await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
}

#[tokio::test]
async fn fresh_install_boots_into_onboarding() {
    let rig = rig();
    rig.coordinator.finish_boot(false, true).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Onboarding);
}

#[tokio::test]
async fn retry_and_cancel_are_ignored_when_idle() {
    let rig = rig();
    boot(&rig).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Retry, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Cancel, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
}

#[tokio::test]
async fn hold_mode_records_between_press_and_release() {
    let mut settings = AppSettings::default();
    settings.interaction = quedo_core::settings::InteractionMode::Hold;
    let rig = rig_with(settings);
    rig.groq.push_ok("held text");
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Recording);

    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Released).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
    assert_eq!(rig.clipboard.last().unwrap(), "held text");
}

#[tokio::test]
async fn retranscription_creates_a_new_session() {
    let rig = rig();
    rig.groq.push_ok("first pass");
    boot(&rig).await;

    feed_frames(&rig.input);
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    let original = rig.coordinator.store().list_sessions(1).unwrap()[0].id.clone();

    rig.groq.push_ok("second pass");
    let (new_id, text) =
        rig.coordinator.retranscribe(&original).await.unwrap().unwrap();
    assert_ne!(new_id, original);
    assert_eq!(text, "second pass");

    let sessions = rig.coordinator.store().list_sessions(10).unwrap();
    assert_eq!(sessions.len(), 2);
    // The original is immutable: its transcript is unchanged.
    assert_eq!(
        rig.coordinator.store().transcript_text(&original).unwrap().unwrap(),
        "first pass"
    );
}

#[tokio::test]
async fn export_bundle_writes_an_archive() {
    let rig = rig();
    boot(&rig).await;
    let path = rig.coordinator.export_bundle().unwrap();
    assert!(path.exists());
    assert_eq!(path.extension().unwrap(), "zip");
}

#[tokio::test]
async fn shutdown_is_terminal() {
    let rig = rig();
    boot(&rig).await;
    rig.coordinator.begin_shutdown().await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::ShuttingDown);
    // Nothing routes any more.
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::ShuttingDown);
}
