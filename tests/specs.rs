// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level scenario tests: the documented end-to-end flows, run
//! against the real coordinator, pipeline, and history store with fake
//! providers, a fake input device, and fake output sinks.

use quedo_adapters::output::OutputRouter;
use quedo_adapters::provider::{FakeProvider, ProviderError, ProviderRegistry};
use quedo_adapters::{FakeClipboard, FakeNotifier, FakePaste};
use quedo_capture::{CaptureEngine, FakeInput};
use quedo_config::{ConfigPaths, ConfigStore, NoLegacySecrets};
use quedo_core::clock::{Clock, FakeClock};
use quedo_core::hotkey::HotkeyAction;
use quedo_core::lifecycle::{DegradedReason, Phase};
use quedo_core::session::SessionStatus;
use quedo_core::settings::{AppSettings, ProviderKind};
use quedo_daemon::{Coordinator, CoordinatorDeps};
use quedo_diagnostics::{DiagnosticsCenter, MemorySink};
use quedo_hotkeys::Edge;
use quedo_pipeline::TranscriptionPipeline;
use quedo_storage::{legacy_session_id, migrate_legacy_history, HistoryStore, MigrationReport};
use std::sync::Arc;
use std::time::Duration;

struct Rig {
    coordinator: Arc<Coordinator<FakeClock>>,
    input: FakeInput,
    groq: FakeProvider,
    openai: FakeProvider,
    clipboard: FakeClipboard,
    sink: MemorySink,
    clock: FakeClock,
    dir: tempfile::TempDir,
}

fn rig_with(settings: AppSettings) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let paths = ConfigPaths::rooted_at(dir.path());
    let config = Arc::new(ConfigStore::new(paths.clone(), Box::new(NoLegacySecrets)));

    let (store, _) =
        HistoryStore::open(&paths.db_file(), &paths.support_dir, clock.epoch_ms()).unwrap();
    let store = Arc::new(store);

    let input = FakeInput::new();
    let capture =
        CaptureEngine::new(Arc::new(input.clone()), clock.clone(), dir.path().join("tmp"));

    let groq = FakeProvider::new(ProviderKind::Groq);
    let openai = FakeProvider::new(ProviderKind::OpenAi);
    let mut registry = ProviderRegistry::new();
    registry.insert(Arc::new(groq.clone()));
    registry.insert(Arc::new(openai.clone()));
    let pipeline = TranscriptionPipeline::new(registry, clock.clone());

    let clipboard = FakeClipboard::new();
    let router = OutputRouter::new(Box::new(clipboard.clone()), Box::new(FakePaste::new()));

    let sink = MemorySink::new();
    let diag = Arc::new(DiagnosticsCenter::new(clock.clone(), Arc::new(sink.clone())));

    let coordinator = Arc::new(Coordinator::new(CoordinatorDeps {
        clock: clock.clone(),
        capture,
        pipeline,
        router,
        store,
        diag,
        notifier: Arc::new(FakeNotifier::new()),
        config,
        settings,
        log_path: dir.path().join("support/logs/app.log"),
    }));

    Rig { coordinator, input, groq, openai, clipboard, sink, clock, dir }
}

fn rig() -> Rig {
    rig_with(AppSettings::default())
}

async fn boot(rig: &Rig) {
    rig.coordinator.finish_boot(false, false).await;
}

fn feed_frames(input: &FakeInput) {
    let input = input.clone();
    tokio::spawn(async move {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(15)).await;
            input.emit_frames(480);
        }
    });
}

async fn toggle(rig: &Rig) {
    rig.coordinator.handle_hotkey(HotkeyAction::Toggle, Edge::Pressed).await;
}

/// Scenario 1: happy-path toggle session ends with the cleaned provider
/// text on the clipboard.
#[tokio::test]
async fn happy_path_toggle() {
    let rig = rig();
    rig.groq.push_ok("hello world");
    boot(&rig).await;

    feed_frames(&rig.input);
    toggle(&rig).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Recording);

    toggle(&rig).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
    assert_eq!(rig.clipboard.last().unwrap(), "hello world");

    let names: Vec<(String, String)> = rig
        .sink
        .events()
        .iter()
        .filter(|e| e.name == "lifecycle_transition")
        .map(|e| {
            (e.attrs.get("from").cloned().unwrap(), e.attrs.get("to").cloned().unwrap())
        })
        .collect();
    assert!(names.contains(&("ready".into(), "arming".into())));
    assert!(names.contains(&("arming".into(), "recording".into())));
    assert!(names.contains(&("recording".into(), "processing".into())));
    assert!(names.contains(&("processing".into(), "outputting".into())));
    assert!(names.contains(&("outputting".into(), "ready".into())));
}

/// Scenario 2: primary 503 twice, fallback succeeds; the sticky window
/// routes the next request to the fallback first and expires at 30 s.
#[tokio::test]
async fn primary_transient_then_sticky_fallback() {
    let rig = rig();
    rig.groq.push_err(ProviderError::Transient { status: 503 });
    rig.groq.push_err(ProviderError::Transient { status: 503 });
    rig.openai.push_ok("hello world");
    boot(&rig).await;

    feed_frames(&rig.input);
    toggle(&rig).await;
    toggle(&rig).await;

    assert_eq!(rig.clipboard.last().unwrap(), "hello world");
    let saved = rig.coordinator.store().list_sessions(1).unwrap();
    assert_eq!(saved[0].provider_used, Some(ProviderKind::OpenAi));

    // Within 30 s the fallback is first; the configured primary is not
    // consulted at all.
    let groq_calls = rig.groq.call_count();
    rig.openai.push_ok("still fallback");
    rig.clock.advance(Duration::from_millis(29_999));
    feed_frames(&rig.input);
    toggle(&rig).await;
    toggle(&rig).await;
    assert_eq!(rig.clipboard.last().unwrap(), "still fallback");
    assert_eq!(rig.groq.call_count(), groq_calls);

    // The second fallback success re-armed the window; past its 30 s the
    // original primary is first again.
    rig.groq.push_ok("primary is back");
    rig.clock.advance(Duration::from_millis(30_001));
    feed_frames(&rig.input);
    toggle(&rig).await;
    toggle(&rig).await;
    assert_eq!(rig.clipboard.last().unwrap(), "primary is back");
    assert_eq!(rig.groq.call_count(), groq_calls + 1);
}

/// Scenario 3: hallucinated lead-in is scrubbed from the transcript.
#[tokio::test]
async fn hallucination_cleanup() {
    let rig = rig();
    rig.groq.push_ok("Thanks for watching. hello world");
    boot(&rig).await;

    feed_frames(&rig.input);
    toggle(&rig).await;
    toggle(&rig).await;

    assert_eq!(rig.clipboard.last().unwrap(), "hello world");
    let transcript = rig
        .coordinator
        .store()
        .list_sessions(1)
        .unwrap()
        .first()
        .and_then(|s| s.preview.clone())
        .unwrap();
    assert_eq!(transcript, "hello world");
}

/// Scenario 4: a missing input device degrades with the documented code
/// and metric.
#[tokio::test]
async fn no_input_device() {
    let rig = rig();
    rig.input.set_channels(0);
    boot(&rig).await;

    rig.coordinator.start_session().await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.phase, Phase::Degraded);
    assert_eq!(snapshot.degraded_reason, Some(DegradedReason::NoInputDevice));
    assert_eq!(snapshot.last_error_code.as_deref(), Some("capture_open_failed"));
    assert_eq!(
        rig.sink.metric_total("session_start_failed_total", "reason", "capture_open_failed"),
        1.0
    );
}

/// Scenario 5: legacy history migrates once, deterministically, and a
/// second run changes nothing.
#[tokio::test]
async fn legacy_migration_is_deterministic_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = HistoryStore::open(
        &dir.path().join("support/db/history.sqlite"),
        &dir.path().join("support"),
        1_750_000_000_000,
    )
    .unwrap();

    let folder = dir.path().join("legacy/history/2025-06-01/120000");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("recording.flac"), b"fLaC").unwrap();
    std::fs::write(folder.join("transcription.txt"), "foo").unwrap();

    let legacy_root = dir.path().join("legacy/history");
    let first = migrate_legacy_history(&store, &legacy_root, 1).unwrap();
    assert_eq!(first, MigrationReport { scanned: 1, migrated: 1, skipped: 0 });

    let id = legacy_session_id(&folder);
    let record = store.session(&id).unwrap().unwrap();
    assert_eq!(record.status, SessionStatus::Success);
    assert_eq!(record.transcript.as_deref(), Some("foo"));
    let media = store.primary_audio_path(&id).unwrap().unwrap();
    assert!(media.ends_with(format!("media/{id}/recording.flac")));
    assert!(media.exists());

    let second = migrate_legacy_history(&store, &legacy_root, 2).unwrap();
    assert_eq!(second, MigrationReport { scanned: 1, migrated: 0, skipped: 0 });
    assert_eq!(store.list_sessions(10).unwrap().len(), 1);
}

/// Scenario 6: a corrupt database file is quarantined, a fresh schema is
/// created, and the event is recorded on boot.
#[tokio::test]
async fn corrupt_database_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("support/db/history.sqlite");
    std::fs::create_dir_all(db.parent().unwrap()).unwrap();
    std::fs::write(&db, b"\x00\x01random bytes, definitely not sqlite\x02").unwrap();

    let (store, report) = HistoryStore::open(&db, &dir.path().join("support"), 1).unwrap();
    assert!(report.recovered);
    assert!(store.list_sessions(10).unwrap().is_empty());

    let quarantined = std::fs::read_dir(db.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("corrupt"))
        .count();
    assert_eq!(quarantined, 1);

    // The coordinator surfaces the one-shot degraded + event.
    let rig = rig();
    rig.coordinator.finish_boot(true, false).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Degraded);
    assert!(rig.sink.events().iter().any(|e| e.name == "db_corruption_recovered"));
}

/// Retry resumes from the same audio artifact after both providers fail.
#[tokio::test]
async fn retry_available_resumes_from_the_same_artifact() {
    let rig = rig();
    rig.groq.push_err(ProviderError::Auth { status: 401 });
    rig.openai.push_err(ProviderError::Auth { status: 403 });
    boot(&rig).await;

    feed_frames(&rig.input);
    toggle(&rig).await;
    toggle(&rig).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::RetryAvailable);

    // The artifact is still on disk under the scratch dir.
    let kept: Vec<_> = std::fs::read_dir(rig.dir.path().join("tmp"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(kept.len(), 1);

    rig.groq.push_ok("recovered");
    rig.coordinator.handle_hotkey(HotkeyAction::Retry, Edge::Pressed).await;
    assert_eq!(rig.coordinator.snapshot().phase, Phase::Ready);
    assert_eq!(rig.clipboard.last().unwrap(), "recovered");
}
