// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator: one owner for the session flow.
//!
//! Translates hotkey, CLI, and system events into lifecycle transitions
//! and component calls. Components never call each other; everything
//! meets here. Racing dispatches are resolved by consulting the current
//! lifecycle snapshot, never by the hotkey service.

mod routing;

pub use routing::{route_toggle, ToggleCommand};

use parking_lot::Mutex;
use quedo_adapters::output::{OutputError, OutputRouter, OutputTarget};
use quedo_adapters::Notifier;
use quedo_capture::{CaptureEngine, CaptureError, SystemSignal};
use quedo_config::ConfigStore;
use quedo_core::clock::Clock;
use quedo_core::error_code;
use quedo_core::event::names as event_names;
use quedo_core::hotkey::HotkeyAction;
use quedo_core::id::SessionId;
use quedo_core::lifecycle::{AppLifecycleSnapshot, DegradedReason, LifecycleMachine, Phase};
use quedo_core::metrics::{names as metric_names, MetricPoint};
use quedo_core::session::{SessionRecord, SessionStatus};
use quedo_core::settings::{AppSettings, ProviderKind};
use quedo_core::ui::ui_contract;
use quedo_diagnostics::{BundleContents, DiagnosticsCenter};
use quedo_hotkeys::Edge;
use quedo_pipeline::{PipelineError, TranscriptionPipeline};
use quedo_storage::HistoryStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the coordinator waits for the first audio frame before
/// declaring the start failed.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(2);
/// Recovery-budget tag for capture restarts.
const CAPTURE_RECOVERY_TAG: &str = "capture";

/// Everything the coordinator orchestrates.
pub struct CoordinatorDeps<C: Clock> {
    pub clock: C,
    pub capture: CaptureEngine<C>,
    pub pipeline: TranscriptionPipeline<C>,
    pub router: OutputRouter,
    pub store: Arc<HistoryStore>,
    pub diag: Arc<DiagnosticsCenter<C>>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<ConfigStore>,
    pub settings: AppSettings,
    pub log_path: PathBuf,
}

/// Audio artifact kept for the retry path.
struct PendingRetry {
    audio: PathBuf,
    duration_ms: u64,
    started_at_ms: u64,
}

pub struct Coordinator<C: Clock> {
    machine: LifecycleMachine,
    clock: C,
    capture: CaptureEngine<C>,
    pipeline: TranscriptionPipeline<C>,
    router: OutputRouter,
    store: Arc<HistoryStore>,
    diag: Arc<DiagnosticsCenter<C>>,
    notifier: Arc<dyn Notifier>,
    config: Arc<ConfigStore>,
    settings: Mutex<AppSettings>,
    /// User-supplied transcript replacements (substring → substitute).
    replacements: Mutex<BTreeMap<String, String>>,
    pending_retry: Mutex<Option<PendingRetry>>,
    session_started_at_ms: Mutex<Option<u64>>,
    log_path: PathBuf,
}

impl<C: Clock> Coordinator<C> {
    pub fn new(deps: CoordinatorDeps<C>) -> Self {
        Self {
            machine: LifecycleMachine::new(),
            clock: deps.clock,
            capture: deps.capture,
            pipeline: deps.pipeline,
            router: deps.router,
            store: deps.store,
            diag: deps.diag,
            notifier: deps.notifier,
            config: deps.config,
            settings: Mutex::new(deps.settings),
            replacements: Mutex::new(BTreeMap::new()),
            pending_retry: Mutex::new(None),
            session_started_at_ms: Mutex::new(None),
            log_path: deps.log_path,
        }
    }

    pub fn snapshot(&self) -> AppLifecycleSnapshot {
        self.machine.snapshot()
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.lock().clone()
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Leave `booting` after startup wiring. A recovered database
    /// surfaces a one-shot degraded(internalError) instead of aborting;
    /// a box with no API keys goes to onboarding.
    pub async fn finish_boot(&self, db_recovered: bool, needs_onboarding: bool) {
        if db_recovered {
            self.diag.emit(self.diag.event(event_names::DB_CORRUPTION_RECOVERED));
            self.machine
                .set_last_error_code(Some(error_code::DB_CORRUPT_RECOVERED.into()));
            self.transition(Phase::Degraded, Some(DegradedReason::InternalError)).await;
        } else if needs_onboarding {
            self.transition(Phase::Onboarding, None).await;
        } else {
            self.transition(Phase::Ready, None).await;
        }
    }

    /// Hotkey entry point.
    pub async fn handle_hotkey(&self, action: HotkeyAction, edge: Edge) {
        self.diag.count(metric_names::HOTKEY_TRIGGER_TOTAL, "action", action.as_str());
        match action {
            HotkeyAction::Toggle => {
                let snapshot = self.machine.snapshot();
                let interaction = self.settings.lock().interaction;
                let command = route_toggle(
                    interaction,
                    snapshot.phase,
                    edge,
                    self.capture.is_recording().await,
                );
                debug!(?command, phase = %snapshot.phase, "toggle routed");
                match command {
                    ToggleCommand::Start => self.start_session().await,
                    ToggleCommand::Stop => self.stop_session().await,
                    ToggleCommand::CancelArming => self.cancel_session().await,
                    ToggleCommand::None => {}
                }
            }
            HotkeyAction::Retry if edge == Edge::Pressed => self.retry_session().await,
            HotkeyAction::Cancel if edge == Edge::Pressed => self.cancel_session().await,
            _ => {}
        }
    }

    /// System signals: route changes and sleep go to the capture engine;
    /// the lifecycle reacts when the failed stop surfaces.
    pub async fn handle_signal(&self, signal: SystemSignal) {
        self.capture.handle_signal(signal).await;
    }

    /// `ready → arming → recording`, or a degraded failure.
    pub async fn start_session(&self) {
        let snapshot = self.machine.snapshot();
        if snapshot.phase != Phase::Ready || snapshot.active_session.is_some() {
            debug!(phase = %snapshot.phase, "start ignored");
            return;
        }

        let id = SessionId::generate();
        if self.machine.begin_session(id.clone()).is_err() {
            return;
        }
        *self.session_started_at_ms.lock() = Some(self.clock.epoch_ms());
        self.diag.record_metric(MetricPoint::new(
            metric_names::SESSION_START_TOTAL,
            1.0,
            self.clock.epoch_ms(),
        ));
        self.diag
            .emit(self.diag.event("session_start").for_session(id.clone()));
        self.transition(Phase::Arming, None).await;

        if let Err(first) = self.capture.start_recording(id.clone()).await {
            // One budgeted automatic recovery attempt, then degraded.
            let recovered = if self.diag.allow_recovery(CAPTURE_RECOVERY_TAG) {
                self.capture.start_recording(id.clone()).await
            } else {
                let incident = self.diag.start_incident(CAPTURE_RECOVERY_TAG);
                debug!(?incident, "capture recovery budget exhausted");
                Err(first.clone())
            };
            if let Err(error) = recovered {
                self.fail_start(&id, error).await;
                return;
            }
        }

        if !self.capture.wait_first_frame(FIRST_FRAME_TIMEOUT).await {
            self.capture.cancel_recording().await;
            if self.diag.allow_silent_mic_warning() {
                let _ = self
                    .notifier
                    .notify("Quedo", "The microphone is connected but silent. Check input levels.")
                    .await;
            }
            self.fail_start(
                &id,
                CaptureError::StreamOpenFailed("no audio frames arrived".into()),
            )
            .await;
            return;
        }

        self.transition(Phase::Recording, None).await;
    }

    async fn fail_start(&self, id: &SessionId, error: CaptureError) {
        warn!(session = %id, error = %error, "session start failed");
        let reason = match error {
            CaptureError::NoInputDevice => DegradedReason::NoInputDevice,
            _ => DegradedReason::InternalError,
        };
        self.machine
            .set_last_error_code(Some(error_code::CAPTURE_OPEN_FAILED.into()));
        self.diag.count(
            metric_names::SESSION_START_FAILED_TOTAL,
            "reason",
            error_code::CAPTURE_OPEN_FAILED,
        );
        self.diag.emit(
            self.diag
                .event("session_start_failed")
                .for_session(id.clone())
                .attr("error", error.code()),
        );
        self.transition(Phase::Degraded, Some(reason)).await;
        self.machine.end_session();
        *self.session_started_at_ms.lock() = None;
    }

    /// `recording → processing → … → ready`, or retryAvailable.
    pub async fn stop_session(&self) {
        let snapshot = self.machine.snapshot();
        if snapshot.phase != Phase::Recording {
            debug!(phase = %snapshot.phase, "stop ignored");
            return;
        }
        let Some(id) = snapshot.active_session else { return };

        self.transition(Phase::Processing, None).await;
        let stopped_at_ms = self.clock.epoch_ms();
        let capture = match self.capture.stop_recording().await {
            Ok(result) => result,
            Err(error) => {
                self.fail_without_artifact(&id, error).await;
                return;
            }
        };
        self.run_transcription(&id, capture.path, capture.duration_ms, stopped_at_ms).await;
    }

    /// A stop with no usable audio: no artifact, no retry.
    async fn fail_without_artifact(&self, id: &SessionId, error: CaptureError) {
        warn!(session = %id, error = %error, "recording lost before stop settled");
        self.machine.set_last_error_code(Some(error.code().into()));
        self.diag.emit(
            self.diag
                .event("session_failed")
                .for_session(id.clone())
                .attr("error", error.code()),
        );
        if self.diag.allow_degraded_notification(error.code()) {
            let _ = self
                .notifier
                .notify(
                    "Quedo",
                    "The recording was lost (audio device changed or stalled). Nothing was transcribed.",
                )
                .await;
        }
        self.transition(Phase::Ready, None).await;
        self.machine.end_session();
        *self.session_started_at_ms.lock() = None;
    }

    async fn run_transcription(
        &self,
        id: &SessionId,
        audio: PathBuf,
        duration_ms: u64,
        stopped_at_ms: u64,
    ) {
        let settings = self.settings.lock().clone();
        let replacements = self.replacements.lock().clone();

        match self.pipeline.transcribe(&audio, &settings, &replacements).await {
            Ok(result) => {
                if result.fallback_used {
                    self.machine.mark_fallback_attempted();
                    self.transition(Phase::ProviderFallback, None).await;
                    self.diag.emit(
                        self.diag
                            .event(event_names::PROVIDER_SWITCHED)
                            .for_session(id.clone())
                            .attr("primary", settings.provider.primary.as_str())
                            .attr("fallback", result.provider_used.as_str()),
                    );
                }
                self.transition(Phase::Outputting, None).await;

                let latency = self.clock.epoch_ms().saturating_sub(stopped_at_ms);
                self.diag.record_metric(MetricPoint::new(
                    metric_names::SESSION_LATENCY_STOP_TO_FINAL_MS,
                    latency as f64,
                    self.clock.epoch_ms(),
                ));

                let delivered = self.deliver(id, &result.text, &settings).await;
                self.save_finished_session(
                    id,
                    &audio,
                    duration_ms,
                    &settings,
                    Some(result.provider_used),
                    result.text,
                    if delivered { SessionStatus::Success } else { SessionStatus::Failed },
                )
                .await;
                self.transition(Phase::Ready, None).await;
                self.machine.end_session();
                *self.pending_retry.lock() = None;
                *self.session_started_at_ms.lock() = None;
            }
            Err(PipelineError::RetryAvailable { primary, fallback }) => {
                warn!(session = %id, %primary, %fallback, "transcription failed on both providers");
                self.machine
                    .set_last_error_code(Some(error_code::BOTH_PROVIDERS_FAILED.into()));
                self.diag.emit(
                    self.diag
                        .event("transcription_retry_available")
                        .for_session(id.clone())
                        .attr("primary_error", primary.code())
                        .attr("fallback_error", fallback.code()),
                );
                let started_at_ms =
                    (*self.session_started_at_ms.lock()).unwrap_or_else(|| self.clock.epoch_ms());
                *self.pending_retry.lock() =
                    Some(PendingRetry { audio, duration_ms, started_at_ms });
                self.transition(Phase::RetryAvailable, None).await;
            }
            Err(PipelineError::ProviderUnavailable(kind)) => {
                self.machine
                    .set_last_error_code(Some(error_code::PROVIDER_UNAVAILABLE.into()));
                self.diag.emit(
                    self.diag
                        .event("provider_unconfigured")
                        .for_session(id.clone())
                        .attr("provider", kind.as_str()),
                );
                let _ = std::fs::remove_file(&audio);
                self.transition(Phase::Degraded, Some(DegradedReason::ProviderUnavailable))
                    .await;
                self.machine.end_session();
                *self.session_started_at_ms.lock() = None;
            }
            Err(PipelineError::Chunking(message)) => {
                warn!(session = %id, %message, "chunking failed");
                self.machine
                    .set_last_error_code(Some(error_code::CHUNKING_FAILED.into()));
                self.diag.emit(
                    self.diag
                        .event("session_failed")
                        .for_session(id.clone())
                        .attr("error", error_code::CHUNKING_FAILED),
                );
                let _ = std::fs::remove_file(&audio);
                self.transition(Phase::Ready, None).await;
                self.machine.end_session();
                *self.session_started_at_ms.lock() = None;
            }
        }
    }

    /// Route the transcript; a clipboard that landed counts as delivery
    /// even when synthetic paste failed.
    async fn deliver(&self, id: &SessionId, text: &str, settings: &AppSettings) -> bool {
        match self.router.route(text, settings.output, settings.profile) {
            Ok(targets) => {
                debug!(session = %id, ?targets, "transcript delivered");
                true
            }
            Err(error) => {
                let clipboard_landed =
                    error.delivered().contains(&OutputTarget::Clipboard);
                let code = match &error {
                    OutputError::AccessibilityPermissionRequired { .. } => {
                        error_code::PASTE_DENIED
                    }
                    _ => error_code::OUTPUT_FAILED,
                };
                self.machine.set_last_error_code(Some(code.into()));
                self.diag.emit(
                    self.diag
                        .event("output_delivery_failed")
                        .for_session(id.clone())
                        .attr("error", code)
                        .attr("clipboard_landed", clipboard_landed.to_string()),
                );
                if self.diag.allow_degraded_notification(code) {
                    let body = if clipboard_landed {
                        "Pasting failed, but the transcript is on the clipboard. Grant accessibility access to paste automatically."
                    } else {
                        "The transcript could not be delivered. Find it in the history."
                    };
                    let _ = self.notifier.notify("Quedo", body).await;
                }
                clipboard_landed
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn save_finished_session(
        &self,
        id: &SessionId,
        audio: &std::path::Path,
        duration_ms: u64,
        settings: &AppSettings,
        provider_used: Option<ProviderKind>,
        transcript: String,
        status: SessionStatus,
    ) {
        let created_at_ms =
            (*self.session_started_at_ms.lock()).unwrap_or_else(|| self.clock.epoch_ms());
        let record = SessionRecord {
            id: id.clone(),
            created_at_ms,
            duration_ms,
            provider_primary: settings.provider.primary,
            provider_used,
            language: settings.language.clone(),
            output: settings.output,
            status,
            transcript: Some(transcript),
            audio_path: None,
        };
        match self.store.save_session(&record, audio, None, true) {
            Ok(path) => {
                self.diag.emit(
                    self.diag
                        .event("session_saved")
                        .for_session(id.clone())
                        .attr("status", status.as_str())
                        .attr("media", path.to_string_lossy()),
                );
            }
            Err(error) => {
                warn!(session = %id, %error, "history save failed");
                self.machine
                    .set_last_error_code(Some(error_code::PERSISTENCE_FAILED.into()));
                self.diag.emit(
                    self.diag
                        .event("session_save_failed")
                        .for_session(id.clone())
                        .attr("error", error.to_string()),
                );
            }
        }
    }

    /// Retry from `retryAvailable`, reusing the same audio artifact.
    pub async fn retry_session(&self) {
        let snapshot = self.machine.snapshot();
        if snapshot.phase != Phase::RetryAvailable {
            debug!(phase = %snapshot.phase, "retry ignored");
            return;
        }
        let Some(id) = snapshot.active_session else { return };
        let Some(pending) = self.pending_retry.lock().take() else {
            return;
        };

        info!(session = %id, "retrying transcription from the kept artifact");
        *self.session_started_at_ms.lock() = Some(pending.started_at_ms);
        self.transition(Phase::Processing, None).await;
        self.run_transcription(&id, pending.audio, pending.duration_ms, self.clock.epoch_ms())
            .await;
    }

    /// Cancel whatever is in flight and return to ready.
    pub async fn cancel_session(&self) {
        let snapshot = self.machine.snapshot();
        match snapshot.phase {
            Phase::Arming | Phase::Recording => {
                self.capture.cancel_recording().await;
            }
            Phase::RetryAvailable => {
                if let Some(pending) = self.pending_retry.lock().take() {
                    let _ = std::fs::remove_file(pending.audio);
                }
            }
            _ => {
                debug!(phase = %snapshot.phase, "cancel ignored");
                return;
            }
        }
        if let Some(id) = snapshot.active_session {
            self.diag.emit(self.diag.event("session_cancelled").for_session(id));
        }
        self.transition(Phase::Ready, None).await;
        self.machine.end_session();
        *self.session_started_at_ms.lock() = None;
    }

    /// Connectivity / device / storage checks; a passing run while
    /// degraded recovers to ready.
    pub async fn run_checks(&self) -> (bool, bool, bool, bool) {
        let settings = self.settings.lock().clone();
        let (primary_ok, fallback_ok) =
            self.pipeline.connectivity_check(&settings.provider).await;
        let microphone_ok = self.capture.prepare().is_ok();
        let storage_ok = self.store.list_sessions(1).is_ok();

        self.diag.emit(
            self.diag
                .event(event_names::RUN_CHECKS_COMPLETED)
                .attr("primary_ok", primary_ok.to_string())
                .attr("fallback_ok", fallback_ok.to_string())
                .attr("microphone_ok", microphone_ok.to_string())
                .attr("storage_ok", storage_ok.to_string()),
        );

        let snapshot = self.machine.snapshot();
        if snapshot.phase == Phase::Degraded
            && microphone_ok
            && storage_ok
            && (primary_ok || fallback_ok)
        {
            self.diag.emit(
                self.diag
                    .event(event_names::PERMISSIONS_RECOVERED)
                    .attr("from", snapshot.degraded_reason.map(|r| r.as_str()).unwrap_or("")),
            );
            self.machine.set_last_error_code(None);
            self.transition(Phase::Ready, None).await;
        }
        (primary_ok, fallback_ok, microphone_ok, storage_ok)
    }

    /// Record a settings persistence/validation failure.
    pub fn note_settings_error(&self, error: &str) {
        self.diag.emit(
            self.diag
                .event(event_names::SETTINGS_SAVE_ERROR)
                .attr("error", error),
        );
    }

    /// Apply reloaded settings and a rebuilt provider registry.
    pub async fn apply_settings(
        &self,
        settings: AppSettings,
        registry: quedo_adapters::ProviderRegistry,
        source: &str,
    ) {
        self.pipeline.set_registry(registry);
        *self.settings.lock() = settings;
        self.diag.emit(
            self.diag
                .event(event_names::SETTINGS_RELOADED)
                .attr("source", source),
        );
    }

    /// One-off transcription of an arbitrary file (CLI `transcribe`).
    pub async fn transcribe_file(
        &self,
        path: &std::path::Path,
    ) -> Result<(String, ProviderKind), PipelineError> {
        let settings = self.settings.lock().clone();
        let replacements = self.replacements.lock().clone();
        let result = self.pipeline.transcribe(path, &settings, &replacements).await?;
        Ok((result.text, result.provider_used))
    }

    /// Re-transcribe a stored session's audio into a new session.
    pub async fn retranscribe(
        &self,
        source: &SessionId,
    ) -> Result<Option<(SessionId, String)>, PipelineError> {
        let Ok(Some(audio)) = self.store.primary_audio_path(source) else {
            return Ok(None);
        };
        let Ok(Some(original)) = self.store.session(source) else {
            return Ok(None);
        };

        let settings = self.settings.lock().clone();
        let replacements = self.replacements.lock().clone();
        let result = self.pipeline.transcribe(&audio, &settings, &replacements).await?;

        let new_id = SessionId::generate();
        let record = SessionRecord {
            id: new_id.clone(),
            created_at_ms: self.clock.epoch_ms(),
            duration_ms: original.duration_ms,
            provider_primary: settings.provider.primary,
            provider_used: Some(result.provider_used),
            language: settings.language.clone(),
            output: settings.output,
            status: SessionStatus::Success,
            transcript: Some(result.text.clone()),
            audio_path: None,
        };
        if let Err(error) = self.store.save_session(&record, &audio, None, false) {
            warn!(%error, "could not persist retranscription");
        }
        Ok(Some((new_id, result.text)))
    }

    /// Assemble and write the support bundle.
    pub fn export_bundle(&self) -> Result<PathBuf, String> {
        let contents = BundleContents {
            log_lines: crate::logging::tail_lines(&self.log_path, 500),
            redacted_settings: self.config.redacted_snapshot().map_err(|e| e.to_string())?,
            events: self.store.recent_events(200).map_err(|e| e.to_string())?,
            metric_rollups: self.store.metric_rollups(240).map_err(|e| e.to_string())?,
        };
        let exports = self.config.paths().exports_dir();
        self.diag.export_support_bundle(&contents, &exports).map_err(|e| e.to_string())
    }

    /// Force a degraded state from outside the session flow (hotkey
    /// registration exhausted, wake recovery failed).
    pub async fn degrade(&self, reason: DegradedReason, code: &str) {
        self.machine.set_last_error_code(Some(code.into()));
        self.transition(Phase::Degraded, Some(reason)).await;
    }

    /// Shutdown is always reachable.
    pub async fn begin_shutdown(&self) {
        self.transition(Phase::ShuttingDown, None).await;
    }

    /// Transition with event/metric emission and degraded notification.
    async fn transition(&self, to: Phase, reason: Option<DegradedReason>) -> bool {
        match self.machine.transition(to, reason) {
            Ok(transition) => {
                self.diag.emit(
                    self.diag
                        .event(event_names::LIFECYCLE_TRANSITION)
                        .attr("from", transition.from.as_str())
                        .attr("to", transition.to.as_str()),
                );
                if to == Phase::Degraded {
                    let reason =
                        self.machine.snapshot().degraded_reason.unwrap_or(DegradedReason::InternalError);
                    self.diag.count(
                        metric_names::DEGRADED_ENTER_TOTAL,
                        "reason",
                        reason.as_str(),
                    );
                    if self.diag.allow_degraded_notification(reason.as_str()) {
                        let contract = ui_contract(Phase::Degraded, Some(reason));
                        let _ = self
                            .notifier
                            .notify("Quedo", contract.status.unwrap_or("Quedo needs attention."))
                            .await;
                    }
                }
                true
            }
            Err(error) => {
                warn!(%error, "transition rejected");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
