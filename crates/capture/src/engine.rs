// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capture engine proper: start with bounded retry, two watchdogs,
//! deterministic stop.

use crate::input::{AudioInput, FrameSink, StreamHandle, StreamSpec};
use crate::system_events::SystemSignal;
use crate::writer::WavSink;
use parking_lot::Mutex;
use quedo_core::clock::{Clock, SystemClock};
use quedo_core::error_code;
use quedo_core::id::SessionId;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delay before the second open attempt.
const START_RETRY_DELAY: Duration = Duration::from_millis(300);
/// First-frame deadline after start.
const ARMING_DEADLINE: Duration = Duration::from_millis(1500);
/// Stall watchdog cadence.
const STALL_CHECK_INTERVAL: Duration = Duration::from_millis(250);
/// Silence longer than this mid-recording is a stall.
const STALL_THRESHOLD_MS: u64 = 750;
/// Stop settle budget. The contract is fixed at 2 s; callers do not get
/// to pick a different value.
const STOP_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("no recording is in progress")]
    NotRecording,
    #[error("no audio input device is available")]
    NoInputDevice,
    #[error("input stream could not be opened: {0}")]
    StreamOpenFailed(String),
    #[error("audio callbacks stalled")]
    CallbackStalled,
    #[error("stop did not settle within the teardown budget")]
    StopTimedOut,
    #[error("audio writer failed: {0}")]
    WriterFailed(String),
}

impl CaptureError {
    /// Stable code for `last_error_code` and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::AlreadyRecording | CaptureError::NotRecording => {
                error_code::INTERNAL_ERROR
            }
            CaptureError::NoInputDevice => error_code::NO_INPUT_DEVICE,
            CaptureError::StreamOpenFailed(_) => error_code::CAPTURE_OPEN_FAILED,
            CaptureError::CallbackStalled => error_code::CALLBACK_STALLED,
            CaptureError::StopTimedOut => error_code::STOP_TIMED_OUT,
            CaptureError::WriterFailed(_) => error_code::WRITER_FAILED,
        }
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

/// Shared between the device callback, the watchdogs, and the engine.
struct FrameTracker {
    frames: AtomicU64,
    /// Clock epoch ms of the most recent frame; 0 until the first one.
    last_frame_ms: AtomicU64,
    failure: Mutex<Option<CaptureError>>,
}

impl FrameTracker {
    fn new() -> Self {
        Self {
            frames: AtomicU64::new(0),
            last_frame_ms: AtomicU64::new(0),
            failure: Mutex::new(None),
        }
    }

    fn record_frames(&self, count: usize, now_ms: u64) {
        self.frames.fetch_add(count as u64, Ordering::Relaxed);
        self.last_frame_ms.store(now_ms, Ordering::Relaxed);
    }

    fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn last_frame_ms(&self) -> u64 {
        self.last_frame_ms.load(Ordering::Relaxed)
    }

    /// First failure wins; later ones are noise from the same teardown.
    fn set_failure(&self, error: CaptureError) {
        let mut guard = self.failure.lock();
        if guard.is_none() {
            *guard = Some(error);
        }
    }

    fn failure_pending(&self) -> bool {
        self.failure.lock().is_some()
    }

    fn take_failure(&self) -> Option<CaptureError> {
        self.failure.lock().take()
    }
}

/// Device callback target: write, then account.
struct EngineSink<C: Clock> {
    writer: Arc<WavSink>,
    tracker: Arc<FrameTracker>,
    clock: C,
}

impl<C: Clock> FrameSink for EngineSink<C> {
    fn write_frames(&self, samples: &[i16]) {
        if let Err(e) = self.writer.write(samples) {
            self.tracker.set_failure(e);
            return;
        }
        self.tracker.record_frames(samples.len(), self.clock.epoch_ms());
    }

    fn on_error(&self, message: &str) {
        warn!(%message, "device reported stream error");
    }
}

struct ActiveRecording {
    session_id: SessionId,
    spec: StreamSpec,
    path: PathBuf,
    writer: Arc<WavSink>,
    tracker: Arc<FrameTracker>,
    sink: Arc<dyn FrameSink>,
    stream: Option<Box<dyn StreamHandle>>,
    started_epoch_ms: u64,
    watchdogs: CancellationToken,
}

enum EngineState {
    Idle,
    Recording(ActiveRecording),
}

/// The capture engine. One per process; internally serialized.
pub struct CaptureEngine<C: Clock = SystemClock> {
    input: Arc<dyn AudioInput>,
    clock: C,
    temp_dir: PathBuf,
    state: Arc<AsyncMutex<EngineState>>,
}

impl<C: Clock> CaptureEngine<C> {
    pub fn new(input: Arc<dyn AudioInput>, clock: C, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            input,
            clock,
            temp_dir: temp_dir.into(),
            state: Arc::new(AsyncMutex::new(EngineState::Idle)),
        }
    }

    /// Probe the input device so the first recording starts hot.
    pub fn prepare(&self) -> Result<StreamSpec, CaptureError> {
        let spec = self.input.default_spec()?;
        if spec.channels == 0 {
            return Err(CaptureError::NoInputDevice);
        }
        debug!(sample_rate = spec.sample_rate, channels = spec.channels, "input prepared");
        Ok(spec)
    }

    pub async fn is_recording(&self) -> bool {
        matches!(&*self.state.lock().await, EngineState::Recording(_))
    }

    /// Open the stream and start writing frames.
    pub async fn start_recording(&self, session_id: SessionId) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if matches!(&*state, EngineState::Recording(_)) {
            return Err(CaptureError::AlreadyRecording);
        }

        let spec = self.input.default_spec()?;
        if spec.channels == 0 {
            return Err(CaptureError::NoInputDevice);
        }

        let path = self.temp_dir.join(format!("quedo-rec-{session_id}.wav"));
        let writer = Arc::new(WavSink::create(&path, spec)?);
        let tracker = Arc::new(FrameTracker::new());
        let sink: Arc<dyn FrameSink> = Arc::new(EngineSink {
            writer: writer.clone(),
            tracker: tracker.clone(),
            clock: self.clock.clone(),
        });

        let stream = match self.open_with_retry(spec, sink.clone()).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = writer.finalize();
                let _ = std::fs::remove_file(&path);
                return Err(e);
            }
        };

        let watchdogs = CancellationToken::new();
        info!(session = %session_id, "recording started");
        *state = EngineState::Recording(ActiveRecording {
            session_id,
            spec,
            path,
            writer,
            tracker,
            sink,
            stream: Some(stream),
            started_epoch_ms: self.clock.epoch_ms(),
            watchdogs: watchdogs.clone(),
        });
        drop(state);

        self.spawn_arming_watchdog(watchdogs.clone());
        self.spawn_stall_watchdog(watchdogs);
        Ok(())
    }

    /// Up to two attempts with a forced teardown and a short sleep in
    /// between. A missing device is reported as its own class and never
    /// retried.
    async fn open_with_retry(
        &self,
        spec: StreamSpec,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Box<dyn StreamHandle>, CaptureError> {
        match self.input.open(spec, sink.clone()) {
            Ok(stream) => Ok(stream),
            Err(CaptureError::NoInputDevice) => Err(CaptureError::NoInputDevice),
            Err(first) => {
                warn!(error = %first, "input open failed; retrying once");
                tokio::time::sleep(START_RETRY_DELAY).await;
                match self.input.open(spec, sink) {
                    Ok(stream) => Ok(stream),
                    Err(CaptureError::NoInputDevice) => Err(CaptureError::NoInputDevice),
                    Err(second) => {
                        warn!(error = %second, "input open failed twice");
                        Err(CaptureError::StreamOpenFailed(second.to_string()))
                    }
                }
            }
        }
    }

    /// True once at least one frame has been written, false on timeout or
    /// pending failure.
    pub async fn wait_first_frame(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let state = self.state.lock().await;
                match &*state {
                    EngineState::Recording(active) => {
                        if active.tracker.failure_pending() {
                            return false;
                        }
                        if active.tracker.frames() > 0 {
                            return true;
                        }
                    }
                    EngineState::Idle => return false,
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop the stream, finalize the file, and return the artifact.
    ///
    /// A pending failure (route change, sleep, stall, writer error) makes
    /// this fail deterministically. If teardown does not settle within the
    /// 2 s budget the stream is abandoned and `StopTimedOut` is returned.
    pub async fn stop_recording(&self) -> Result<CaptureResult, CaptureError> {
        let mut state = self.state.lock().await;
        let EngineState::Recording(mut active) = std::mem::replace(&mut *state, EngineState::Idle)
        else {
            return Err(CaptureError::NotRecording);
        };
        drop(state);
        active.watchdogs.cancel();

        if let Some(failure) = active.tracker.take_failure() {
            warn!(session = %active.session_id, error = %failure, "stop surfacing pending failure");
            self.teardown(&mut active, true);
            return Err(failure);
        }

        let stream = active.stream.take();
        let writer = active.writer.clone();
        let settle = tokio::time::timeout(
            STOP_SETTLE,
            tokio::task::spawn_blocking(move || {
                let closed = match stream {
                    Some(stream) => stream.close(),
                    None => Ok(()),
                };
                writer.finalize().and(closed)
            }),
        )
        .await;

        match settle {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                let _ = std::fs::remove_file(&active.path);
                return Err(e);
            }
            Ok(Err(join_error)) => {
                let _ = std::fs::remove_file(&active.path);
                return Err(CaptureError::WriterFailed(join_error.to_string()));
            }
            Err(_elapsed) => {
                warn!(session = %active.session_id, "stream teardown exceeded settle budget");
                let _ = std::fs::remove_file(&active.path);
                return Err(CaptureError::StopTimedOut);
            }
        }

        let now = self.clock.epoch_ms();
        let duration_ms = now.saturating_sub(active.started_epoch_ms);
        info!(session = %active.session_id, duration_ms, "recording stopped");
        Ok(CaptureResult {
            path: active.path.clone(),
            duration_ms,
            sample_rate: active.spec.sample_rate,
            channels: active.spec.channels,
            frames: active.tracker.frames(),
        })
    }

    /// Release everything without producing a result.
    pub async fn cancel_recording(&self) {
        let mut state = self.state.lock().await;
        if let EngineState::Recording(mut active) =
            std::mem::replace(&mut *state, EngineState::Idle)
        {
            drop(state);
            active.watchdogs.cancel();
            info!(session = %active.session_id, "recording cancelled");
            self.teardown(&mut active, true);
        }
    }

    /// Route-change / sleep / wake handling.
    pub async fn handle_signal(&self, signal: SystemSignal) {
        match signal {
            SystemSignal::ConfigurationChanged | SystemSignal::WillSleep => {
                let state = self.state.lock().await;
                if let EngineState::Recording(active) = &*state {
                    info!(?signal, session = %active.session_id, "marking pending stream failure");
                    active.tracker.set_failure(CaptureError::StreamOpenFailed(
                        "audio route changed or system went to sleep".into(),
                    ));
                }
            }
            SystemSignal::DidWake => {
                let recording = self.is_recording().await;
                if !recording {
                    if let Err(e) = self.prepare() {
                        warn!(error = %e, "re-prepare after wake failed");
                    }
                }
            }
        }
    }

    fn teardown(&self, active: &mut ActiveRecording, remove_file: bool) {
        if let Some(stream) = active.stream.take() {
            let _ = stream.close();
        }
        let _ = active.writer.finalize();
        if remove_file {
            let _ = std::fs::remove_file(&active.path);
        }
    }

    /// No frame within 1500 ms of start: restart the stream once; still
    /// nothing after another 1500 ms: record `StreamOpenFailed`.
    fn spawn_arming_watchdog(&self, cancel: CancellationToken) {
        let state = self.state.clone();
        let input = self.input.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(ARMING_DEADLINE) => {}
            }

            {
                let mut guard = state.lock().await;
                let EngineState::Recording(active) = &mut *guard else { return };
                if active.tracker.frames() > 0 || active.tracker.failure_pending() {
                    return;
                }
                info!("no frames before arming deadline; restarting input stream");
                if let Some(stream) = active.stream.take() {
                    let _ = stream.close();
                }
                match input.open(active.spec, active.sink.clone()) {
                    Ok(stream) => active.stream = Some(stream),
                    Err(e) => {
                        active.tracker.set_failure(CaptureError::StreamOpenFailed(e.to_string()));
                        return;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(ARMING_DEADLINE) => {}
            }

            let mut guard = state.lock().await;
            let EngineState::Recording(active) = &mut *guard else { return };
            if active.tracker.frames() == 0 {
                warn!("no frames after restart; giving up on the stream");
                active.tracker.set_failure(CaptureError::StreamOpenFailed(
                    "no frames after engine restart".into(),
                ));
                if let Some(stream) = active.stream.take() {
                    let _ = stream.close();
                }
            }
        });
    }

    /// Every 250 ms: more than 750 ms since the last frame means the
    /// callback stalled; record it and tear the stream down.
    fn spawn_stall_watchdog(&self, cancel: CancellationToken) {
        let state = self.state.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(STALL_CHECK_INTERVAL) => {}
                }

                let mut guard = state.lock().await;
                let EngineState::Recording(active) = &mut *guard else { return };
                let last = active.tracker.last_frame_ms();
                if last == 0 {
                    // Pre-first-frame silence belongs to the arming watchdog.
                    continue;
                }
                let silent_for = clock.epoch_ms().saturating_sub(last);
                if silent_for > STALL_THRESHOLD_MS {
                    warn!(silent_for, "callback stall detected");
                    active.tracker.set_failure(CaptureError::CallbackStalled);
                    if let Some(stream) = active.stream.take() {
                        let _ = stream.close();
                    }
                    return;
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
