// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audio input abstraction.
//!
//! The engine never touches cpal directly; it talks to [`AudioInput`] so
//! retry, watchdog, and teardown logic can run against a scripted fake.
//! The cpal stream is `!Send`, so [`CpalInput`] parks it on a dedicated
//! thread and hands the engine a `Send` handle.

use crate::engine::CaptureError;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Native format of the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Receives converted 16-bit frames from the device callback.
///
/// Called on the audio thread; implementations must not block.
pub trait FrameSink: Send + Sync + 'static {
    fn write_frames(&self, samples: &[i16]);

    /// Device-side error; the stall watchdog will notice the silence, this
    /// is for diagnostics.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// An open stream. Dropping without `close` tears the stream down too.
pub trait StreamHandle: Send {
    fn close(self: Box<Self>) -> Result<(), CaptureError>;
}

/// An input device source.
pub trait AudioInput: Send + Sync + 'static {
    /// Probe the default device without opening a stream.
    fn default_spec(&self) -> Result<StreamSpec, CaptureError>;

    /// Open a stream delivering frames to `sink`.
    fn open(&self, spec: StreamSpec, sink: Arc<dyn FrameSink>)
        -> Result<Box<dyn StreamHandle>, CaptureError>;
}

// ---------------------------------------------------------------------------
// cpal implementation
// ---------------------------------------------------------------------------

/// Default-host cpal input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalInput;

impl CpalInput {
    pub fn new() -> Self {
        Self
    }
}

enum StreamCommand {
    Stop(mpsc::Sender<()>),
}

/// Handle to the thread that owns the cpal stream.
struct CpalStreamHandle {
    commands: mpsc::Sender<StreamCommand>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl StreamHandle for CpalStreamHandle {
    fn close(mut self: Box<Self>) -> Result<(), CaptureError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        // A dead thread means the stream is already gone.
        if self.commands.send(StreamCommand::Stop(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(std::time::Duration::from_secs(2));
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        Ok(())
    }
}

impl Drop for CpalStreamHandle {
    fn drop(&mut self) {
        let (ack_tx, _ack_rx) = mpsc::channel();
        let _ = self.commands.send(StreamCommand::Stop(ack_tx));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl AudioInput for CpalInput {
    fn default_spec(&self) -> Result<StreamSpec, CaptureError> {
        use cpal::traits::{DeviceTrait, HostTrait};
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?;
        Ok(StreamSpec {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    fn open(
        &self,
        spec: StreamSpec,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Box<dyn StreamHandle>, CaptureError> {
        let (command_tx, command_rx) = mpsc::channel::<StreamCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let thread = std::thread::Builder::new()
            .name("quedo-capture-stream".into())
            .spawn(move || stream_thread(spec, sink, command_rx, ready_tx))
            .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?;

        match ready_rx.recv_timeout(std::time::Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(Box::new(CpalStreamHandle {
                commands: command_tx,
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(CaptureError::StreamOpenFailed(
                "stream thread did not report readiness".into(),
            )),
        }
    }
}

/// Owns the cpal stream for its whole life.
fn stream_thread(
    spec: StreamSpec,
    sink: Arc<dyn FrameSink>,
    commands: mpsc::Receiver<StreamCommand>,
    ready: mpsc::Sender<Result<(), CaptureError>>,
) {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let build = || -> Result<cpal::Stream, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?;
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let error_sink = sink.clone();
        let err_fn = move |e: cpal::StreamError| {
            warn!(error = %e, "input stream error");
            error_sink.on_error(&e.to_string());
        };

        let stream = match sample_format {
            cpal::SampleFormat::I16 => {
                let sink = sink.clone();
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _| sink.write_frames(data),
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?
            }
            cpal::SampleFormat::U16 => {
                let sink = sink.clone();
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[u16], _| {
                            let converted: Vec<i16> =
                                data.iter().map(|s| (*s as i32 - 32_768) as i16).collect();
                            sink.write_frames(&converted);
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?
            }
            _ => {
                // Everything else (f32 on most hosts) goes through float.
                let sink = sink.clone();
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _| {
                            let converted: Vec<i16> = data
                                .iter()
                                .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                                .collect();
                            sink.write_frames(&converted);
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?
            }
        };

        stream.play().map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?;
        Ok(stream)
    };

    match build() {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            debug!("input stream running");
            // Park until asked to stop; the stream lives on this thread.
            if let Ok(StreamCommand::Stop(ack)) = commands.recv() {
                drop(stream);
                let _ = ack.send(());
            }
        }
        Err(e) => {
            let _ = ready.send(Err(e));
        }
    }
}

// ---------------------------------------------------------------------------
// fake implementation
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AudioInput, CaptureError, FrameSink, StreamHandle, StreamSpec};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeShared {
        spec: Mutex<StreamSpec>,
        open_failures: Mutex<u32>,
        opens: AtomicU32,
        closes: AtomicU32,
        spec_probes: AtomicU32,
        sink: Mutex<Option<Arc<dyn FrameSink>>>,
        slow_close: AtomicBool,
    }

    /// Scripted input device for engine tests.
    #[derive(Clone)]
    pub struct FakeInput {
        shared: Arc<FakeShared>,
    }

    impl FakeInput {
        pub fn new() -> Self {
            Self {
                shared: Arc::new(FakeShared {
                    spec: Mutex::new(StreamSpec { sample_rate: 48_000, channels: 1 }),
                    open_failures: Mutex::new(0),
                    opens: AtomicU32::new(0),
                    closes: AtomicU32::new(0),
                    spec_probes: AtomicU32::new(0),
                    sink: Mutex::new(None),
                    slow_close: AtomicBool::new(false),
                }),
            }
        }

        pub fn set_channels(&self, channels: u16) {
            self.shared.spec.lock().channels = channels;
        }

        /// Make the next `n` opens fail with streamOpenFailed.
        pub fn fail_opens(&self, n: u32) {
            *self.shared.open_failures.lock() = n;
        }

        /// Close blocks past any settle budget.
        pub fn set_slow_close(&self, slow: bool) {
            self.shared.slow_close.store(slow, Ordering::SeqCst);
        }

        /// Feed `frames` one-sample frames into the open stream.
        pub fn emit_frames(&self, frames: usize) {
            let sink = self.shared.sink.lock().clone();
            if let Some(sink) = sink {
                let samples = vec![0i16; frames];
                sink.write_frames(&samples);
            }
        }

        pub fn open_count(&self) -> u32 {
            self.shared.opens.load(Ordering::SeqCst)
        }

        pub fn close_count(&self) -> u32 {
            self.shared.closes.load(Ordering::SeqCst)
        }

        pub fn spec_probe_count(&self) -> u32 {
            self.shared.spec_probes.load(Ordering::SeqCst)
        }
    }

    impl Default for FakeInput {
        fn default() -> Self {
            Self::new()
        }
    }

    struct FakeHandle {
        shared: Arc<FakeShared>,
    }

    impl StreamHandle for FakeHandle {
        fn close(self: Box<Self>) -> Result<(), CaptureError> {
            if self.shared.slow_close.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_secs(5));
            }
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            *self.shared.sink.lock() = None;
            Ok(())
        }
    }

    impl AudioInput for FakeInput {
        fn default_spec(&self) -> Result<StreamSpec, CaptureError> {
            self.shared.spec_probes.fetch_add(1, Ordering::SeqCst);
            Ok(*self.shared.spec.lock())
        }

        fn open(
            &self,
            _spec: StreamSpec,
            sink: Arc<dyn FrameSink>,
        ) -> Result<Box<dyn StreamHandle>, CaptureError> {
            self.shared.opens.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.shared.open_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(CaptureError::StreamOpenFailed("scripted open failure".into()));
            }
            *self.shared.sink.lock() = Some(sink);
            Ok(Box::new(FakeHandle { shared: self.shared.clone() }))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeInput;
