// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quedo-capture: the audio capture engine.
//!
//! Opens the default input device, writes 16-bit PCM WAV at the device's
//! native rate, and polices the stream with two watchdogs: one for the
//! first frame after start, one for callback stalls mid-recording.
//! Route changes and sleep are handled by failing the *next* stop
//! deterministically; the lifecycle transition belongs to the
//! coordinator.

mod engine;
mod input;
mod writer;

pub mod system_events;

pub use engine::{CaptureEngine, CaptureError, CaptureResult};
pub use input::{AudioInput, CpalInput, FrameSink, StreamHandle, StreamSpec};
pub use system_events::SystemSignal;

#[cfg(any(test, feature = "test-support"))]
pub use input::FakeInput;
