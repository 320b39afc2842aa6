// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quedo-adapters: everything that talks to the outside world.
//!
//! Transcription vendors (HTTP), the clipboard and synthetic-paste
//! output path, and desktop notifications. Each surface is a trait with
//! a system implementation and a recording fake for tests.

pub mod notify;
pub mod output;
pub mod provider;

pub use notify::{DesktopNotifier, Notifier, NotifyError};
pub use output::{ClipboardSink, OutputError, OutputRouter, OutputTarget, PasteInjector};
pub use provider::{
    ProviderError, ProviderRegistry, TranscriptionProvider, TranscriptionRequest,
    TranscriptionResponse,
};

#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use output::{FakeClipboard, FakePaste};
#[cfg(any(test, feature = "test-support"))]
pub use provider::FakeProvider;
