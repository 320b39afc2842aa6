// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quedo-hotkeys: the global shortcut service.
//!
//! Two backends cooperate: the registered-hotkey API handles standard
//! chords, and a raw event monitor handles function-key chords and
//! modifier-only chords the registration API cannot express. The service
//! layer owns debouncing, auto-repeat suppression, edge-triggering,
//! conflict detection with atomic rollback, and post-wake recovery.

mod backend;
mod log;
mod monitor;
mod native;
mod service;

pub use backend::{ChordEvent, Edge, HotkeyBackend, HotkeyError};
pub use log::HotkeyLog;
pub use monitor::RdevMonitorBackend;
pub use native::GlobalHotkeyBackend;
pub use service::{Handler, HotkeyService};

#[cfg(any(test, feature = "test-support"))]
pub use backend::FakeBackend;
