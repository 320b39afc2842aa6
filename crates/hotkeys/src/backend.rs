// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend abstraction shared by the registered and monitor paths.

use quedo_core::hotkey::HotkeyBinding;
use thiserror::Error;

/// Press or release of a monitored chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Raw event from a backend, keyed by the service-assigned binding id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordEvent {
    pub binding_id: u32,
    pub edge: Edge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("chord {chord} is bound to more than one action")]
    Conflict { chord: String },
    #[error("hotkey registration failed: {0}")]
    RegistrationFailed(String),
    #[error("event monitor could not be installed: {0}")]
    HandlerInstallFailed(String),
}

/// One of the two registration surfaces. Backends deliver events through
/// the channel they were constructed with; the service owns routing.
pub trait HotkeyBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn register(&self, id: u32, binding: &HotkeyBinding) -> Result<(), HotkeyError>;

    fn unregister(&self, id: u32) -> Result<(), HotkeyError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ChordEvent, Edge, HotkeyBackend, HotkeyError};
    use parking_lot::Mutex;
    use quedo_core::hotkey::HotkeyBinding;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedSender;

    /// Scripted backend for service tests.
    #[derive(Clone)]
    pub struct FakeBackend {
        name: &'static str,
        events: UnboundedSender<ChordEvent>,
        registered: Arc<Mutex<Vec<(u32, HotkeyBinding)>>>,
        fail_registers: Arc<Mutex<u32>>,
        register_calls: Arc<Mutex<u32>>,
    }

    impl FakeBackend {
        pub fn new(name: &'static str, events: UnboundedSender<ChordEvent>) -> Self {
            Self {
                name,
                events,
                registered: Arc::new(Mutex::new(Vec::new())),
                fail_registers: Arc::new(Mutex::new(0)),
                register_calls: Arc::new(Mutex::new(0)),
            }
        }

        /// Fail the next `n` register calls.
        pub fn fail_next_registers(&self, n: u32) {
            *self.fail_registers.lock() = n;
        }

        pub fn registered(&self) -> Vec<(u32, HotkeyBinding)> {
            self.registered.lock().clone()
        }

        pub fn register_calls(&self) -> u32 {
            *self.register_calls.lock()
        }

        /// Inject an event as if the OS delivered it.
        pub fn emit(&self, binding_id: u32, edge: Edge) {
            let _ = self.events.send(ChordEvent { binding_id, edge });
        }
    }

    impl HotkeyBackend for FakeBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn register(&self, id: u32, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
            *self.register_calls.lock() += 1;
            let mut failures = self.fail_registers.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(HotkeyError::RegistrationFailed("scripted failure".into()));
            }
            self.registered.lock().push((id, binding.clone()));
            Ok(())
        }

        fn unregister(&self, id: u32) -> Result<(), HotkeyError> {
            self.registered.lock().retain(|(registered, _)| *registered != id);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBackend;
