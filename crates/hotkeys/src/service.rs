// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hotkey service: binding lifecycle and dispatch policy.

use crate::backend::{ChordEvent, Edge, HotkeyBackend, HotkeyError};
use crate::log::HotkeyLog;
use parking_lot::Mutex;
use quedo_core::clock::{Clock, SystemClock};
use quedo_core::hotkey::{HotkeyAction, HotkeyBinding};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Rapid re-presses of the same chord inside this window are dropped.
const DEBOUNCE: Duration = Duration::from_millis(200);
/// Pause before retrying a failed registration.
const REGISTER_RETRY_DELAY: Duration = Duration::from_millis(300);
/// Post-wake re-registration backoff schedule.
const WAKE_BACKOFF: [Duration; 2] = [Duration::from_millis(300), Duration::from_millis(1000)];

/// Callback invoked for every accepted dispatch.
pub type Handler = Arc<dyn Fn(HotkeyAction, Edge) + Send + Sync>;

struct ServiceState {
    bindings: Vec<(u32, HotkeyBinding)>,
    next_id: u32,
    handler: Option<Handler>,
    last_press: HashMap<u32, Instant>,
    pressed: HashSet<u32>,
}

/// Owns both backends and the dispatch task.
pub struct HotkeyService<C: Clock = SystemClock> {
    native: Arc<dyn HotkeyBackend>,
    monitor: Arc<dyn HotkeyBackend>,
    clock: C,
    log: Arc<HotkeyLog>,
    state: Arc<Mutex<ServiceState>>,
}

impl<C: Clock> HotkeyService<C> {
    /// Build the service and start draining `events`.
    pub fn new(
        native: Arc<dyn HotkeyBackend>,
        monitor: Arc<dyn HotkeyBackend>,
        mut events: UnboundedReceiver<ChordEvent>,
        clock: C,
        log: HotkeyLog,
    ) -> Self {
        let state = Arc::new(Mutex::new(ServiceState {
            bindings: Vec::new(),
            next_id: 1,
            handler: None,
            last_press: HashMap::new(),
            pressed: HashSet::new(),
        }));
        let log = Arc::new(log);

        let dispatch_state = state.clone();
        let dispatch_clock = clock.clone();
        let dispatch_log = log.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                Self::dispatch(&dispatch_state, &dispatch_clock, &dispatch_log, event);
            }
        });

        Self { native, monitor, clock, log, state }
    }

    /// Replace all bindings atomically. Duplicate chords fail fast before
    /// either backend is touched; a registration failure rolls back every
    /// chord registered so far in this call and restores the old set.
    pub async fn set_bindings(
        &self,
        bindings: Vec<HotkeyBinding>,
        handler: Handler,
    ) -> Result<(), HotkeyError> {
        for (i, a) in bindings.iter().enumerate() {
            for b in bindings.iter().skip(i + 1) {
                if a.key == b.key && a.modifiers == b.modifiers {
                    return Err(HotkeyError::Conflict { chord: a.chord() });
                }
            }
        }

        let old = {
            let state = self.state.lock();
            state.bindings.clone()
        };
        for (id, binding) in &old {
            let _ = self.backend_for(binding).unregister(*id);
        }

        let mut registered: Vec<(u32, HotkeyBinding)> = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let id = {
                let mut state = self.state.lock();
                let id = state.next_id;
                state.next_id += 1;
                id
            };
            match self.register_with_retry(id, &binding).await {
                Ok(()) => {
                    self.log.append(
                        self.clock.epoch_ms(),
                        &format!(
                            "register id={id} action={} chord={} backend={}",
                            binding.action,
                            binding.chord(),
                            self.backend_for(&binding).name()
                        ),
                    );
                    registered.push((id, binding));
                }
                Err(e) => {
                    warn!(chord = %binding.chord(), error = %e, "registration failed; rolling back");
                    for (id, binding) in &registered {
                        let _ = self.backend_for(binding).unregister(*id);
                    }
                    for (id, binding) in &old {
                        if let Err(restore) = self.backend_for(binding).register(*id, binding) {
                            warn!(chord = %binding.chord(), error = %restore, "could not restore previous binding");
                        }
                    }
                    self.log.append(
                        self.clock.epoch_ms(),
                        &format!("register-rollback chord={}", binding.chord()),
                    );
                    return Err(e);
                }
            }
        }

        let mut state = self.state.lock();
        state.bindings = registered;
        state.handler = Some(handler);
        state.pressed.clear();
        state.last_press.clear();
        info!(count = state.bindings.len(), "hotkey bindings active");
        Ok(())
    }

    /// Drop every binding and the handler.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        for (id, binding) in state.bindings.drain(..) {
            let backend =
                if binding.needs_event_monitor() { &self.monitor } else { &self.native };
            let _ = backend.unregister(id);
            self.log.append(
                self.clock.epoch_ms(),
                &format!("unregister id={id} chord={}", binding.chord()),
            );
        }
        state.handler = None;
        state.pressed.clear();
        state.last_press.clear();
    }

    /// Re-run registration after system wake, with 300 ms then 1000 ms
    /// backoff before giving up.
    pub async fn recover_after_wake(&self) -> Result<(), HotkeyError> {
        let bindings = {
            let state = self.state.lock();
            state.bindings.clone()
        };
        if bindings.is_empty() {
            return Ok(());
        }

        let mut last_error = HotkeyError::RegistrationFailed("no attempts made".into());
        for (attempt, delay) in WAKE_BACKOFF.iter().enumerate() {
            tokio::time::sleep(*delay).await;
            match self.reregister(&bindings) {
                Ok(()) => {
                    info!(attempt = attempt + 1, "hotkeys re-registered after wake");
                    self.log.append(self.clock.epoch_ms(), "wake-recover ok");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "wake re-registration failed");
                    last_error = e;
                }
            }
        }
        self.log.append(self.clock.epoch_ms(), "wake-recover failed");
        Err(last_error)
    }

    fn reregister(&self, bindings: &[(u32, HotkeyBinding)]) -> Result<(), HotkeyError> {
        for (id, binding) in bindings {
            let backend = self.backend_for(binding);
            let _ = backend.unregister(*id);
            backend.register(*id, binding)?;
        }
        Ok(())
    }

    async fn register_with_retry(
        &self,
        id: u32,
        binding: &HotkeyBinding,
    ) -> Result<(), HotkeyError> {
        match self.backend_for(binding).register(id, binding) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(chord = %binding.chord(), error = %first, "register failed; retrying once");
                tokio::time::sleep(REGISTER_RETRY_DELAY).await;
                self.backend_for(binding).register(id, binding)
            }
        }
    }

    fn backend_for(&self, binding: &HotkeyBinding) -> &Arc<dyn HotkeyBackend> {
        if binding.needs_event_monitor() {
            &self.monitor
        } else {
            &self.native
        }
    }

    /// Debounce, suppress auto-repeat, and hand the event to the handler.
    fn dispatch(
        state: &Arc<Mutex<ServiceState>>,
        clock: &C,
        log: &HotkeyLog,
        event: ChordEvent,
    ) {
        let now = clock.now();
        let (action, chord, handler) = {
            let mut state = state.lock();
            let Some((id, binding)) = state
                .bindings
                .iter()
                .find(|(id, _)| *id == event.binding_id)
                .map(|(id, b)| (*id, b.clone()))
            else {
                return;
            };

            match event.edge {
                Edge::Pressed => {
                    // Keydown auto-repeat.
                    if state.pressed.contains(&id) {
                        return;
                    }
                    if let Some(last) = state.last_press.get(&id) {
                        if now.duration_since(*last) < DEBOUNCE {
                            log.append(
                                clock.epoch_ms(),
                                &format!("debounced chord={}", binding.chord()),
                            );
                            return;
                        }
                    }
                    state.pressed.insert(id);
                    state.last_press.insert(id, now);
                }
                Edge::Released => {
                    // Release of a debounced or stale press.
                    if !state.pressed.remove(&id) {
                        return;
                    }
                }
            }
            (binding.action, binding.chord(), state.handler.clone())
        };

        log.append(
            clock.epoch_ms(),
            &format!("dispatch action={action} chord={chord} edge={:?}", event.edge),
        );
        if let Some(handler) = handler {
            handler(action, event.edge);
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
