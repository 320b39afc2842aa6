// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-monitor backend.
//!
//! Handles the chords the registration API cannot express: anything with
//! the function modifier, and modifier-only chords. A raw listener thread
//! feeds key and modifier-flag events into a pure matcher; the matcher
//! decides which chords fire. Modifier-only chords are edge-triggered:
//! one press when the full set becomes active, re-armed on release.

use crate::backend::{ChordEvent, Edge, HotkeyBackend, HotkeyError};
use parking_lot::Mutex;
use quedo_core::hotkey::{HotkeyBinding, KeyCode, Modifiers};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// A raw input observation, already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawKey {
    Modifier(Modifiers),
    Key(u32),
}

/// Pure chord-matching state machine; the listener thread drives it.
#[derive(Default)]
pub(crate) struct MonitorMatcher {
    registrations: Vec<(u32, HotkeyBinding)>,
    held: Modifiers,
    /// Modifier-only chords currently fired, awaiting release.
    active_modifier_only: HashSet<u32>,
    /// Key chords currently held down.
    active_keys: HashSet<u32>,
}

impl MonitorMatcher {
    pub(crate) fn add(&mut self, id: u32, binding: HotkeyBinding) {
        self.registrations.push((id, binding));
    }

    pub(crate) fn remove(&mut self, id: u32) {
        self.registrations.retain(|(registered, _)| *registered != id);
        self.active_modifier_only.remove(&id);
        self.active_keys.remove(&id);
    }

    pub(crate) fn on_event(&mut self, key: RawKey, pressed: bool) -> Vec<ChordEvent> {
        let mut fired = Vec::new();
        match key {
            RawKey::Modifier(modifier) => {
                if pressed {
                    self.held.insert(modifier);
                } else {
                    self.held.remove(modifier);
                }
                for (id, binding) in &self.registrations {
                    if binding.key != KeyCode::ModifiersOnly {
                        continue;
                    }
                    let satisfied = self.held.contains(binding.modifiers);
                    let active = self.active_modifier_only.contains(id);
                    if satisfied && !active {
                        self.active_modifier_only.insert(*id);
                        fired.push(ChordEvent { binding_id: *id, edge: Edge::Pressed });
                    } else if !satisfied && active {
                        self.active_modifier_only.remove(id);
                        fired.push(ChordEvent { binding_id: *id, edge: Edge::Released });
                    }
                }
            }
            RawKey::Key(code) => {
                for (id, binding) in &self.registrations {
                    let KeyCode::Key(bound) = binding.key else { continue };
                    if bound != code {
                        continue;
                    }
                    if pressed {
                        if self.held.contains(binding.modifiers) {
                            self.active_keys.insert(*id);
                            fired.push(ChordEvent { binding_id: *id, edge: Edge::Pressed });
                        }
                    } else if self.active_keys.remove(id) {
                        fired.push(ChordEvent { binding_id: *id, edge: Edge::Released });
                    }
                }
            }
        }
        fired
    }
}

/// rdev-based raw listener. One listener thread per process, started on
/// first registration and kept for the process lifetime.
pub struct RdevMonitorBackend {
    matcher: Arc<Mutex<MonitorMatcher>>,
    events: UnboundedSender<ChordEvent>,
    listener_started: Once,
    listener_failed: Arc<AtomicBool>,
}

impl RdevMonitorBackend {
    pub fn new(events: UnboundedSender<ChordEvent>) -> Self {
        Self {
            matcher: Arc::new(Mutex::new(MonitorMatcher::default())),
            events,
            listener_started: Once::new(),
            listener_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_listener(&self) {
        let matcher = self.matcher.clone();
        let events = self.events.clone();
        let failed = self.listener_failed.clone();
        self.listener_started.call_once(move || {
            let spawn_failed = failed.clone();
            let spawned = std::thread::Builder::new()
                .name("quedo-hotkey-monitor".into())
                .spawn(move || {
                    let result = rdev::listen(move |event: rdev::Event| {
                        let (key, pressed) = match event.event_type {
                            rdev::EventType::KeyPress(key) => (key, true),
                            rdev::EventType::KeyRelease(key) => (key, false),
                            _ => return,
                        };
                        let Some(raw) = map_key(key) else { return };
                        let fired = matcher.lock().on_event(raw, pressed);
                        for chord in fired {
                            let _ = events.send(chord);
                        }
                    });
                    if let Err(e) = result {
                        warn!(error = ?e, "raw event monitor stopped");
                        failed.store(true, Ordering::SeqCst);
                    }
                });
            if spawned.is_err() {
                spawn_failed.store(true, Ordering::SeqCst);
            }
        });
    }
}

impl HotkeyBackend for RdevMonitorBackend {
    fn name(&self) -> &'static str {
        "monitor"
    }

    fn register(&self, id: u32, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        self.ensure_listener();
        if self.listener_failed.load(Ordering::SeqCst) {
            return Err(HotkeyError::HandlerInstallFailed(
                "raw event monitor is not running".into(),
            ));
        }
        debug!(id, chord = %binding.chord(), "monitor chord armed");
        self.matcher.lock().add(id, binding.clone());
        Ok(())
    }

    fn unregister(&self, id: u32) -> Result<(), HotkeyError> {
        self.matcher.lock().remove(id);
        Ok(())
    }
}

/// Normalize an rdev key into a modifier bit or one of our key codes.
fn map_key(key: rdev::Key) -> Option<RawKey> {
    use rdev::Key as K;
    let modifier = match key {
        K::MetaLeft | K::MetaRight => Some(Modifiers::CMD),
        K::Alt | K::AltGr => Some(Modifiers::OPTION),
        K::ControlLeft | K::ControlRight => Some(Modifiers::CONTROL),
        K::ShiftLeft | K::ShiftRight => Some(Modifiers::SHIFT),
        K::Function => Some(Modifiers::FUNCTION),
        _ => None,
    };
    if let Some(modifier) = modifier {
        return Some(RawKey::Modifier(modifier));
    }

    let name = match key {
        K::KeyA => "a",
        K::KeyB => "b",
        K::KeyC => "c",
        K::KeyD => "d",
        K::KeyE => "e",
        K::KeyF => "f",
        K::KeyG => "g",
        K::KeyH => "h",
        K::KeyI => "i",
        K::KeyJ => "j",
        K::KeyK => "k",
        K::KeyL => "l",
        K::KeyM => "m",
        K::KeyN => "n",
        K::KeyO => "o",
        K::KeyP => "p",
        K::KeyQ => "q",
        K::KeyR => "r",
        K::KeyS => "s",
        K::KeyT => "t",
        K::KeyU => "u",
        K::KeyV => "v",
        K::KeyW => "w",
        K::KeyX => "x",
        K::KeyY => "y",
        K::KeyZ => "z",
        K::Num0 => "0",
        K::Num1 => "1",
        K::Num2 => "2",
        K::Num3 => "3",
        K::Num4 => "4",
        K::Num5 => "5",
        K::Num6 => "6",
        K::Num7 => "7",
        K::Num8 => "8",
        K::Num9 => "9",
        K::Return => "return",
        K::Space => "space",
        K::Tab => "tab",
        K::Backspace => "delete",
        K::Escape => "esc",
        K::F1 => "f1",
        K::F2 => "f2",
        K::F3 => "f3",
        K::F4 => "f4",
        K::F5 => "f5",
        K::F6 => "f6",
        K::F7 => "f7",
        K::F8 => "f8",
        K::F9 => "f9",
        K::F10 => "f10",
        K::F11 => "f11",
        K::F12 => "f12",
        _ => return None,
    };
    match KeyCode::from_name(name) {
        Some(KeyCode::Key(code)) => Some(RawKey::Key(code)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
