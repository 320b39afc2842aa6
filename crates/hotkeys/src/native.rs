// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered-hotkey backend over the `global-hotkey` crate.
//!
//! Only standard chords land here; the service routes function-modifier
//! and modifier-only chords to the event monitor.

use crate::backend::{ChordEvent, Edge, HotkeyBackend, HotkeyError};
use global_hotkey::hotkey::{Code, HotKey, Modifiers as HkModifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use quedo_core::hotkey::{HotkeyBinding, Modifiers};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub struct GlobalHotkeyBackend {
    manager: Mutex<GlobalHotKeyManager>,
    /// OS hotkey id → service binding id, shared with the event handler.
    routes: Arc<Mutex<HashMap<u32, u32>>>,
    /// Service binding id → registered hotkey, for unregistration.
    registered: Mutex<HashMap<u32, HotKey>>,
}

impl GlobalHotkeyBackend {
    pub fn new(events: UnboundedSender<ChordEvent>) -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| HotkeyError::HandlerInstallFailed(e.to_string()))?;
        let routes: Arc<Mutex<HashMap<u32, u32>>> = Arc::new(Mutex::new(HashMap::new()));

        let handler_routes = routes.clone();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            let binding_id = handler_routes.lock().get(&event.id).copied();
            if let Some(binding_id) = binding_id {
                let edge = match event.state {
                    HotKeyState::Pressed => Edge::Pressed,
                    HotKeyState::Released => Edge::Released,
                };
                let _ = events.send(ChordEvent { binding_id, edge });
            }
        }));

        Ok(Self { manager: Mutex::new(manager), routes, registered: Mutex::new(HashMap::new()) })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn register(&self, id: u32, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        let hotkey = hotkey_for(binding).ok_or_else(|| {
            HotkeyError::RegistrationFailed(format!(
                "chord {} is not representable by the registration API",
                binding.chord()
            ))
        })?;
        self.manager
            .lock()
            .register(hotkey)
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;
        self.routes.lock().insert(hotkey.id(), id);
        self.registered.lock().insert(id, hotkey);
        debug!(id, chord = %binding.chord(), "hotkey registered");
        Ok(())
    }

    fn unregister(&self, id: u32) -> Result<(), HotkeyError> {
        if let Some(hotkey) = self.registered.lock().remove(&id) {
            self.routes.lock().remove(&hotkey.id());
            self.manager
                .lock()
                .unregister(hotkey)
                .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;
        }
        Ok(())
    }
}

fn hotkey_for(binding: &HotkeyBinding) -> Option<HotKey> {
    if binding.needs_event_monitor() {
        return None;
    }
    let name = binding.key.name()?;
    let code = code_for(name)?;
    let mut modifiers = HkModifiers::empty();
    if binding.modifiers.contains(Modifiers::CMD) {
        modifiers |= HkModifiers::SUPER;
    }
    if binding.modifiers.contains(Modifiers::OPTION) {
        modifiers |= HkModifiers::ALT;
    }
    if binding.modifiers.contains(Modifiers::CONTROL) {
        modifiers |= HkModifiers::CONTROL;
    }
    if binding.modifiers.contains(Modifiers::SHIFT) {
        modifiers |= HkModifiers::SHIFT;
    }
    Some(HotKey::new(Some(modifiers), code))
}

fn code_for(name: &str) -> Option<Code> {
    let code = match name {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "return" => Code::Enter,
        "space" => Code::Space,
        "tab" => Code::Tab,
        "delete" => Code::Backspace,
        "esc" => Code::Escape,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        _ => return None,
    };
    Some(code)
}
