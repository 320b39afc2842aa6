// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hotkey binding model: actions, modifier masks, key codes, and the
//! `mod[+mod]*[+key]` chord syntax shared with config.env.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The closed set of actions a hotkey can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyAction {
    Toggle,
    Retry,
    Cancel,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] =
        [HotkeyAction::Toggle, HotkeyAction::Retry, HotkeyAction::Cancel];

    pub fn as_str(&self) -> &'static str {
        match self {
            HotkeyAction::Toggle => "toggle",
            HotkeyAction::Retry => "retry",
            HotkeyAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier bitmask over {cmd, option, control, shift, function}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const CMD: Modifiers = Modifiers(1);
    pub const OPTION: Modifiers = Modifiers(1 << 1);
    pub const CONTROL: Modifiers = Modifiers(1 << 2);
    pub const SHIFT: Modifiers = Modifiers(1 << 3);
    pub const FUNCTION: Modifiers = Modifiers(1 << 4);

    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn with(self, other: Modifiers) -> Self {
        Modifiers(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Modifiers) {
        self.0 &= !other.0;
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Canonical display order: cmd, option, ctrl, shift, fn.
    fn parts(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(Modifiers::CMD) {
            out.push("cmd");
        }
        if self.contains(Modifiers::OPTION) {
            out.push("option");
        }
        if self.contains(Modifiers::CONTROL) {
            out.push("ctrl");
        }
        if self.contains(Modifiers::SHIFT) {
            out.push("shift");
        }
        if self.contains(Modifiers::FUNCTION) {
            out.push("fn");
        }
        out
    }

    fn from_token(token: &str) -> Option<Modifiers> {
        match token {
            "cmd" | "command" | "super" => Some(Modifiers::CMD),
            "option" | "opt" | "alt" => Some(Modifiers::OPTION),
            "ctrl" | "control" => Some(Modifiers::CONTROL),
            "shift" => Some(Modifiers::SHIFT),
            "fn" | "function" => Some(Modifiers::FUNCTION),
            _ => None,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts().join("+"))
    }
}

/// Platform key code with a sentinel for modifier-only chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    /// Virtual key code (macOS kVK numbering; stable across layouts we care about).
    Key(u32),
    /// Chord fires on modifiers alone, with no regular key.
    ModifiersOnly,
}

/// Key name ↔ virtual key code table for the chord syntax.
const KEY_NAMES: &[(&str, u32)] = &[
    ("a", 0),
    ("s", 1),
    ("d", 2),
    ("f", 3),
    ("h", 4),
    ("g", 5),
    ("z", 6),
    ("x", 7),
    ("c", 8),
    ("v", 9),
    ("b", 11),
    ("q", 12),
    ("w", 13),
    ("e", 14),
    ("r", 15),
    ("y", 16),
    ("t", 17),
    ("1", 18),
    ("2", 19),
    ("3", 20),
    ("4", 21),
    ("6", 22),
    ("5", 23),
    ("9", 25),
    ("7", 26),
    ("8", 28),
    ("0", 29),
    ("o", 31),
    ("u", 32),
    ("i", 34),
    ("p", 35),
    ("return", 36),
    ("l", 37),
    ("j", 38),
    ("k", 40),
    ("n", 45),
    ("m", 46),
    ("tab", 48),
    ("space", 49),
    ("delete", 51),
    ("esc", 53),
    ("f1", 122),
    ("f2", 120),
    ("f3", 99),
    ("f4", 118),
    ("f5", 96),
    ("f6", 97),
    ("f7", 98),
    ("f8", 100),
    ("f9", 101),
    ("f10", 109),
    ("f11", 103),
    ("f12", 111),
];

impl KeyCode {
    pub fn from_name(name: &str) -> Option<KeyCode> {
        KEY_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| KeyCode::Key(*code))
    }

    pub fn name(&self) -> Option<&'static str> {
        match self {
            KeyCode::ModifiersOnly => None,
            KeyCode::Key(code) => {
                KEY_NAMES.iter().find(|(_, c)| c == code).map(|(n, _)| *n)
            }
        }
    }
}

/// One configured hotkey: action + key code + modifier mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub action: HotkeyAction,
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl HotkeyBinding {
    pub fn new(action: HotkeyAction, key: KeyCode, modifiers: Modifiers) -> Self {
        Self { action, key, modifiers }
    }

    /// Parse a `mod[+mod]*[+key]` chord (e.g. `fn+ctrl`, `cmd+shift+r`).
    pub fn parse(action: HotkeyAction, chord: &str) -> Result<Self, ChordParseError> {
        let mut modifiers = Modifiers::empty();
        let mut key: Option<KeyCode> = None;

        let tokens: Vec<&str> =
            chord.split('+').map(str::trim).filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            return Err(ChordParseError::Empty);
        }

        for raw in tokens {
            let token = raw.to_ascii_lowercase();
            if let Some(m) = Modifiers::from_token(&token) {
                modifiers.insert(m);
            } else if let Some(code) = KeyCode::from_name(&token) {
                if key.is_some() {
                    return Err(ChordParseError::MultipleKeys(token));
                }
                key = Some(code);
            } else {
                return Err(ChordParseError::UnknownToken(token));
            }
        }

        Ok(Self { action, key: key.unwrap_or(KeyCode::ModifiersOnly), modifiers })
    }

    /// Render the chord back into config.env syntax.
    pub fn chord(&self) -> String {
        let mut parts: Vec<&str> = self.modifiers.parts();
        if let Some(name) = self.key.name() {
            parts.push(name);
        }
        parts.join("+")
    }

    /// Chords with a function modifier or no regular key cannot be expressed
    /// through the registered-hotkey API and need the event monitor.
    pub fn needs_event_monitor(&self) -> bool {
        self.key == KeyCode::ModifiersOnly || self.modifiers.contains(Modifiers::FUNCTION)
    }
}

/// Chord syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordParseError {
    #[error("empty chord")]
    Empty,
    #[error("unknown chord token: {0}")]
    UnknownToken(String),
    #[error("chord has more than one non-modifier key: {0}")]
    MultipleKeys(String),
}

#[cfg(test)]
#[path = "hotkey_tests.rs"]
mod tests;
