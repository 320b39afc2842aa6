// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing configuration model.
//!
//! The configuration store (quedo-config) owns persistence and validation;
//! this module only defines the shape and the documented defaults. Every
//! field is `#[serde(default)]` so missing keys decode to defaults and
//! unknown keys are ignored for forward compatibility.

use crate::hotkey::{HotkeyAction, HotkeyBinding};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Packaging mode. Sandboxed (store-style) builds cannot post synthetic
/// keyboard events and are forced to clipboard-only output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistributionProfile {
    #[default]
    Direct,
    Sandboxed,
}

/// Where a finished transcript goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    None,
    #[default]
    Clipboard,
    Paste,
    ClipboardAndPaste,
}

impl OutputMode {
    /// config.env wire value (`TRANSCRIPTION_OUTPUT`).
    pub fn as_config_str(&self) -> &'static str {
        match self {
            OutputMode::None => "none",
            OutputMode::Clipboard => "clipboard",
            OutputMode::Paste => "paste_on_cursor",
            OutputMode::ClipboardAndPaste => "clipboard,paste_on_cursor",
        }
    }

    pub fn from_config_str(s: &str) -> Option<OutputMode> {
        match s.trim() {
            "none" => Some(OutputMode::None),
            "clipboard" => Some(OutputMode::Clipboard),
            "paste_on_cursor" => Some(OutputMode::Paste),
            "clipboard,paste_on_cursor" | "paste_on_cursor,clipboard" => {
                Some(OutputMode::ClipboardAndPaste)
            }
            _ => None,
        }
    }
}

/// How the toggle hotkey behaves: press-to-toggle or hold-to-talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Toggle,
    Hold,
}

/// Closed set of transcription vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Vendor default transcription model.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "whisper-large-v3",
            ProviderKind::OpenAi => "whisper-1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-provider optional override, keyed by the closed provider set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PerProvider {
    pub groq: Option<String>,
    pub openai: Option<String>,
}

impl PerProvider {
    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Groq => self.groq.as_deref(),
            ProviderKind::OpenAi => self.openai.as_deref(),
        }
    }

    pub fn set(&mut self, kind: ProviderKind, value: impl Into<String>) {
        let slot = match kind {
            ProviderKind::Groq => &mut self.groq,
            ProviderKind::OpenAi => &mut self.openai,
        };
        *slot = Some(value.into());
    }
}

/// Provider selection, per-provider model ids, and secret references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfiguration {
    pub primary: ProviderKind,
    pub fallback: ProviderKind,
    /// Hard per-request wall-clock timeout, 1..=120 seconds.
    pub timeout_secs: u64,
    /// Per-provider model override; missing entries use the vendor default.
    pub models: PerProvider,
    /// Opaque secret references resolved by the configuration store.
    pub key_refs: PerProvider,
}

impl ProviderConfiguration {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn model_for(&self, kind: ProviderKind) -> &str {
        self.models.get(kind).unwrap_or_else(|| kind.default_model())
    }

    pub fn key_ref_for(&self, kind: ProviderKind) -> String {
        self.key_refs
            .get(kind)
            .map(str::to_string)
            .unwrap_or_else(|| format!("secret:{kind}"))
    }
}

impl Default for ProviderConfiguration {
    fn default() -> Self {
        Self {
            primary: ProviderKind::Groq,
            fallback: ProviderKind::OpenAi,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            models: PerProvider::default(),
            key_refs: PerProvider::default(),
        }
    }
}

/// The whole user-facing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub profile: DistributionProfile,
    pub output: OutputMode,
    /// `auto` or an IETF-like code such as `en` / `pt-BR`.
    pub language: String,
    /// Ordered vocabulary hints passed to providers.
    pub vocabulary: Vec<String>,
    pub interaction: InteractionMode,
    pub launch_at_login: bool,
    pub hotkeys: Vec<HotkeyBinding>,
    pub provider: ProviderConfiguration,
}

impl AppSettings {
    pub fn binding_for(&self, action: HotkeyAction) -> Option<&HotkeyBinding> {
        self.hotkeys.iter().find(|b| b.action == action)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        // Chord parsing over literals known to be valid; keep in sync with
        // the KEY_NAMES table.
        let hotkeys = [
            (HotkeyAction::Toggle, "fn+ctrl"),
            (HotkeyAction::Retry, "cmd+shift+r"),
            (HotkeyAction::Cancel, "cmd+esc"),
        ]
        .into_iter()
        .filter_map(|(action, chord)| HotkeyBinding::parse(action, chord).ok())
        .collect();

        Self {
            profile: DistributionProfile::Direct,
            output: OutputMode::Clipboard,
            language: "auto".to_string(),
            vocabulary: Vec::new(),
            interaction: InteractionMode::Toggle,
            launch_at_login: false,
            hotkeys,
            provider: ProviderConfiguration::default(),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
