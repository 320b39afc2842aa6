// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared `config.env` file (key=value, `#` comments).
//!
//! Read on load with key-level override of the settings document; written
//! on save for interop with the companion CLI. API keys found here are
//! imported as secrets but never written back — the secrets blob is the
//! only place key material is persisted.

use indexmap::IndexMap;
use quedo_core::hotkey::{HotkeyAction, HotkeyBinding};
use quedo_core::settings::{AppSettings, OutputMode, ProviderKind};

pub const KEY_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const KEY_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const KEY_TOGGLE_HOTKEY: &str = "TOGGLE_RECORDING_HOTKEY";
pub const KEY_RETRY_HOTKEY: &str = "RETRY_TRANSCRIPTION_HOTKEY";
pub const KEY_CANCEL_HOTKEY: &str = "CANCEL_RECORDING_HOTKEY";
pub const KEY_LANGUAGE: &str = "TRANSCRIPTION_LANGUAGE";
pub const KEY_OUTPUT: &str = "TRANSCRIPTION_OUTPUT";
pub const KEY_LAUNCH_AT_LOGIN: &str = "LAUNCH_AT_LOGIN";
pub const KEY_WHISPER_MODEL: &str = "WHISPER_MODEL";
pub const KEY_GROQ_TIMEOUT: &str = "GROQ_TIMEOUT";
pub const KEY_VOCABULARY: &str = "VOCABULARY";

/// Parsed key=value content, insertion-ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    entries: IndexMap<String, String>,
}

impl EnvFile {
    /// Parse file text. Blank lines and `#` comments are skipped; values
    /// may be single- or double-quoted.
    pub fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply known keys over `settings`. Unknown keys are left for other
    /// tools. Returns warnings for values that failed to parse.
    pub fn apply(&self, settings: &mut AppSettings) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action, key) in [
            (HotkeyAction::Toggle, KEY_TOGGLE_HOTKEY),
            (HotkeyAction::Retry, KEY_RETRY_HOTKEY),
            (HotkeyAction::Cancel, KEY_CANCEL_HOTKEY),
        ] {
            if let Some(chord) = self.get(key) {
                match HotkeyBinding::parse(action, chord) {
                    Ok(binding) => {
                        settings.hotkeys.retain(|b| b.action != action);
                        settings.hotkeys.push(binding);
                    }
                    Err(e) => warnings.push(format!("{key}: {e}")),
                }
            }
        }

        if let Some(language) = self.get(KEY_LANGUAGE) {
            settings.language = language.to_string();
        }
        if let Some(output) = self.get(KEY_OUTPUT) {
            match OutputMode::from_config_str(output) {
                Some(mode) => settings.output = mode,
                None => warnings.push(format!("{KEY_OUTPUT}: unknown value {output:?}")),
            }
        }
        if let Some(raw) = self.get(KEY_LAUNCH_AT_LOGIN) {
            match parse_bool(raw) {
                Some(flag) => settings.launch_at_login = flag,
                None => warnings.push(format!("{KEY_LAUNCH_AT_LOGIN}: not a boolean: {raw:?}")),
            }
        }
        if let Some(model) = self.get(KEY_WHISPER_MODEL) {
            let primary = settings.provider.primary;
            settings.provider.models.set(primary, model);
        }
        if let Some(raw) = self.get(KEY_GROQ_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) => settings.provider.timeout_secs = secs,
                Err(_) => warnings.push(format!("{KEY_GROQ_TIMEOUT}: not a number: {raw:?}")),
            }
        }
        if let Some(raw) = self.get(KEY_VOCABULARY) {
            settings.vocabulary = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        warnings
    }

    /// API keys present in the file, for one-time import into the blob.
    pub fn api_keys(&self) -> Vec<(ProviderKind, String)> {
        let mut keys = Vec::new();
        if let Some(k) = self.get(KEY_GROQ_API_KEY) {
            keys.push((ProviderKind::Groq, k.to_string()));
        }
        if let Some(k) = self.get(KEY_OPENAI_API_KEY) {
            keys.push((ProviderKind::OpenAi, k.to_string()));
        }
        keys
    }

    /// Build the file content written on save. Secrets are never included.
    pub fn from_settings(settings: &AppSettings) -> Self {
        let mut file = Self::default();
        for (action, key) in [
            (HotkeyAction::Toggle, KEY_TOGGLE_HOTKEY),
            (HotkeyAction::Retry, KEY_RETRY_HOTKEY),
            (HotkeyAction::Cancel, KEY_CANCEL_HOTKEY),
        ] {
            if let Some(binding) = settings.binding_for(action) {
                file.set(key, binding.chord());
            }
        }
        file.set(KEY_LANGUAGE, settings.language.as_str());
        file.set(KEY_OUTPUT, settings.output.as_config_str());
        file.set(KEY_LAUNCH_AT_LOGIN, if settings.launch_at_login { "true" } else { "false" });
        // Only an explicit override is mirrored; the vendor default would
        // otherwise get baked into the document on the next load.
        if let Some(model) = settings.provider.models.get(settings.provider.primary) {
            file.set(KEY_WHISPER_MODEL, model);
        }
        file.set(KEY_GROQ_TIMEOUT, settings.provider.timeout_secs.to_string());
        if !settings.vocabulary.is_empty() {
            file.set(KEY_VOCABULARY, settings.vocabulary.join(","));
        }
        file
    }

    pub fn render(&self) -> String {
        let mut out = String::from("# Quedo shared configuration. Managed; edits are preserved per key.\n");
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "env_file_tests.rs"]
mod tests;
