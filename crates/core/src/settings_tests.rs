// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::hotkey::KeyCode;
use yare::parameterized;

#[test]
fn defaults_match_documented_values() {
    let settings = AppSettings::default();
    assert_eq!(settings.profile, DistributionProfile::Direct);
    assert_eq!(settings.output, OutputMode::Clipboard);
    assert_eq!(settings.language, "auto");
    assert_eq!(settings.interaction, InteractionMode::Toggle);
    assert!(!settings.launch_at_login);
    assert_eq!(settings.provider.primary, ProviderKind::Groq);
    assert_eq!(settings.provider.fallback, ProviderKind::OpenAi);
    assert_eq!(settings.provider.timeout_secs, 30);
    assert_eq!(settings.hotkeys.len(), 3);
}

#[test]
fn default_toggle_is_modifiers_only() {
    let settings = AppSettings::default();
    let toggle = settings.binding_for(HotkeyAction::Toggle).unwrap();
    assert_eq!(toggle.key, KeyCode::ModifiersOnly);
    assert!(toggle.needs_event_monitor());
}

#[test]
fn model_for_falls_back_to_vendor_default() {
    let mut provider = ProviderConfiguration::default();
    assert_eq!(provider.model_for(ProviderKind::Groq), "whisper-large-v3");
    assert_eq!(provider.model_for(ProviderKind::OpenAi), "whisper-1");
    provider.models.set(ProviderKind::Groq, "whisper-large-v3-turbo");
    assert_eq!(provider.model_for(ProviderKind::Groq), "whisper-large-v3-turbo");
}

#[parameterized(
    none = { "none", Some(OutputMode::None) },
    clipboard = { "clipboard", Some(OutputMode::Clipboard) },
    paste = { "paste_on_cursor", Some(OutputMode::Paste) },
    both = { "clipboard,paste_on_cursor", Some(OutputMode::ClipboardAndPaste) },
    both_reversed = { "paste_on_cursor,clipboard", Some(OutputMode::ClipboardAndPaste) },
    junk = { "cliipboard", None },
)]
fn output_mode_config_values(input: &str, expected: Option<OutputMode>) {
    assert_eq!(OutputMode::from_config_str(input), expected);
}

#[test]
fn output_mode_config_round_trip() {
    for mode in [
        OutputMode::None,
        OutputMode::Clipboard,
        OutputMode::Paste,
        OutputMode::ClipboardAndPaste,
    ] {
        assert_eq!(OutputMode::from_config_str(mode.as_config_str()), Some(mode));
    }
}

#[test]
fn settings_survive_serde_round_trip() {
    let mut settings = AppSettings::default();
    settings.language = "pt-BR".into();
    settings.vocabulary = vec!["Quedo".into(), "Groq".into()];
    settings.provider.models.set(ProviderKind::OpenAi, "gpt-4o-transcribe");

    let json = serde_json::to_string(&settings).unwrap();
    let back: AppSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(settings, back);
}

#[test]
fn unknown_keys_are_ignored_on_decode() {
    let json = r#"{"language":"en","frobnicate":true,"output":"paste"}"#;
    let settings: AppSettings = serde_json::from_str(json).unwrap();
    assert_eq!(settings.language, "en");
    assert_eq!(settings.output, OutputMode::Paste);
    // Everything else falls back to defaults.
    assert_eq!(settings.provider.primary, ProviderKind::Groq);
}
