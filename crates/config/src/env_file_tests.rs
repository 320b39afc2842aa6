// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use quedo_core::hotkey::KeyCode;
use yare::parameterized;

#[test]
fn parses_keys_comments_and_quotes() {
    let file = EnvFile::parse(
        "# comment\n\
         GROQ_API_KEY=gsk_abc123\n\
         TRANSCRIPTION_LANGUAGE=\"en\"\n\
         \n\
         not a key value line\n\
         TOGGLE_RECORDING_HOTKEY='fn+ctrl'\n",
    );
    assert_eq!(file.get("GROQ_API_KEY"), Some("gsk_abc123"));
    assert_eq!(file.get("TRANSCRIPTION_LANGUAGE"), Some("en"));
    assert_eq!(file.get("TOGGLE_RECORDING_HOTKEY"), Some("fn+ctrl"));
    assert_eq!(file.get("MISSING"), None);
}

#[test]
fn apply_overrides_settings_keys() {
    let mut settings = AppSettings::default();
    let file = EnvFile::parse(
        "TRANSCRIPTION_LANGUAGE=pt-BR\n\
         TRANSCRIPTION_OUTPUT=paste_on_cursor\n\
         LAUNCH_AT_LOGIN=yes\n\
         GROQ_TIMEOUT=45\n\
         VOCABULARY=Quedo, Groq , whisper\n\
         TOGGLE_RECORDING_HOTKEY=cmd+shift+space\n",
    );
    let warnings = file.apply(&mut settings);
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(settings.language, "pt-BR");
    assert_eq!(settings.output, OutputMode::Paste);
    assert!(settings.launch_at_login);
    assert_eq!(settings.provider.timeout_secs, 45);
    assert_eq!(settings.vocabulary, vec!["Quedo", "Groq", "whisper"]);
    let toggle = settings.binding_for(HotkeyAction::Toggle).unwrap();
    assert_eq!(toggle.key, KeyCode::Key(49));
}

#[test]
fn apply_collects_warnings_for_bad_values() {
    let mut settings = AppSettings::default();
    let file = EnvFile::parse(
        "TRANSCRIPTION_OUTPUT=telepathy\n\
         GROQ_TIMEOUT=soon\n\
         LAUNCH_AT_LOGIN=maybe\n\
         RETRY_TRANSCRIPTION_HOTKEY=cmd+zzz\n",
    );
    let warnings = file.apply(&mut settings);
    assert_eq!(warnings.len(), 4);
    // Bad values leave prior settings untouched.
    assert_eq!(settings.output, OutputMode::Clipboard);
    assert_eq!(settings.provider.timeout_secs, 30);
}

#[test]
fn whisper_model_overrides_the_primary_model() {
    let mut settings = AppSettings::default();
    let file = EnvFile::parse("WHISPER_MODEL=whisper-large-v3-turbo\n");
    file.apply(&mut settings);
    assert_eq!(
        settings.provider.model_for(ProviderKind::Groq),
        "whisper-large-v3-turbo"
    );
}

#[test]
fn api_keys_are_importable_but_never_rendered() {
    let file = EnvFile::parse("GROQ_API_KEY=gsk_1\nOPENAI_API_KEY=sk_2\n");
    assert_eq!(
        file.api_keys(),
        vec![
            (ProviderKind::Groq, "gsk_1".to_string()),
            (ProviderKind::OpenAi, "sk_2".to_string())
        ]
    );

    let rendered = EnvFile::from_settings(&AppSettings::default()).render();
    assert!(!rendered.contains("API_KEY"));
}

#[test]
fn settings_round_trip_through_env_file() {
    let mut settings = AppSettings::default();
    settings.language = "de".into();
    settings.output = OutputMode::ClipboardAndPaste;
    settings.vocabulary = vec!["eins".into(), "zwei".into()];
    settings.provider.timeout_secs = 60;

    let rendered = EnvFile::from_settings(&settings).render();
    let mut decoded = AppSettings::default();
    EnvFile::parse(&rendered).apply(&mut decoded);

    assert_eq!(decoded.language, "de");
    assert_eq!(decoded.output, OutputMode::ClipboardAndPaste);
    assert_eq!(decoded.vocabulary, vec!["eins", "zwei"]);
    assert_eq!(decoded.provider.timeout_secs, 60);
}

#[parameterized(
    yes = { "yes", Some(true) },
    one = { "1", Some(true) },
    on_upper = { "ON", Some(true) },
    no = { "no", Some(false) },
    zero = { "0", Some(false) },
    other = { "2", None },
)]
fn boolean_parsing(raw: &str, expected: Option<bool>) {
    assert_eq!(parse_bool(raw), expected);
}
