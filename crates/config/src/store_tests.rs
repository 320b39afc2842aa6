// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::secrets::NoLegacySecrets;
use quedo_core::settings::OutputMode;

fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
    ConfigStore::new(ConfigPaths::rooted_at(dir.path()), Box::new(NoLegacySecrets))
}

#[test]
fn first_run_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let settings = store.load().unwrap();
    assert_eq!(settings, AppSettings::default());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut settings = AppSettings::default();
    settings.language = "en".into();
    settings.output = OutputMode::ClipboardAndPaste;
    settings.vocabulary = vec!["Quedo".into()];
    settings.provider.timeout_secs = 45;
    settings.provider.models.set(ProviderKind::OpenAi, "gpt-4o-transcribe");

    store.save(&settings).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn save_rejects_invalid_settings_with_all_issues() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut settings = AppSettings::default();
    settings.provider.timeout_secs = 0;
    settings.language = String::new();

    match store.save(&settings) {
        Err(ConfigError::Invalid(issues)) => assert_eq!(issues.0.len(), 2),
        other => panic!("expected validation failure, got {other:?}"),
    }
    // Nothing was written.
    assert!(!store.paths().settings_file().exists());
}

#[test]
fn config_env_overrides_document_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save(&AppSettings::default()).unwrap();

    std::fs::write(
        store.paths().env_file(),
        "TRANSCRIPTION_LANGUAGE=fr\nGROQ_TIMEOUT=90\n",
    )
    .unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.language, "fr");
    assert_eq!(loaded.provider.timeout_secs, 90);
}

#[test]
fn api_keys_in_env_file_are_imported_to_the_blob() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.paths().config_dir.as_path()).unwrap();
    std::fs::write(store.paths().env_file(), "GROQ_API_KEY=gsk_imported\n").unwrap();

    store.load().unwrap();
    assert_eq!(
        store.load_secret(ProviderKind::Groq).unwrap(),
        Some("gsk_imported".into())
    );
}

#[test]
fn secret_operations_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_secret(ProviderKind::OpenAi, "sk_live").unwrap();
    assert_eq!(store.load_secret(ProviderKind::OpenAi).unwrap(), Some("sk_live".into()));
    store.clear_secret(ProviderKind::OpenAi).unwrap();
    assert_eq!(store.load_secret(ProviderKind::OpenAi).unwrap(), None);
}

#[test]
fn redacted_snapshot_never_contains_secret_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_secret(ProviderKind::Groq, "gsk_super_secret").unwrap();

    let snapshot = store.redacted_snapshot().unwrap();
    assert_eq!(snapshot.get("secret.groq").map(String::as_str), Some("•••"));
    for value in snapshot.values() {
        assert!(!value.contains("gsk_super_secret"));
    }
    assert!(snapshot.contains_key("provider.primary"));
    assert!(snapshot.contains_key("hotkey.toggle"));
}

#[test]
fn unknown_document_keys_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.paths().config_dir.as_path()).unwrap();
    std::fs::write(
        store.paths().settings_file(),
        "version = 1\nlanguage = \"en\"\nfuture_knob = \"x\"\n",
    )
    .unwrap();
    let settings = store.load().unwrap();
    assert_eq!(settings.language, "en");
}
