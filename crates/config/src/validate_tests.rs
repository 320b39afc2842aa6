// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use quedo_core::hotkey::{HotkeyBinding, KeyCode, Modifiers};
use quedo_core::settings::ProviderKind;
use yare::parameterized;

#[test]
fn defaults_validate_cleanly() {
    assert_eq!(validate(&AppSettings::default()), Ok(()));
}

#[test]
fn empty_hotkey_list_is_valid() {
    let mut settings = AppSettings::default();
    settings.hotkeys.clear();
    assert_eq!(validate(&settings), Ok(()));
}

#[parameterized(
    zero = { 0, false },
    low_edge = { 1, true },
    typical = { 30, true },
    high_edge = { 120, true },
    above = { 121, false },
)]
fn timeout_boundaries(secs: u64, ok: bool) {
    let mut settings = AppSettings::default();
    settings.provider.timeout_secs = secs;
    assert_eq!(validate(&settings).is_ok(), ok);
}

#[test]
fn duplicate_action_is_an_issue() {
    let mut settings = AppSettings::default();
    settings
        .hotkeys
        .push(HotkeyBinding::parse(quedo_core::hotkey::HotkeyAction::Toggle, "cmd+t").unwrap());
    let issues = validate(&settings).unwrap_err();
    assert!(issues
        .0
        .contains(&ConfigIssue::DuplicateHotkeyAction(quedo_core::hotkey::HotkeyAction::Toggle)));
}

#[test]
fn modifierless_binding_is_an_issue() {
    let mut settings = AppSettings::default();
    settings.hotkeys = vec![HotkeyBinding::new(
        quedo_core::hotkey::HotkeyAction::Retry,
        KeyCode::Key(15),
        Modifiers::empty(),
    )];
    let issues = validate(&settings).unwrap_err();
    assert_eq!(
        issues.0,
        vec![ConfigIssue::HotkeyWithoutModifiers(quedo_core::hotkey::HotkeyAction::Retry)]
    );
}

#[test]
fn all_issues_are_reported_in_one_pass() {
    let mut settings = AppSettings::default();
    settings.provider.fallback = ProviderKind::Groq; // == primary
    settings.provider.timeout_secs = 0;
    settings.language = "  ".into();
    settings.provider.models.set(ProviderKind::Groq, "");
    settings.hotkeys = vec![HotkeyBinding::new(
        quedo_core::hotkey::HotkeyAction::Cancel,
        KeyCode::ModifiersOnly,
        Modifiers::empty(),
    )];

    let issues = validate(&settings).unwrap_err();
    assert!(issues.0.contains(&ConfigIssue::PrimaryEqualsFallback));
    assert!(issues.0.contains(&ConfigIssue::TimeoutOutOfRange(0)));
    assert!(issues.0.contains(&ConfigIssue::EmptyLanguage));
    assert!(issues.0.contains(&ConfigIssue::EmptyModelId("primary")));
    assert!(issues
        .0
        .contains(&ConfigIssue::HotkeyWithoutModifiers(quedo_core::hotkey::HotkeyAction::Cancel)));
    assert!(issues.0.len() >= 5);
}

#[test]
fn issue_set_displays_every_problem() {
    let mut settings = AppSettings::default();
    settings.provider.timeout_secs = 300;
    settings.language = String::new();
    let issues = validate(&settings).unwrap_err();
    let text = issues.to_string();
    assert!(text.contains("300"));
    assert!(text.contains("language"));
}
