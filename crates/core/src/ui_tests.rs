// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ready_offers_the_documented_actions() {
    let contract = ui_contract(Phase::Ready, None);
    assert_eq!(
        contract.actions,
        &[
            UiAction::StartRecording,
            UiAction::Preferences,
            UiAction::History,
            UiAction::RunChecks
        ]
    );
    assert_eq!(contract.status, None);
}

#[test]
fn recording_shows_stop_hint() {
    let contract = ui_contract(Phase::Recording, None);
    assert_eq!(contract.status, Some("Recording. Press shortcut to stop."));
    assert_eq!(contract.actions, &[UiAction::Stop, UiAction::Cancel]);
}

#[test]
fn degraded_permissions_offers_recovery_paths() {
    let contract = ui_contract(Phase::Degraded, Some(DegradedReason::Permissions));
    assert_eq!(
        contract.actions,
        &[UiAction::OpenSettings, UiAction::RunChecks, UiAction::UseClipboardOnly]
    );
}

#[test]
fn degraded_hotkey_failure_offers_rebind() {
    let contract = ui_contract(Phase::Degraded, Some(DegradedReason::HotkeyFailure));
    assert_eq!(
        contract.actions,
        &[UiAction::RebindHotkey, UiAction::RetryRegistration]
    );
}

#[test]
fn degraded_without_reason_falls_back_to_internal_error() {
    let with_reason = ui_contract(Phase::Degraded, Some(DegradedReason::InternalError));
    let without = ui_contract(Phase::Degraded, None);
    assert_eq!(with_reason, without);
}

#[test]
fn every_state_has_an_icon_and_no_dead_ends() {
    for phase in Phase::ALL {
        let contract = ui_contract(phase, None);
        assert!(!contract.icon.is_empty(), "{phase} has no icon");
        // Transient pipeline states may be action-free, but every resting
        // state must offer the user a way forward.
        let resting = matches!(
            phase,
            Phase::Ready | Phase::RetryAvailable | Phase::Degraded | Phase::Onboarding
        );
        if resting {
            assert!(!contract.actions.is_empty(), "{phase} is a dead end");
        }
    }
}

#[test]
fn contract_is_a_pure_function() {
    let a = ui_contract(Phase::Degraded, Some(DegradedReason::NoInputDevice));
    let b = ui_contract(Phase::Degraded, Some(DegradedReason::NoInputDevice));
    assert_eq!(a, b);
}
