// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

/// Drive a fresh machine along a path of legal transitions.
fn machine_at(path: &[Phase]) -> LifecycleMachine {
    let machine = LifecycleMachine::new();
    for phase in path {
        if *phase == Phase::Arming {
            let _ = machine.begin_session(SessionId::new("s"));
        }
        machine.transition(*phase, None).unwrap();
    }
    machine
}

#[test]
fn starts_in_booting() {
    let machine = LifecycleMachine::new();
    assert_eq!(machine.snapshot().phase, Phase::Booting);
}

#[parameterized(
    booting_to_ready = { &[], Phase::Ready },
    booting_to_onboarding = { &[], Phase::Onboarding },
    onboarding_to_ready = { &[Phase::Onboarding], Phase::Ready },
    arming_to_recording = { &[Phase::Ready, Phase::Arming], Phase::Recording },
    arming_abort = { &[Phase::Ready, Phase::Arming], Phase::Ready },
    recording_to_processing = { &[Phase::Ready, Phase::Arming, Phase::Recording], Phase::Processing },
    processing_to_outputting = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing], Phase::Outputting },
    processing_to_fallback = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing], Phase::ProviderFallback },
    fallback_to_retry = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing, Phase::ProviderFallback], Phase::RetryAvailable },
    outputting_to_ready = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing, Phase::Outputting], Phase::Ready },
    retry_to_processing = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing, Phase::RetryAvailable], Phase::Processing },
)]
fn accepts_documented_transitions(path: &[Phase], to: Phase) {
    let machine = machine_at(path);
    let from = machine.snapshot().phase;
    let transition = machine.transition(to, None).unwrap();
    assert_eq!(transition, Transition { from, to });
    assert_eq!(machine.snapshot().phase, to);
}

#[parameterized(
    booting_to_recording = { &[], Phase::Recording },
    ready_to_processing = { &[Phase::Ready], Phase::Processing },
    ready_to_outputting = { &[Phase::Ready], Phase::Outputting },
    recording_to_outputting = { &[Phase::Ready, Phase::Arming, Phase::Recording], Phase::Outputting },
    outputting_to_recording = { &[Phase::Ready, Phase::Arming, Phase::Recording, Phase::Processing, Phase::Outputting], Phase::Recording },
)]
fn rejects_undocumented_transitions(path: &[Phase], to: Phase) {
    let machine = machine_at(path);
    let from = machine.snapshot().phase;
    assert_eq!(
        machine.transition(to, None),
        Err(TransitionError::Rejected { from, to })
    );
    // Phase unchanged on rejection.
    assert_eq!(machine.snapshot().phase, from);
}

#[test]
fn degraded_is_reachable_from_anywhere() {
    for path in [
        vec![],
        vec![Phase::Ready],
        vec![Phase::Ready, Phase::Arming, Phase::Recording],
    ] {
        let machine = machine_at(&path);
        machine
            .transition(Phase::Degraded, Some(DegradedReason::Permissions))
            .unwrap();
        assert_eq!(machine.snapshot().phase, Phase::Degraded);
    }
}

#[test]
fn shutting_down_is_reachable_from_anywhere_and_terminal() {
    let machine = machine_at(&[Phase::Ready]);
    machine.transition(Phase::ShuttingDown, None).unwrap();
    assert_eq!(
        machine.transition(Phase::Ready, None),
        Err(TransitionError::Rejected { from: Phase::ShuttingDown, to: Phase::Ready })
    );
}

#[test]
fn degraded_stores_reason_and_ready_clears_it() {
    let machine = machine_at(&[Phase::Ready]);
    machine
        .transition(Phase::Degraded, Some(DegradedReason::NoInputDevice))
        .unwrap();
    assert_eq!(
        machine.snapshot().degraded_reason,
        Some(DegradedReason::NoInputDevice)
    );
    machine.transition(Phase::Ready, None).unwrap();
    assert_eq!(machine.snapshot().degraded_reason, None);
}

#[test]
fn degraded_without_reason_defaults_to_internal_error() {
    let machine = machine_at(&[Phase::Ready]);
    machine.transition(Phase::Degraded, None).unwrap();
    assert_eq!(
        machine.snapshot().degraded_reason,
        Some(DegradedReason::InternalError)
    );
}

#[test]
fn arming_requires_an_active_session() {
    let machine = machine_at(&[Phase::Ready]);
    assert_eq!(
        machine.transition(Phase::Arming, None),
        Err(TransitionError::NoActiveSession)
    );
    machine.begin_session(SessionId::new("s-1")).unwrap();
    machine.transition(Phase::Arming, None).unwrap();
}

#[test]
fn begin_session_rejects_a_second_session() {
    let machine = machine_at(&[Phase::Ready]);
    machine.begin_session(SessionId::new("first")).unwrap();
    assert_eq!(
        machine.begin_session(SessionId::new("second")),
        Err(TransitionError::SessionAlreadyActive(SessionId::new("first")))
    );
}

#[test]
fn end_session_clears_id_and_fallback_flag() {
    let machine = machine_at(&[Phase::Ready]);
    machine.begin_session(SessionId::new("s-1")).unwrap();
    machine.mark_fallback_attempted();
    machine.end_session();
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.active_session, None);
    assert!(!snapshot.fallback_attempted);
}

#[test]
fn last_error_code_is_settable_and_clearable() {
    let machine = LifecycleMachine::new();
    machine.set_last_error_code(Some(crate::error_code::CAPTURE_OPEN_FAILED.into()));
    assert_eq!(
        machine.snapshot().last_error_code.as_deref(),
        Some("capture_open_failed")
    );
    machine.set_last_error_code(None);
    assert_eq!(machine.snapshot().last_error_code, None);
}

#[test]
fn snapshot_is_a_value_copy() {
    let machine = machine_at(&[Phase::Ready]);
    let before = machine.snapshot();
    machine.begin_session(SessionId::new("s-1")).unwrap();
    machine.transition(Phase::Arming, None).unwrap();
    assert_eq!(before.phase, Phase::Ready);
    assert_eq!(before.active_session, None);
}

#[test]
fn phase_serde_uses_camel_case_names() {
    let json = serde_json::to_string(&Phase::StreamingPartial).unwrap();
    assert_eq!(json, "\"streamingPartial\"");
    let back: Phase = serde_json::from_str("\"providerFallback\"").unwrap();
    assert_eq!(back, Phase::ProviderFallback);
}
