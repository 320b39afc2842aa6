// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle state machine.
//!
//! The machine is the single authority on the application phase. The
//! transition table is static data; everything else is guard checks.
//! Mutating operations serialize behind one mutex, `snapshot` returns a
//! value copy, and rejected transitions are typed errors rather than
//! panics so racing dispatchers can reconcile against the current
//! snapshot.

use crate::id::SessionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Observable application phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Booting,
    Onboarding,
    Ready,
    Arming,
    Recording,
    Processing,
    StreamingPartial,
    ProviderFallback,
    Outputting,
    RetryAvailable,
    Degraded,
    ShuttingDown,
}

impl Phase {
    pub const ALL: [Phase; 12] = [
        Phase::Booting,
        Phase::Onboarding,
        Phase::Ready,
        Phase::Arming,
        Phase::Recording,
        Phase::Processing,
        Phase::StreamingPartial,
        Phase::ProviderFallback,
        Phase::Outputting,
        Phase::RetryAvailable,
        Phase::Degraded,
        Phase::ShuttingDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Booting => "booting",
            Phase::Onboarding => "onboarding",
            Phase::Ready => "ready",
            Phase::Arming => "arming",
            Phase::Recording => "recording",
            Phase::Processing => "processing",
            Phase::StreamingPartial => "streamingPartial",
            Phase::ProviderFallback => "providerFallback",
            Phase::Outputting => "outputting",
            Phase::RetryAvailable => "retryAvailable",
            Phase::Degraded => "degraded",
            Phase::ShuttingDown => "shuttingDown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the system cannot run a full session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DegradedReason {
    Permissions,
    NoInputDevice,
    ProviderUnavailable,
    HotkeyFailure,
    InternalError,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::Permissions => "permissions",
            DegradedReason::NoInputDevice => "noInputDevice",
            DegradedReason::ProviderUnavailable => "providerUnavailable",
            DegradedReason::HotkeyFailure => "hotkeyFailure",
            DegradedReason::InternalError => "internalError",
        }
    }
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed transitions, excluding the universal `degraded` and
/// `shuttingDown` targets which are checked separately.
static TRANSITIONS: &[(Phase, &[Phase])] = &[
    (Phase::Booting, &[Phase::Onboarding, Phase::Ready]),
    (Phase::Onboarding, &[Phase::Ready]),
    (Phase::Ready, &[Phase::Arming]),
    (Phase::Arming, &[Phase::Recording, Phase::Ready]),
    (Phase::Recording, &[Phase::Processing, Phase::Ready]),
    (
        Phase::Processing,
        &[
            Phase::StreamingPartial,
            Phase::Outputting,
            Phase::ProviderFallback,
            Phase::RetryAvailable,
            Phase::Ready,
        ],
    ),
    (
        Phase::StreamingPartial,
        &[Phase::Outputting, Phase::ProviderFallback, Phase::Ready],
    ),
    (
        Phase::ProviderFallback,
        &[Phase::Outputting, Phase::RetryAvailable, Phase::Ready],
    ),
    (Phase::Outputting, &[Phase::Ready, Phase::RetryAvailable]),
    (Phase::RetryAvailable, &[Phase::Processing, Phase::Ready]),
    (Phase::Degraded, &[Phase::Ready]),
    (Phase::ShuttingDown, &[]),
];

/// Documented targets for a source phase, not counting the universal ones.
pub fn allowed_targets(from: Phase) -> &'static [Phase] {
    TRANSITIONS
        .iter()
        .find(|(phase, _)| *phase == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Value copy of the machine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppLifecycleSnapshot {
    pub phase: Phase,
    pub degraded_reason: Option<DegradedReason>,
    pub active_session: Option<SessionId>,
    pub fallback_attempted: bool,
    pub last_error_code: Option<String>,
}

/// Completed transition, returned for event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
}

/// Typed rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {from} -> {to} is not allowed")]
    Rejected { from: Phase, to: Phase },
    #[error("cannot arm without an active session")]
    NoActiveSession,
    #[error("a session is already active: {0}")]
    SessionAlreadyActive(SessionId),
}

struct MachineState {
    phase: Phase,
    degraded_reason: Option<DegradedReason>,
    active_session: Option<SessionId>,
    fallback_attempted: bool,
    last_error_code: Option<String>,
}

/// The serialized owner of the application phase.
pub struct LifecycleMachine {
    inner: Mutex<MachineState>,
}

impl LifecycleMachine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MachineState {
                phase: Phase::Booting,
                degraded_reason: None,
                active_session: None,
                fallback_attempted: false,
                last_error_code: None,
            }),
        }
    }

    pub fn snapshot(&self) -> AppLifecycleSnapshot {
        let state = self.inner.lock();
        AppLifecycleSnapshot {
            phase: state.phase,
            degraded_reason: state.degraded_reason,
            active_session: state.active_session.clone(),
            fallback_attempted: state.fallback_attempted,
            last_error_code: state.last_error_code.clone(),
        }
    }

    /// Attach a session id. Fails while another session is active.
    pub fn begin_session(&self, id: SessionId) -> Result<(), TransitionError> {
        let mut state = self.inner.lock();
        if let Some(active) = &state.active_session {
            return Err(TransitionError::SessionAlreadyActive(active.clone()));
        }
        state.active_session = Some(id);
        Ok(())
    }

    /// Detach the session id and reset the fallback flag.
    pub fn end_session(&self) {
        let mut state = self.inner.lock();
        state.active_session = None;
        state.fallback_attempted = false;
    }

    pub fn mark_fallback_attempted(&self) {
        self.inner.lock().fallback_attempted = true;
    }

    pub fn set_last_error_code(&self, code: Option<String>) {
        self.inner.lock().last_error_code = code;
    }

    /// Move to `to`, enforcing the transition table and guards.
    ///
    /// `degraded` and `shuttingDown` are reachable from anywhere. Entering
    /// `degraded` stores the supplied reason (or `internalError`); entering
    /// `ready` clears any degraded reason.
    pub fn transition(
        &self,
        to: Phase,
        reason: Option<DegradedReason>,
    ) -> Result<Transition, TransitionError> {
        let mut state = self.inner.lock();
        let from = state.phase;

        let universal = matches!(to, Phase::Degraded | Phase::ShuttingDown);
        if !universal && !allowed_targets(from).contains(&to) {
            return Err(TransitionError::Rejected { from, to });
        }
        if from == Phase::Ready && to == Phase::Arming && state.active_session.is_none() {
            return Err(TransitionError::NoActiveSession);
        }

        match to {
            Phase::Degraded => {
                state.degraded_reason = Some(reason.unwrap_or(DegradedReason::InternalError));
            }
            Phase::Ready => {
                state.degraded_reason = None;
            }
            _ => {}
        }
        state.phase = to;
        Ok(Transition { from, to })
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "lifecycle_property_tests.rs"]
mod property_tests;
