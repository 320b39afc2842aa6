// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI contract: the pure mapping from `(phase, degraded reason)` to what
//! the menu-bar UI shows. The UI consumes this; nothing here calls back
//! into the UI.

use crate::lifecycle::{DegradedReason, Phase};
use serde::{Deserialize, Serialize};

/// Actions the UI may offer in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiAction {
    StartRecording,
    Stop,
    Cancel,
    Retry,
    Preferences,
    History,
    RunChecks,
    OpenSettings,
    UseClipboardOnly,
    RebindHotkey,
    RetryRegistration,
    Quit,
}

/// What the UI renders for one lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiStateContract {
    /// Symbol name for the menu-bar icon.
    pub icon: &'static str,
    pub status: Option<&'static str>,
    /// Ordered action list.
    pub actions: &'static [UiAction],
}

/// Derive the UI contract for a lifecycle state.
pub fn ui_contract(phase: Phase, reason: Option<DegradedReason>) -> UiStateContract {
    use UiAction::*;
    match phase {
        Phase::Booting => UiStateContract {
            icon: "hourglass",
            status: Some("Starting up…"),
            actions: &[Quit],
        },
        Phase::Onboarding => UiStateContract {
            icon: "hand.wave",
            status: Some("Finish setup to start dictating."),
            actions: &[Preferences, Quit],
        },
        Phase::Ready => UiStateContract {
            icon: "mic",
            status: None,
            actions: &[StartRecording, Preferences, History, RunChecks],
        },
        Phase::Arming => UiStateContract {
            icon: "mic.badge.plus",
            status: Some("Preparing microphone…"),
            actions: &[Cancel],
        },
        Phase::Recording => UiStateContract {
            icon: "waveform",
            status: Some("Recording. Press shortcut to stop."),
            actions: &[Stop, Cancel],
        },
        Phase::Processing => UiStateContract {
            icon: "waveform.circle",
            status: Some("Transcribing…"),
            actions: &[Cancel],
        },
        Phase::StreamingPartial => UiStateContract {
            icon: "waveform.circle",
            status: Some("Transcribing…"),
            actions: &[Cancel],
        },
        Phase::ProviderFallback => UiStateContract {
            icon: "arrow.triangle.2.circlepath",
            status: Some("Primary provider unavailable. Trying fallback."),
            actions: &[Cancel],
        },
        Phase::Outputting => UiStateContract {
            icon: "doc.on.clipboard",
            status: Some("Delivering transcript…"),
            actions: &[],
        },
        Phase::RetryAvailable => UiStateContract {
            icon: "arrow.clockwise",
            status: Some("Transcription failed. The recording is kept; retry when ready."),
            actions: &[Retry, History, Preferences],
        },
        Phase::Degraded => degraded_contract(reason.unwrap_or(DegradedReason::InternalError)),
        Phase::ShuttingDown => UiStateContract {
            icon: "power",
            status: Some("Quitting…"),
            actions: &[],
        },
    }
}

fn degraded_contract(reason: DegradedReason) -> UiStateContract {
    use UiAction::*;
    match reason {
        DegradedReason::Permissions => UiStateContract {
            icon: "exclamationmark.triangle",
            status: Some(
                "Microphone or accessibility permission is missing. Clipboard output still works.",
            ),
            actions: &[OpenSettings, RunChecks, UseClipboardOnly],
        },
        DegradedReason::NoInputDevice => UiStateContract {
            icon: "mic.slash",
            status: Some("No audio input device was found. Connect a microphone and run checks."),
            actions: &[RunChecks, OpenSettings],
        },
        DegradedReason::ProviderUnavailable => UiStateContract {
            icon: "wifi.exclamationmark",
            status: Some(
                "Transcription providers are unreachable. Recordings are kept for retry.",
            ),
            actions: &[RunChecks, History],
        },
        DegradedReason::HotkeyFailure => UiStateContract {
            icon: "keyboard",
            status: Some("The global shortcut could not be registered."),
            actions: &[RebindHotkey, RetryRegistration],
        },
        DegradedReason::InternalError => UiStateContract {
            icon: "exclamationmark.triangle",
            status: Some("Something went wrong internally. Run checks or restart Quedo."),
            actions: &[RunChecks, Quit],
        },
    }
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
