// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings validation. One pass, every problem reported.

use quedo_core::hotkey::HotkeyAction;
use quedo_core::settings::AppSettings;
use std::fmt;
use thiserror::Error;

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    DuplicateHotkeyAction(HotkeyAction),
    HotkeyWithoutModifiers(HotkeyAction),
    PrimaryEqualsFallback,
    TimeoutOutOfRange(u64),
    EmptyLanguage,
    EmptyModelId(&'static str),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::DuplicateHotkeyAction(action) => {
                write!(f, "hotkey action {action} is bound more than once")
            }
            ConfigIssue::HotkeyWithoutModifiers(action) => {
                write!(f, "hotkey for {action} has no modifiers")
            }
            ConfigIssue::PrimaryEqualsFallback => {
                write!(f, "primary and fallback providers must differ")
            }
            ConfigIssue::TimeoutOutOfRange(secs) => {
                write!(f, "timeout {secs}s is outside 1..=120")
            }
            ConfigIssue::EmptyLanguage => write!(f, "language must not be empty"),
            ConfigIssue::EmptyModelId(which) => {
                write!(f, "{which} provider model id must not be empty")
            }
        }
    }
}

/// Aggregated validation failure. Never constructed empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid settings: {}", self.describe())]
pub struct ConfigIssues(pub Vec<ConfigIssue>);

impl ConfigIssues {
    fn describe(&self) -> String {
        self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    }
}

/// Check every rule, aggregating all problems found.
///
/// An empty hotkey list is valid (CLI-only mode).
pub fn validate(settings: &AppSettings) -> Result<(), ConfigIssues> {
    let mut issues = Vec::new();

    for action in HotkeyAction::ALL {
        let count = settings.hotkeys.iter().filter(|b| b.action == action).count();
        if count > 1 {
            issues.push(ConfigIssue::DuplicateHotkeyAction(action));
        }
    }
    for binding in &settings.hotkeys {
        if binding.modifiers.is_empty() {
            issues.push(ConfigIssue::HotkeyWithoutModifiers(binding.action));
        }
    }

    let provider = &settings.provider;
    if provider.primary == provider.fallback {
        issues.push(ConfigIssue::PrimaryEqualsFallback);
    }
    if !(1..=120).contains(&provider.timeout_secs) {
        issues.push(ConfigIssue::TimeoutOutOfRange(provider.timeout_secs));
    }
    if settings.language.trim().is_empty() {
        issues.push(ConfigIssue::EmptyLanguage);
    }
    if provider.model_for(provider.primary).trim().is_empty() {
        issues.push(ConfigIssue::EmptyModelId("primary"));
    }
    if provider.model_for(provider.fallback).trim().is_empty() {
        issues.push(ConfigIssue::EmptyModelId("fallback"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigIssues(issues))
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
