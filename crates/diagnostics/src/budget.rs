// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery budget and user-notification cooldowns.
//!
//! Automatic recovery is bounded: 5 attempts per rolling 10 minutes per
//! subsystem tag. The coordinator must consume from the budget before
//! every attempt; exhaustion forces `degraded(internalError)`.

use parking_lot::Mutex;
use quedo_core::clock::Clock;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::warn;

/// Rolling window for recovery attempts.
const BUDGET_WINDOW: Duration = Duration::from_secs(600);
/// Attempts allowed per tag inside the window.
const BUDGET_ATTEMPTS: usize = 5;
/// Minimum gap between notifications about the same degraded reason.
const DEGRADED_NOTIFY_COOLDOWN: Duration = Duration::from_secs(120);
/// Minimum gap between silent-microphone warnings.
const SILENT_MIC_COOLDOWN: Duration = Duration::from_secs(300);

/// Bounded automatic-retry allowance, per subsystem tag.
pub struct RecoveryBudget<C: Clock> {
    clock: C,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl<C: Clock> RecoveryBudget<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, attempts: Mutex::new(HashMap::new()) }
    }

    /// Consume one attempt for `tag`. False means the budget is exhausted
    /// and the caller must stop recovering and go degraded.
    pub fn try_consume(&self, tag: &str) -> bool {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock();
        let window = attempts.entry(tag.to_string()).or_default();
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= BUDGET_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= BUDGET_ATTEMPTS {
            warn!(tag, "recovery budget exhausted");
            return false;
        }
        window.push_back(now);
        true
    }

    /// Attempts currently counted against `tag`.
    pub fn used(&self, tag: &str) -> usize {
        let now = self.clock.now();
        let attempts = self.attempts.lock();
        attempts
            .get(tag)
            .map(|window| {
                window.iter().filter(|at| now.duration_since(**at) < BUDGET_WINDOW).count()
            })
            .unwrap_or(0)
    }
}

/// Don't nag: one notification per degraded reason per two minutes, one
/// silent-microphone warning per five.
pub struct NotifyCooldowns<C: Clock> {
    clock: C,
    last_by_reason: Mutex<HashMap<String, Instant>>,
    last_silent_mic: Mutex<Option<Instant>>,
}

impl<C: Clock> NotifyCooldowns<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_by_reason: Mutex::new(HashMap::new()),
            last_silent_mic: Mutex::new(None),
        }
    }

    /// True when a notification for this degraded reason may go out now;
    /// records the send time when it may.
    pub fn allow_degraded_notification(&self, reason: &str) -> bool {
        let now = self.clock.now();
        let mut last = self.last_by_reason.lock();
        if let Some(at) = last.get(reason) {
            if now.duration_since(*at) < DEGRADED_NOTIFY_COOLDOWN {
                return false;
            }
        }
        last.insert(reason.to_string(), now);
        true
    }

    /// Same gate for the silent-microphone warning.
    pub fn allow_silent_mic_warning(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last_silent_mic.lock();
        if let Some(at) = *last {
            if now.duration_since(at) < SILENT_MIC_COOLDOWN {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
