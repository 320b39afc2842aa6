// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System signals the capture engine reacts to.
//!
//! The daemon owns the broadcast channel and forwards platform
//! notifications (audio route changes, sleep, wake) into it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemSignal {
    /// Audio hardware configuration changed (device added/removed, route
    /// moved to another output).
    ConfigurationChanged,
    WillSleep,
    DidWake,
}
