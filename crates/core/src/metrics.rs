// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric sample shape. Aggregation into 1-minute buckets happens in
//! quedo-diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Wall-clock time, epoch milliseconds.
    pub at_ms: u64,
}

impl MetricPoint {
    pub fn new(name: impl Into<String>, value: f64, at_ms: u64) -> Self {
        Self { name: name.into(), value, tags: BTreeMap::new(), at_ms }
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Metric names emitted by the coordinator and components.
pub mod names {
    pub const DEGRADED_ENTER_TOTAL: &str = "degraded_enter_total";
    pub const HOTKEY_TRIGGER_TOTAL: &str = "hotkey_trigger_total";
    pub const SESSION_START_TOTAL: &str = "session_start_total";
    pub const SESSION_START_FAILED_TOTAL: &str = "session_start_failed_total";
    pub const SESSION_LATENCY_STOP_TO_FINAL_MS: &str =
        "session_latency_stop_to_final_transcript_ms";
}
