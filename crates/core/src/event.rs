// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit events.
//!
//! Events are opaque name + attribute maps so collaborators (UI,
//! diagnostics export) never need schema changes when a new event appears.
//! The per-session sequence number is assigned by the history store on
//! insert.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: Option<SessionId>,
    pub name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Wall-clock time, epoch milliseconds.
    pub at_ms: u64,
    /// Monotonic per-session sequence; 0 until assigned by the store.
    #[serde(default)]
    pub seq: i64,
}

impl SessionEvent {
    pub fn new(name: impl Into<String>, at_ms: u64) -> Self {
        Self {
            session_id: None,
            name: name.into(),
            attrs: BTreeMap::new(),
            at_ms,
            seq: 0,
        }
    }

    #[must_use]
    pub fn for_session(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// Event names emitted to collaborators.
pub mod names {
    pub const LIFECYCLE_TRANSITION: &str = "lifecycle_transition";
    pub const PROVIDER_SWITCHED: &str = "provider_switched";
    pub const SETTINGS_RELOADED: &str = "settings_reloaded";
    pub const SETTINGS_SAVE_ERROR: &str = "settings_save_error";
    pub const PERMISSIONS_RECOVERED: &str = "permissions_recovered";
    pub const RUN_CHECKS_COMPLETED: &str = "run_checks_completed";
    pub const MIGRATION_EVENT: &str = "migration_event";
    pub const DB_CORRUPTION_RECOVERED: &str = "db_corruption_recovered";
    pub const INCIDENT_OPENED: &str = "incident_opened";
    pub const INCIDENT_CLOSED: &str = "incident_closed";
}
