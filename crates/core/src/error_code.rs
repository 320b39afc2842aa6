// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable error-code strings carried by `last_error_code`, diagnostics
//! attributes, and metric tags. Codes are part of the external contract;
//! never rename one.

pub const CAPTURE_OPEN_FAILED: &str = "capture_open_failed";
pub const NO_INPUT_DEVICE: &str = "no_input_device";
pub const CALLBACK_STALLED: &str = "callback_stalled";
pub const STOP_TIMED_OUT: &str = "stop_timed_out";
pub const WRITER_FAILED: &str = "writer_failed";
pub const PROVIDER_UNAVAILABLE: &str = "provider_unavailable";
pub const BOTH_PROVIDERS_FAILED: &str = "both_providers_failed";
pub const MISSING_API_KEY: &str = "missing_api_key";
pub const CHUNKING_FAILED: &str = "chunking_failed";
pub const PASTE_DENIED: &str = "paste_denied";
pub const OUTPUT_FAILED: &str = "output_failed";
pub const PERSISTENCE_FAILED: &str = "persistence_failed";
pub const HOTKEY_REGISTRATION_FAILED: &str = "hotkey_registration_failed";
pub const DB_CORRUPT_RECOVERED: &str = "db_corrupt_recovered";
pub const RECOVERY_BUDGET_EXHAUSTED: &str = "recovery_budget_exhausted";
pub const INTERNAL_ERROR: &str = "internal_error";
