// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::time::Duration;

/// Protocol version for the CLI handshake.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default IPC timeout for CLI requests.
pub fn ipc_timeout() -> Duration {
    std::env::var("QUEDO_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Log filter, `info` unless overridden.
pub fn log_filter() -> String {
    std::env::var("QUEDO_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Skip the legacy history migration (support escape hatch).
pub fn skip_migration() -> bool {
    std::env::var("QUEDO_SKIP_MIGRATION").map(|v| v == "1").unwrap_or(false)
}
