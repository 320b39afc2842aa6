// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quedo-config: the configuration store.
//!
//! Owns the primary settings document, the shared config.env used by the
//! companion CLI, the secrets blob, and validation. Nothing else in the
//! process touches these files.

mod env_file;
mod paths;
mod secrets;
mod store;
mod validate;

pub use env_file::EnvFile;
pub use paths::ConfigPaths;
pub use secrets::{KeyringSource, LegacySecretSource, NoLegacySecrets};
pub use store::{ConfigError, ConfigStore};
pub use validate::{validate, ConfigIssue, ConfigIssues};
