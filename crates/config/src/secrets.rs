// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secrets blob: `secrets/api-keys.json`, mode 0600.
//!
//! Provider keys live in one JSON file owned by this process so the OS
//! secret store is never hit on the hot path (each hit can raise an
//! unlock prompt). A one-time migration drains any keys a previous
//! version stored in the OS keychain, then records a marker so the
//! keychain is never consulted again.

use quedo_core::settings::ProviderKind;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("secrets io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("secrets blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where a previous installation may have stored keys.
pub trait LegacySecretSource: Send + Sync {
    fn read(&self, kind: ProviderKind) -> Option<String>;
}

/// Reads the OS secret store via the `keyring` service entry `quedo`.
/// Every failure means "nothing to migrate" so headless hosts never block.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSource;

impl LegacySecretSource for KeyringSource {
    fn read(&self, kind: ProviderKind) -> Option<String> {
        let account = format!("{}_api_key", kind.as_str());
        match keyring::Entry::new("quedo", &account) {
            Ok(entry) => entry.get_password().ok(),
            Err(e) => {
                debug!(provider = %kind, error = %e, "keyring unavailable");
                None
            }
        }
    }
}

/// No legacy source (tests, fresh platforms).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLegacySecrets;

impl LegacySecretSource for NoLegacySecrets {
    fn read(&self, _kind: ProviderKind) -> Option<String> {
        None
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SecretsBlob {
    version: u32,
    keys: std::collections::BTreeMap<String, String>,
    /// Set after the one-time OS-store migration ran.
    keychain_migrated: bool,
}

/// File-backed secret storage.
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self, kind: ProviderKind) -> Result<Option<String>, SecretsError> {
        Ok(self.read_blob()?.keys.get(kind.as_str()).cloned())
    }

    pub fn save(&self, kind: ProviderKind, value: &str) -> Result<(), SecretsError> {
        let mut blob = self.read_blob()?;
        blob.keys.insert(kind.as_str().to_string(), value.to_string());
        self.write_blob(&blob)
    }

    pub fn clear(&self, kind: ProviderKind) -> Result<(), SecretsError> {
        let mut blob = self.read_blob()?;
        if blob.keys.remove(kind.as_str()).is_some() {
            self.write_blob(&blob)?;
        }
        Ok(())
    }

    /// Which providers currently have a key, without exposing values.
    pub fn present(&self) -> Result<Vec<ProviderKind>, SecretsError> {
        let blob = self.read_blob()?;
        let mut kinds = Vec::new();
        for kind in [ProviderKind::Groq, ProviderKind::OpenAi] {
            if blob.keys.contains_key(kind.as_str()) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    /// Pull keys out of the OS secret store exactly once. Existing blob
    /// entries win; the marker is written even when nothing was found.
    pub fn migrate_legacy(&self, source: &dyn LegacySecretSource) -> Result<(), SecretsError> {
        let mut blob = self.read_blob()?;
        if blob.keychain_migrated {
            return Ok(());
        }
        for kind in [ProviderKind::Groq, ProviderKind::OpenAi] {
            if blob.keys.contains_key(kind.as_str()) {
                continue;
            }
            if let Some(value) = source.read(kind) {
                debug!(provider = %kind, "migrated key from OS secret store");
                blob.keys.insert(kind.as_str().to_string(), value);
            }
        }
        blob.keychain_migrated = true;
        self.write_blob(&blob)
    }

    fn read_blob(&self) -> Result<SecretsBlob, SecretsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SecretsBlob {
                version: 1,
                ..SecretsBlob::default()
            }),
            Err(source) => Err(SecretsError::Io { path: self.path.clone(), source }),
        }
    }

    fn write_blob(&self, blob: &SecretsBlob) -> Result<(), SecretsError> {
        let io_err = |source| SecretsError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(blob)?;
        std::fs::write(&tmp, body).map_err(io_err)?;
        restrict_permissions(&tmp);
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), error = %e, "could not restrict secrets file mode");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
