// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration store: one owner for settings, config.env, and
//! secrets. Loads merge the settings document with config.env overrides;
//! saves validate first and write both files atomically.

use crate::env_file::EnvFile;
use crate::paths::{ConfigPaths, PathError};
use crate::secrets::{LegacySecretSource, SecretsError, SecretsFile};
use crate::validate::{validate, ConfigIssues};
use quedo_core::settings::{AppSettings, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Current settings document version.
const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Paths(#[from] PathError),
    #[error("config io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings document is malformed: {0}")]
    Malformed(#[from] toml::de::Error),
    #[error("settings document could not be encoded: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigIssues),
    #[error(transparent)]
    Secrets(#[from] SecretsError),
}

/// Versioned wrapper around [`AppSettings`] for the TOML document.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsDoc {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(flatten)]
    settings: AppSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

/// Owner of all configuration files.
pub struct ConfigStore {
    paths: ConfigPaths,
    secrets: SecretsFile,
    legacy_secrets: Box<dyn LegacySecretSource>,
}

impl ConfigStore {
    pub fn new(paths: ConfigPaths, legacy_secrets: Box<dyn LegacySecretSource>) -> Self {
        let secrets = SecretsFile::new(paths.secrets_file());
        Self { paths, secrets, legacy_secrets }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Load settings: document (or defaults on first run), then config.env
    /// key overrides. API keys found in config.env are imported into the
    /// secrets blob. Runs the one-time OS-secret-store migration.
    pub fn load(&self) -> Result<AppSettings, ConfigError> {
        let mut settings = self.read_document()?;

        if let Some(env) = self.read_env_file()? {
            for warning in env.apply(&mut settings) {
                warn!(%warning, "ignoring config.env value");
            }
            for (kind, value) in env.api_keys() {
                if self.secrets.load(kind)?.is_none() {
                    self.secrets.save(kind, &value)?;
                    info!(provider = %kind, "imported API key from config.env");
                }
            }
        }

        self.secrets.migrate_legacy(self.legacy_secrets.as_ref())?;
        Ok(settings)
    }

    /// Validate and persist. Both files are written atomically; the
    /// settings document is the source of truth, config.env mirrors the
    /// CLI-visible keys.
    pub fn save(&self, settings: &AppSettings) -> Result<(), ConfigError> {
        validate(settings)?;

        let doc = SettingsDoc { version: SETTINGS_VERSION, settings: settings.clone() };
        let body = toml::to_string_pretty(&doc)?;
        write_atomic(&self.paths.settings_file(), body.as_bytes())?;

        let env = EnvFile::from_settings(settings);
        write_atomic(&self.paths.env_file(), env.render().as_bytes())?;
        Ok(())
    }

    pub fn validate(&self, settings: &AppSettings) -> Result<(), ConfigIssues> {
        validate(settings)
    }

    pub fn load_secret(&self, kind: ProviderKind) -> Result<Option<String>, ConfigError> {
        Ok(self.secrets.load(kind)?)
    }

    pub fn save_secret(&self, kind: ProviderKind, value: &str) -> Result<(), ConfigError> {
        Ok(self.secrets.save(kind, value)?)
    }

    pub fn clear_secret(&self, kind: ProviderKind) -> Result<(), ConfigError> {
        Ok(self.secrets.clear(kind)?)
    }

    /// Settings as a flat map with secret material removed. Safe to log
    /// and to ship in support bundles.
    pub fn redacted_snapshot(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let settings = self.load()?;
        let mut map = BTreeMap::new();
        map.insert("profile".into(), format!("{:?}", settings.profile).to_lowercase());
        map.insert("output".into(), settings.output.as_config_str().to_string());
        map.insert("language".into(), settings.language.clone());
        map.insert("interaction".into(), format!("{:?}", settings.interaction).to_lowercase());
        map.insert("launch_at_login".into(), settings.launch_at_login.to_string());
        map.insert("vocabulary_count".into(), settings.vocabulary.len().to_string());
        map.insert("provider.primary".into(), settings.provider.primary.to_string());
        map.insert("provider.fallback".into(), settings.provider.fallback.to_string());
        map.insert("provider.timeout_secs".into(), settings.provider.timeout_secs.to_string());
        for kind in [ProviderKind::Groq, ProviderKind::OpenAi] {
            map.insert(
                format!("provider.model.{kind}"),
                settings.provider.model_for(kind).to_string(),
            );
            map.insert(format!("provider.key_ref.{kind}"), settings.provider.key_ref_for(kind));
        }
        for binding in &settings.hotkeys {
            map.insert(format!("hotkey.{}", binding.action), binding.chord());
        }
        for kind in self.secrets.present()? {
            map.insert(format!("secret.{kind}"), "•••".into());
        }
        Ok(map)
    }

    fn read_document(&self) -> Result<AppSettings, ConfigError> {
        let path = self.paths.settings_file();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let doc: SettingsDoc = toml::from_str(&text)?;
                Ok(doc.settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(AppSettings::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    fn read_env_file(&self) -> Result<Option<EnvFile>, ConfigError> {
        let path = self.paths.env_file();
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(EnvFile::parse(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }
}

/// Write-temp + rename so readers see either the old or the new content.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
