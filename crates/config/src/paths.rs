// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout resolution.
//!
//! Overridable through `QUEDO_CONFIG_DIR` / `QUEDO_DATA_DIR` /
//! `QUEDO_SUPPORT_DIR` so tests and the CLI can point the whole stack at a
//! scratch directory.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("could not determine a home directory")]
    NoHome,
}

/// Resolved locations for everything Quedo persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// `$XDG_CONFIG_HOME/quedo` — settings.toml and config.env.
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/quedo` — legacy history source only.
    pub legacy_data_dir: PathBuf,
    /// Application-support tree: db/, media/, logs/, exports/, secrets/.
    pub support_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolve from the environment.
    pub fn resolve() -> Result<Self, PathError> {
        let config_dir = match std::env::var_os("QUEDO_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => match std::env::var_os("XDG_CONFIG_HOME") {
                Some(xdg) => PathBuf::from(xdg).join("quedo"),
                None => dirs::config_dir().ok_or(PathError::NoHome)?.join("quedo"),
            },
        };
        let legacy_data_dir = match std::env::var_os("QUEDO_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => match std::env::var_os("XDG_DATA_HOME") {
                Some(xdg) => PathBuf::from(xdg).join("quedo"),
                None => {
                    dirs::home_dir().ok_or(PathError::NoHome)?.join(".local/share/quedo")
                }
            },
        };
        let support_dir = match std::env::var_os("QUEDO_SUPPORT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir().ok_or(PathError::NoHome)?.join("Quedo"),
        };
        Ok(Self { config_dir, legacy_data_dir, support_dir })
    }

    /// Fixed layout rooted at one scratch directory (tests, `doctor`).
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.join("config"),
            legacy_data_dir: root.join("legacy"),
            support_dir: root.join("support"),
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn env_file(&self) -> PathBuf {
        self.config_dir.join("config.env")
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.support_dir.join("secrets").join("api-keys.json")
    }

    pub fn db_file(&self) -> PathBuf {
        self.support_dir.join("db").join("history.sqlite")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.support_dir.join("media")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.support_dir.join("logs")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.support_dir.join("exports")
    }

    pub fn legacy_history_dir(&self) -> PathBuf {
        self.legacy_data_dir.join("history")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
