// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! config.env watcher: edits by the user or the companion CLI reload
//! settings without a restart.

use crate::coordinator::Coordinator;
use crate::lifecycle;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use quedo_core::clock::Clock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Quiet window after a burst of file events before reloading.
const SETTLE: Duration = Duration::from_millis(250);

/// Watch the config directory and reload on config.env changes. The
/// returned watcher must be kept alive.
pub fn spawn_config_watch<C: Clock>(
    config_dir: &Path,
    coordinator: Arc<Coordinator<C>>,
) -> notify::Result<RecommendedWatcher> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                let touches_env = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n == "config.env").unwrap_or(false));
                if touches_env {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(error = %e, "config watcher error"),
        }
    })?;
    std::fs::create_dir_all(config_dir).ok();
    watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
    info!(dir = %config_dir.display(), "watching config.env");

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Editors fire several events per save; absorb the burst.
            tokio::time::sleep(SETTLE).await;
            while rx.try_recv().is_ok() {}

            debug!("config.env changed; reloading settings");
            if let Err(e) = lifecycle::reload_settings(coordinator.as_ref(), "config.env").await
            {
                warn!(error = %e, "settings reload failed");
            }
        }
    });

    Ok(watcher)
}
