// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring, lock/pid/socket files, shutdown.

use crate::coordinator::{Coordinator, CoordinatorDeps};
use crate::env;
use fs2::FileExt;
use quedo_adapters::output::OutputRouter;
use quedo_adapters::provider::ProviderRegistry;
use quedo_adapters::DesktopNotifier;
use quedo_capture::{CaptureEngine, CpalInput};
use quedo_config::{ConfigError, ConfigPaths, ConfigStore, KeyringSource};
use quedo_core::clock::{Clock, SystemClock};
use quedo_core::error_code;
use quedo_core::event::SessionEvent;
use quedo_core::lifecycle::DegradedReason;
use quedo_core::metrics::MetricPoint;
use quedo_core::settings::{AppSettings, ProviderKind};
use quedo_diagnostics::{DiagnosticsCenter, EventSink};
use quedo_hotkeys::{
    Edge, GlobalHotkeyBackend, HotkeyBackend, HotkeyError, HotkeyLog, HotkeyService,
    RdevMonitorBackend,
};
use quedo_pipeline::TranscriptionPipeline;
use quedo_storage::{migrate_legacy_history, HistoryStore};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Fixed file names under the support directory.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub paths: ConfigPaths,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
}

impl DaemonConfig {
    pub fn load() -> Result<Self, LifecycleError> {
        let paths = ConfigPaths::resolve().map_err(|e| LifecycleError::Paths(e.to_string()))?;
        Ok(Self {
            socket_path: paths.support_dir.join("quedod.sock"),
            lock_path: paths.support_dir.join("quedod.pid"),
            log_path: paths.logs_dir().join("app.log"),
            paths,
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not resolve the filesystem layout: {0}")]
    Paths(String),
    #[error("another quedod appears to be running (lock busy)")]
    LockFailed(#[source] std::io::Error),
    #[error("could not bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("history store failed: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the run loop needs.
pub struct DaemonState {
    pub config: DaemonConfig,
    pub coordinator: Arc<Coordinator<SystemClock>>,
    pub hotkeys: Arc<HotkeyService<SystemClock>>,
    // NOTE(lifetime): held for the exclusive lock; released on drop.
    #[allow(dead_code)]
    lock_file: File,
}

/// Bridge from the diagnostics center into the history store.
struct StoreSink {
    store: Arc<HistoryStore>,
}

impl EventSink for StoreSink {
    fn append_event(&self, event: &SessionEvent) {
        if let Err(e) = self.store.append_event(event) {
            warn!(error = %e, name = %event.name, "could not persist event");
        }
    }

    fn record_metric(&self, point: &MetricPoint) {
        if let Err(e) = self.store.record_metric(point, None) {
            warn!(error = %e, name = %point.name, "could not persist metric");
        }
    }
}

/// Stands in for the registered-hotkey backend when the platform refused
/// to provide one; every registration fails so the coordinator lands in
/// degraded(hotkeyFailure) through the normal path.
struct UnavailableBackend {
    reason: String,
}

impl HotkeyBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn register(
        &self,
        _id: u32,
        _binding: &quedo_core::hotkey::HotkeyBinding,
    ) -> Result<(), HotkeyError> {
        Err(HotkeyError::RegistrationFailed(self.reason.clone()))
    }

    fn unregister(&self, _id: u32) -> Result<(), HotkeyError> {
        Ok(())
    }
}

/// Build the provider registry with keys from the secrets store.
pub fn build_registry(config: &ConfigStore) -> ProviderRegistry {
    ProviderRegistry::standard(|kind| config.load_secret(kind).ok().flatten())
}

/// Bring the daemon up. On success the lifecycle machine has left
/// `booting` and the socket is ready to serve.
pub async fn startup(config: DaemonConfig) -> Result<(DaemonState, UnixListener), LifecycleError> {
    let clock = SystemClock;
    std::fs::create_dir_all(&config.paths.support_dir)?;

    // 1. Exclusive daemon lock + pid file.
    let mut lock_file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 2. Settings. Validation failures on initial load are fatal and
    //    report every issue at once.
    let config_store = Arc::new(ConfigStore::new(
        config.paths.clone(),
        Box::new(KeyringSource),
    ));
    let settings = config_store.load()?;
    config_store.validate(&settings).map_err(ConfigError::from)?;

    // 3. History store, with corrupt-database recovery.
    let (store, open_report) = HistoryStore::open(
        &config.paths.db_file(),
        &config.paths.support_dir,
        clock.epoch_ms(),
    )
    .map_err(|e| LifecycleError::Storage(e.to_string()))?;
    let store = Arc::new(store);

    // 4. Legacy history import (idempotent).
    if !env::skip_migration() {
        match migrate_legacy_history(&store, &config.paths.legacy_history_dir(), clock.epoch_ms())
        {
            Ok(report) if report.scanned > 0 => info!(?report, "legacy history scanned"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "legacy history migration failed"),
        }
    }

    // 5. Settings snapshot for the audit trail (redacted).
    if let Ok(snapshot) = config_store.redacted_snapshot() {
        let json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".into());
        if let Err(e) = store.snapshot_settings(&json, clock.epoch_ms()) {
            warn!(error = %e, "could not persist settings snapshot");
        }
    }

    // 6. Core components.
    let diag = Arc::new(DiagnosticsCenter::new(
        clock,
        Arc::new(StoreSink { store: store.clone() }),
    ));
    let capture = CaptureEngine::new(Arc::new(CpalInput::new()), clock, std::env::temp_dir());
    let pipeline = TranscriptionPipeline::new(build_registry(&config_store), clock);
    let router = OutputRouter::system();

    let coordinator = Arc::new(Coordinator::new(CoordinatorDeps {
        clock,
        capture,
        pipeline,
        router,
        store,
        diag,
        notifier: Arc::new(DesktopNotifier::new()),
        config: config_store.clone(),
        settings: settings.clone(),
        log_path: config.log_path.clone(),
    }));

    // 7. Hotkeys: both backends plus the dispatch bridge into the
    //    coordinator.
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let native: Arc<dyn HotkeyBackend> = match GlobalHotkeyBackend::new(event_tx.clone()) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            warn!(error = %e, "registered-hotkey backend unavailable");
            Arc::new(UnavailableBackend { reason: e.to_string() })
        }
    };
    let monitor = Arc::new(RdevMonitorBackend::new(event_tx));
    let hotkeys = Arc::new(HotkeyService::new(
        native,
        monitor,
        event_rx,
        clock,
        HotkeyLog::new(config.paths.logs_dir().join("hotkeys.log")),
    ));

    let (action_tx, mut action_rx) =
        tokio::sync::mpsc::unbounded_channel::<(quedo_core::hotkey::HotkeyAction, Edge)>();
    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            while let Some((action, edge)) = action_rx.recv().await {
                coordinator.handle_hotkey(action, edge).await;
            }
        });
    }
    let handler: quedo_hotkeys::Handler = Arc::new(move |action, edge| {
        let _ = action_tx.send((action, edge));
    });

    let hotkeys_ok = match hotkeys.set_bindings(settings.hotkeys.clone(), handler).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "hotkey bindings could not be installed");
            false
        }
    };

    // 8. Socket.
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 9. Leave booting.
    let needs_onboarding = needs_onboarding(&config_store);
    coordinator.finish_boot(open_report.recovered, needs_onboarding).await;
    if !hotkeys_ok {
        coordinator
            .degrade(DegradedReason::HotkeyFailure, error_code::HOTKEY_REGISTRATION_FAILED)
            .await;
    }

    info!(socket = %config.socket_path.display(), "quedod ready");
    Ok((DaemonState { config, coordinator, hotkeys, lock_file }, listener))
}

/// First run: no key for either provider means the user has not finished
/// setup.
fn needs_onboarding(config: &ConfigStore) -> bool {
    [ProviderKind::Groq, ProviderKind::OpenAi]
        .iter()
        .all(|kind| matches!(config.load_secret(*kind), Ok(None) | Err(_)))
}

impl DaemonState {
    /// Graceful teardown: deactivate hotkeys, drop socket and pid files.
    pub async fn shutdown(&self) {
        info!("shutting down quedod");
        self.coordinator.begin_shutdown().await;
        self.hotkeys.deactivate();
        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        if self.config.lock_path.exists() {
            let _ = std::fs::remove_file(&self.config.lock_path);
        }
        info!("shutdown complete");
    }
}

/// Reload settings from disk and push them into the coordinator.
pub async fn reload_settings<C: Clock>(
    coordinator: &Coordinator<C>,
    source: &str,
) -> Result<AppSettings, ConfigError> {
    let config = coordinator.config().clone();
    let settings = match config.load() {
        Ok(settings) => settings,
        Err(e) => {
            coordinator.note_settings_error(&e.to_string());
            return Err(e);
        }
    };
    if let Err(issues) = config.validate(&settings) {
        warn!(%issues, "reloaded settings are invalid; keeping the previous set");
        coordinator.note_settings_error(&issues.to_string());
        return Err(issues.into());
    }
    let registry = build_registry(&config);
    coordinator.apply_settings(settings.clone(), registry, source).await;
    Ok(settings)
}
