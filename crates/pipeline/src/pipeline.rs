// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider selection and the per-request retry policy.
//!
//! Order of attempts for one transcription:
//!
//! ```text
//! effective primary
//!   retryable failure → sleep 1 s → effective primary again
//!     failure → effective fallback
//!       success → sticky window + background reprobe
//!       failure → RetryAvailable(primary error, fallback error)
//!   terminal failure → effective fallback (no primary retry)
//! ```
//!
//! While `now < fallback_sticky_until` the configured fallback *is* the
//! effective primary. A success on the configured fallback always arms
//! the window and (re)starts the reprobe of the configured primary; the
//! probe's first healthy answer clears the window and exits.

use crate::chunker::{chunk_audio, ChunkSet};
use crate::cleanup;
use parking_lot::{Mutex, RwLock};
use quedo_adapters::provider::{
    ProviderError, ProviderRegistry, TranscriptionProvider, TranscriptionRequest,
};
use quedo_core::clock::{Clock, SystemClock};
use quedo_core::settings::{AppSettings, ProviderConfiguration, ProviderKind};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long a fallback success keeps the fallback first in line.
const STICKY_WINDOW: Duration = Duration::from_secs(30);
/// Cadence of the background reprobe of the original primary.
const PROBE_INTERVAL: Duration = Duration::from_secs(60);
/// Pause before the second primary attempt.
const PRIMARY_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Budget for each connectivity / reprobe health check.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(6);
/// Rolling context carried between chunks.
const CONTEXT_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("provider {0} is not configured")]
    ProviderUnavailable(ProviderKind),
    #[error("transcription failed on both providers (primary: {primary}, fallback: {fallback})")]
    RetryAvailable {
        primary: ProviderError,
        fallback: ProviderError,
    },
    #[error("audio chunking failed: {0}")]
    Chunking(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub text: String,
    pub provider_used: ProviderKind,
    /// True when this request had to fail over mid-flight.
    pub fallback_used: bool,
    pub chunks: usize,
}

/// The transcription pipeline. One per process; safe to share.
pub struct TranscriptionPipeline<C: Clock = SystemClock> {
    registry: RwLock<ProviderRegistry>,
    clock: C,
    sticky_until: Arc<Mutex<Option<Instant>>>,
    probe: Mutex<Option<CancellationToken>>,
}

impl<C: Clock> TranscriptionPipeline<C> {
    pub fn new(registry: ProviderRegistry, clock: C) -> Self {
        Self {
            registry: RwLock::new(registry),
            clock,
            sticky_until: Arc::new(Mutex::new(None)),
            probe: Mutex::new(None),
        }
    }

    /// Swap the provider registry (settings reload).
    pub fn set_registry(&self, registry: ProviderRegistry) {
        *self.registry.write() = registry;
    }

    /// End of the sticky window, if one is armed.
    pub fn sticky_until(&self) -> Option<Instant> {
        *self.sticky_until.lock()
    }

    /// Transcribe one audio file with the full policy.
    pub async fn transcribe(
        &self,
        audio: &Path,
        settings: &AppSettings,
        replacements: &BTreeMap<String, String>,
    ) -> Result<PipelineResult, PipelineError> {
        let chunks = chunk_audio(audio)?;
        let cfg = &settings.provider;
        let (first_kind, second_kind) = self.effective_order(cfg);
        debug!(first = %first_kind, second = %second_kind, chunks = chunks.len(), "starting transcription");

        let registry = self.registry.read().clone();
        let first = registry
            .get(first_kind)
            .ok_or(PipelineError::ProviderUnavailable(first_kind))?;

        let first_error = match self.attempt(first.as_ref(), &chunks, settings).await {
            Ok(text) => {
                return Ok(self.finish(text, first_kind, false, cfg, &registry, replacements, &chunks))
            }
            Err(e) if e.retryable() => {
                debug!(provider = %first_kind, error = %e, "retryable failure; retrying primary once");
                tokio::time::sleep(PRIMARY_RETRY_DELAY).await;
                match self.attempt(first.as_ref(), &chunks, settings).await {
                    Ok(text) => {
                        return Ok(self.finish(
                            text,
                            first_kind,
                            false,
                            cfg,
                            &registry,
                            replacements,
                            &chunks,
                        ))
                    }
                    Err(e2) => e2,
                }
            }
            Err(e) => {
                debug!(provider = %first_kind, error = %e, "terminal failure; going to fallback");
                e
            }
        };

        let second = registry
            .get(second_kind)
            .ok_or(PipelineError::ProviderUnavailable(second_kind))?;
        match self.attempt(second.as_ref(), &chunks, settings).await {
            Ok(text) => {
                Ok(self.finish(text, second_kind, true, cfg, &registry, replacements, &chunks))
            }
            Err(second_error) => {
                warn!(
                    primary = %first_error,
                    fallback = %second_error,
                    "both providers failed; retry available"
                );
                Err(PipelineError::RetryAvailable {
                    primary: first_error,
                    fallback: second_error,
                })
            }
        }
    }

    /// Concurrent health probes with a fixed budget each.
    pub async fn connectivity_check(&self, cfg: &ProviderConfiguration) -> (bool, bool) {
        let registry = self.registry.read().clone();
        let primary = registry.get(cfg.primary);
        let fallback = registry.get(cfg.fallback);
        tokio::join!(
            async {
                match primary {
                    Some(p) => p.check_health(HEALTH_PROBE_TIMEOUT).await,
                    None => false,
                }
            },
            async {
                match fallback {
                    Some(f) => f.check_health(HEALTH_PROBE_TIMEOUT).await,
                    None => false,
                }
            }
        )
    }

    /// (effective primary, effective fallback).
    fn effective_order(&self, cfg: &ProviderConfiguration) -> (ProviderKind, ProviderKind) {
        let sticky = (*self.sticky_until.lock())
            .map(|until| self.clock.now() < until)
            .unwrap_or(false);
        if sticky {
            (cfg.fallback, cfg.primary)
        } else {
            (cfg.primary, cfg.fallback)
        }
    }

    /// One full pass over every chunk against one provider, with the
    /// per-chunk wall-clock timeout and rolling context.
    async fn attempt(
        &self,
        provider: &dyn TranscriptionProvider,
        chunks: &ChunkSet,
        settings: &AppSettings,
    ) -> Result<String, ProviderError> {
        let cfg = &settings.provider;
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let language = match settings.language.as_str() {
            "auto" | "" => None,
            lang => Some(lang.to_string()),
        };

        let mut texts: Vec<String> = Vec::with_capacity(chunks.len());
        let mut context: Option<String> = None;
        for path in chunks.paths() {
            let request = TranscriptionRequest {
                audio_path: path.clone(),
                language: language.clone(),
                model: cfg.model_for(provider.kind()).to_string(),
                prompt: context.clone(),
                vocabulary: settings.vocabulary.clone(),
                timeout,
            };
            // Race the provider call against the hard timeout; the loser
            // is dropped (and with it any in-flight request).
            let response =
                match tokio::time::timeout(timeout, provider.transcribe(&request)).await {
                    Ok(result) => result?,
                    Err(_elapsed) => return Err(ProviderError::Timeout(timeout)),
                };
            context = Some(tail_chars(&response.text, CONTEXT_CHARS));
            texts.push(response.text);
        }
        Ok(texts.join(" "))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        raw: String,
        used: ProviderKind,
        failed_over: bool,
        cfg: &ProviderConfiguration,
        registry: &ProviderRegistry,
        replacements: &BTreeMap<String, String>,
        chunks: &ChunkSet,
    ) -> PipelineResult {
        if used == cfg.fallback {
            *self.sticky_until.lock() = Some(self.clock.now() + STICKY_WINDOW);
            info!(fallback = %used, "fallback succeeded; sticky window armed");
            if let Some(primary) = registry.get(cfg.primary) {
                self.restart_probe(primary);
            }
        }

        let scrubbed = cleanup::scrub(&raw);
        let text = cleanup::apply_replacements(
            &scrubbed,
            replacements.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        PipelineResult { text, provider_used: used, fallback_used: failed_over, chunks: chunks.len() }
    }

    /// (Re)start the background reprobe of the configured primary. The
    /// first healthy answer clears the sticky window and ends the task.
    fn restart_probe(&self, primary: Arc<dyn TranscriptionProvider>) {
        let mut guard = self.probe.lock();
        if let Some(token) = guard.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        *guard = Some(token.clone());

        let sticky = self.sticky_until.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(PROBE_INTERVAL) => {}
                }
                if primary.check_health(HEALTH_PROBE_TIMEOUT).await {
                    info!(primary = %primary.kind(), "primary healthy again; clearing sticky window");
                    *sticky.lock() = None;
                    return;
                }
            }
        });
    }
}

impl<C: Clock> Drop for TranscriptionPipeline<C> {
    fn drop(&mut self) {
        if let Some(token) = self.probe.lock().take() {
            token.cancel();
        }
    }
}

/// Last `count` chars on char boundaries.
fn tail_chars(text: &str, count: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(count)).collect()
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
