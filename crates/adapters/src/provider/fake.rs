// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted provider for pipeline and coordinator tests.

use super::{ProviderError, TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use quedo_core::settings::ProviderKind;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Recorded call, for asserting on prompts and models.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub language: Option<String>,
    pub prompt: Option<String>,
}

struct FakeState {
    outcomes: VecDeque<Result<String, ProviderError>>,
    requests: Vec<RecordedRequest>,
}

/// A provider whose outcomes are scripted in order. When the script runs
/// dry it keeps returning the last configured default.
#[derive(Clone)]
pub struct FakeProvider {
    kind: ProviderKind,
    state: Arc<Mutex<FakeState>>,
    default_text: Arc<Mutex<Option<String>>>,
    healthy: Arc<AtomicBool>,
    health_checks: Arc<Mutex<u32>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(FakeState {
                outcomes: VecDeque::new(),
                requests: Vec::new(),
            })),
            default_text: Arc::new(Mutex::new(None)),
            healthy: Arc::new(AtomicBool::new(true)),
            health_checks: Arc::new(Mutex::new(0)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Make every transcription take this long before responding.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Always succeed with `text` once the script is exhausted.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        *self.default_text.lock() = Some(text.into());
        self
    }

    /// Queue the next outcome.
    pub fn push_ok(&self, text: impl Into<String>) {
        self.state.lock().outcomes.push_back(Ok(text.into()));
    }

    pub fn push_err(&self, error: ProviderError) {
        self.state.lock().outcomes.push_back(Err(error));
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn health_check_count(&self) -> u32 {
        *self.health_checks.lock()
    }
}

#[async_trait]
impl TranscriptionProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProviderError> {
        // Record before any delay so a caller-side timeout still counts
        // the attempt.
        let (outcome, delay) = {
            let mut state = self.state.lock();
            state.requests.push(RecordedRequest {
                model: request.model.clone(),
                language: request.language.clone(),
                prompt: request.prompt.clone(),
            });
            (state.outcomes.pop_front(), *self.delay.lock())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match outcome {
            Some(Ok(text)) => Ok(TranscriptionResponse { text }),
            Some(Err(e)) => Err(e),
            None => match self.default_text.lock().clone() {
                Some(text) => Ok(TranscriptionResponse { text }),
                None => Err(ProviderError::Network("fake provider script exhausted".into())),
            },
        }
    }

    async fn check_health(&self, _timeout: Duration) -> bool {
        *self.health_checks.lock() += 1;
        self.healthy.load(Ordering::SeqCst)
    }
}
