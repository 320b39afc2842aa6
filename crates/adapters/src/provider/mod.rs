// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcription provider adapters.
//!
//! Providers are a closed set; the registry maps [`ProviderKind`] to an
//! adapter. The pipeline only ever talks to the [`TranscriptionProvider`]
//! trait, so its retry/fallback logic is tested against scripted fakes.

mod http;

pub use http::HttpProvider;

use async_trait::async_trait;
use quedo_core::settings::ProviderKind;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One transcription request, covering a single audio chunk.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    /// `None` means auto-detect; the field is omitted from the wire form.
    pub language: Option<String>,
    pub model: String,
    /// Rolling context from the previous chunk.
    pub prompt: Option<String>,
    pub vocabulary: Vec<String>,
    /// Hard wall-clock budget for this request.
    pub timeout: Duration,
}

impl TranscriptionRequest {
    /// Vendors take one free-text prompt; vocabulary hints lead, rolling
    /// context follows.
    pub fn wire_prompt(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.vocabulary.is_empty() {
            parts.push(self.vocabulary.join(", "));
        }
        if let Some(prompt) = &self.prompt {
            if !prompt.is_empty() {
                parts.push(prompt.clone());
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// Decoded provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Provider failure classes. `retryable()` drives the pipeline policy.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("no API key configured for {0}")]
    MissingApiKey(ProviderKind),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network failure: {0}")]
    Network(String),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("transient server error: status {status}")]
    Transient { status: u16 },
    #[error("authentication rejected: status {status}")]
    Auth { status: u16 },
    #[error("terminal provider error: status {status}")]
    Terminal { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Timeout, network, and transient 5xx/429/408 class failures may be
    /// retried; auth, bad-request, and decode failures may not.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_)
                | ProviderError::Network(_)
                | ProviderError::RateLimited
                | ProviderError::Transient { .. }
        )
    }

    /// Stable code for diagnostics attributes.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::MissingApiKey(_) => "missing_api_key",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Network(_) => "network_failure",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::Transient { .. } => "transient",
            ProviderError::Auth { .. } => "auth",
            ProviderError::Terminal { .. } => "terminal",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// A transcription vendor.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProviderError>;

    /// Cheap reachability probe; true on any 2xx from the vendor.
    async fn check_health(&self, timeout: Duration) -> bool;
}

/// Keyed map from provider kind to adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn TranscriptionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: Arc<dyn TranscriptionProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn TranscriptionProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Build the standard registry: both HTTP vendors, keys resolved via
    /// the supplied lookup (normally the configuration store).
    pub fn standard(resolve_key: impl Fn(ProviderKind) -> Option<String>) -> Self {
        let mut registry = Self::new();
        for kind in [ProviderKind::Groq, ProviderKind::OpenAi] {
            registry.insert(Arc::new(HttpProvider::for_vendor(kind, resolve_key(kind))));
        }
        registry
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProvider;
