// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapter shared by both vendors.
//!
//! Wire form: `POST {base}/audio/transcriptions` as multipart/form-data
//! with `model`, optional `language`, optional `prompt`, and the audio
//! bytes under `file`; `Authorization: Bearer <key>`. Health is
//! `GET {base}/models`.

use super::{ProviderError, TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};
use async_trait::async_trait;
use quedo_core::settings::ProviderKind;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// How a status code is treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Success,
    Transient,
    RateLimited,
    Auth,
    Terminal,
}

pub(crate) fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 => StatusClass::RateLimited,
        408 | 500 | 502 | 503 | 504 => StatusClass::Transient,
        401 | 403 => StatusClass::Auth,
        _ => StatusClass::Terminal,
    }
}

#[derive(Deserialize)]
struct TranscriptionBody {
    text: String,
}

/// One vendor endpoint with its key.
pub struct HttpProvider {
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Standard endpoint for a vendor.
    pub fn for_vendor(kind: ProviderKind, api_key: Option<String>) -> Self {
        let base = match kind {
            ProviderKind::Groq => GROQ_BASE_URL,
            ProviderKind::OpenAi => OPENAI_BASE_URL,
        };
        Self::new(kind, base, api_key)
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingApiKey(self.kind))
    }

    fn map_transport_error(&self, e: reqwest::Error, timeout: Duration) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// MIME type for the upload, from the file extension.
fn mime_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("flac") => "audio/flac",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "audio/wav",
    }
}

#[async_trait]
impl TranscriptionProvider for HttpProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProviderError> {
        let key = self.key()?.to_string();

        let bytes = tokio::fs::read(&request.audio_path)
            .await
            .map_err(|e| ProviderError::Network(format!("reading audio file: {e}")))?;
        let file_name = request
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.wav".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(&request.audio_path))
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", request.model.clone())
            .part("file", part);
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = request.wire_prompt() {
            form = form.text("prompt", prompt);
        }

        debug!(provider = %self.kind, model = %request.model, "sending transcription request");
        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(key)
            .timeout(request.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, request.timeout))?;

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Success => {
                let body: TranscriptionBody = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                Ok(TranscriptionResponse { text: body.text })
            }
            StatusClass::RateLimited => Err(ProviderError::RateLimited),
            StatusClass::Transient => Err(ProviderError::Transient { status }),
            StatusClass::Auth => Err(ProviderError::Auth { status }),
            StatusClass::Terminal => {
                let body = response.text().await.unwrap_or_default();
                let body = body.chars().take(512).collect::<String>();
                warn!(provider = %self.kind, status, "terminal provider error");
                Err(ProviderError::Terminal { status, body })
            }
        }
    }

    async fn check_health(&self, timeout: Duration) -> bool {
        let Ok(key) = self.key() else {
            return false;
        };
        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(key)
            .timeout(timeout)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(provider = %self.kind, error = %e, "health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
