//! Speech-to-text capability and a faster-whisper server client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::http;

/// Audio uploads can take a while on CPU inference.
const TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe encoded audio (any container the server's ffmpeg accepts).
    async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> ClientResult<String>;
}

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Full `audio/transcriptions` URL
    pub url: String,
    /// Model size, e.g. `large-v3`
    pub model: String,
    pub api_key: Option<String>,
}

/// Client for an OpenAI-compatible `audio/transcriptions` endpoint.
#[derive(Clone)]
pub struct WhisperClient {
    config: WhisperConfig,
    client: Client,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> ClientResult<Self> {
        let client = http::client(TRANSCRIPTION_TIMEOUT)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> ClientResult<String> {
        debug!(bytes = audio.len(), model = %self.config.model, "sending audio for transcription");

        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .part(
                "file",
                Part::bytes(audio.to_vec())
                    .file_name("audio")
                    .mime_str("application/octet-stream")?,
            );
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            form = form.text("language", language.to_string());
        }

        let mut request = self.client.post(&self.config.url).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        transcript_text(&payload)
    }
}

/// Join trimmed, non-empty segment texts; fall back to the top-level `text`.
fn transcript_text(payload: &Value) -> ClientResult<String> {
    if let Some(segments) = payload["segments"].as_array() {
        let joined = segments
            .iter()
            .filter_map(|s| s["text"].as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return Ok(joined);
    }

    payload["text"]
        .as_str()
        .map(|t| t.trim().to_string())
        .ok_or_else(|| ClientError::InvalidResponse("missing transcription text".into()))
}
