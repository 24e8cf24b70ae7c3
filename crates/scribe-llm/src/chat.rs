//! Chat model capability and an OpenAI-compatible client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::http;

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    /// Maximum tokens generated
    pub max_tokens: u32,
    /// Sampling temperature (0.0-1.0)
    pub temperature: f64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.4,
        }
    }
}

impl ChatOptions {
    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }
}

/// Language model capability.
///
/// Callers pass only scrubbed text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` under `system` and return the assistant's text.
    async fn chat(&self, system: &str, messages: &[ChatMessage], options: &ChatOptions) -> ClientResult<String>;
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    /// Full chat completions URL (e.g. https://api.openai.com/v1/chat/completions)
    pub endpoint: String,
    /// Bearer token; empty for unauthenticated local servers
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Chat client for any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiChatClient {
    config: OpenAiChatConfig,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(config: OpenAiChatConfig) -> ClientResult<Self> {
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn request_body(&self, system: &str, messages: &[ChatMessage], options: &ChatOptions) -> Value {
        let mut turns = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            turns.push(json!({"role": Role::System.as_str(), "content": system}));
        }
        turns.extend(
            messages
                .iter()
                .map(|m| json!({"role": m.role.as_str(), "content": m.content})),
        );

        json!({
            "model": self.config.model,
            "messages": turns,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn chat(&self, system: &str, messages: &[ChatMessage], options: &ChatOptions) -> ClientResult<String> {
        let body = self.request_body(system, messages, options);

        debug!(
            model = %self.config.model,
            turns = messages.len(),
            temperature = options.temperature,
            "sending chat request"
        );

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
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
        let content = payload["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| ClientError::InvalidResponse("missing choices[0].message.content".into()))?;

        Ok(content.trim().to_string())
    }
}
