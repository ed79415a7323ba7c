//! OpenAI-compatible provider implementation.
//!
//! [`OpenAiCompatProvider`] works with any API that follows the OpenAI chat
//! completion format: OpenAI itself, Groq, DeepSeek, OpenRouter, local
//! servers such as Ollama, and others.

use std::time::Duration;

use async_trait::async_trait;
use courier_types::SecretString;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// An LLM provider that uses the OpenAI-compatible chat completion API.
pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: Option<SecretString>,
}

impl OpenAiCompatProvider {
    /// The API key is read from `config.api_key_env` on every request.
    pub fn new(config: LlmProviderConfig) -> Self {
        let http = build_client(&config);
        Self {
            config,
            http,
            api_key: None,
        }
    }

    /// Use an API key resolved at startup instead of the environment.
    pub fn with_api_key(config: LlmProviderConfig, api_key: impl Into<SecretString>) -> Self {
        let http = build_client(&config);
        Self {
            config,
            http,
            api_key: Some(api_key.into()),
        }
    }

    pub fn config(&self) -> &LlmProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn resolve_api_key(&self) -> Result<SecretString> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        SecretString::from_env(&self.config.api_key_env).ok_or_else(|| {
            ProviderError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }
}

fn build_client(config: &LlmProviderConfig) -> reqwest::Client {
    let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build configured http client, using defaults");
            reqwest::Client::new()
        })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.resolve_api_key()?;
        let url = self.completions_url();

        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose())
            .header("Content-Type", "application/json");

        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req.json(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(e)
            }
        })?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| (secs * 1000.0).max(0.0) as u64);
            let body = response.text().await.unwrap_or_default();
            let detail = extract_error_message(&body).unwrap_or(body);

            return Err(match status.as_u16() {
                429 => {
                    let retry_after_ms = retry_after.unwrap_or(1000);
                    warn!(provider = %self.config.name, retry_after_ms, "rate limited");
                    ProviderError::RateLimited { retry_after_ms }
                }
                401 | 403 => ProviderError::AuthFailed(detail),
                404 => ProviderError::ModelNotFound(format!("model '{}': {detail}", request.model)),
                _ => ProviderError::RequestFailed(format!("HTTP {status}: {detail}")),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        if chat_response.choices.is_empty() {
            return Err(ProviderError::InvalidResponse("response has no choices".into()));
        }

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            finish_reason = ?chat_response.choices[0].finish_reason,
            "chat completion response received"
        );

        Ok(chat_response)
    }
}

/// Pull `error.message` (OpenAI) or a bare `error` string out of an error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(String::from)
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}
