//! Connection settings for the reasoning engine endpoint.

use std::collections::HashMap;

use courier_types::config::LlmConfig;
use serde::{Deserialize, Serialize};

/// How to reach one OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider name used in logs.
    pub name: String,

    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds. Defaults to 60.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl From<&LlmConfig> for LlmProviderConfig {
    fn from(cfg: &LlmConfig) -> Self {
        Self {
            name: provider_name(&cfg.base_url),
            base_url: cfg.base_url.clone(),
            api_key_env: cfg.api_key_env.clone(),
            headers: HashMap::new(),
            timeout_secs: Some(cfg.timeout_secs),
        }
    }
}

/// Derive a short name from the endpoint host ("api.openai.com" -> "openai").
fn provider_name(base_url: &str) -> String {
    let host = base_url
        .split("://")
        .nth(1)
        .unwrap_or(base_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    let parts: Vec<&str> = host.split('.').collect();
    match parts.as_slice() {
        [.., name, _tld] => (*name).to_string(),
        [single] if !single.is_empty() => (*single).to_string(),
        _ => "llm".to_string(),
    }
}
