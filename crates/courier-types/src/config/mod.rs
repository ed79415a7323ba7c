//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names and fill
//! missing fields with defaults, so an empty `{}` is a valid config. Secrets
//! never live here: the config names the environment variables that hold them.
//!
//! - [`loader`] -- config file discovery and key normalization

pub mod loader;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::conversation::AnswerFormat;
use crate::error::CourierError;
use crate::mail::MAX_RESULTS_LIMIT;

/// Scopes the mail adapter needs. A stored credential without both is unusable.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for courier.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    /// Reasoning engine (OpenAI-compatible chat completions).
    #[serde(default)]
    pub llm: LlmConfig,

    /// OAuth2 client and token storage for the mail provider.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub mail: MailConfig,

    /// Page fetching and rendering.
    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<(), CourierError> {
        let invalid = |reason: String| Err(CourierError::ConfigInvalid { reason });

        if self.agent.max_rounds == 0 {
            return invalid("agent.max_rounds must be at least 1".into());
        }
        if self.mail.default_max_results == 0 || self.mail.default_max_results > MAX_RESULTS_LIMIT {
            return invalid(format!(
                "mail.default_max_results must be between 1 and {MAX_RESULTS_LIMIT}"
            ));
        }
        if self.search.max_results == 0 {
            return invalid("search.max_results must be at least 1".into());
        }
        for (name, secs) in [
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("mail.timeout_secs", self.mail.timeout_secs),
            ("web.static_timeout_secs", self.web.static_timeout_secs),
            ("web.dynamic_timeout_secs", self.web.dynamic_timeout_secs),
        ] {
            if secs == 0 {
                return invalid(format!("{name} must be greater than zero"));
            }
        }
        if self.credentials.client_id.trim().is_empty() {
            return invalid("credentials.client_id is not set".into());
        }
        Ok(())
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

// ── Agent ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on reasoning rounds per request.
    #[serde(default = "default_max_rounds", alias = "maxRounds")]
    pub max_rounds: u32,

    /// Required shape of the final answer.
    #[serde(default, alias = "answerFormat")]
    pub answer_format: AnswerFormat,

    /// Replaces the built-in system instruction when set.
    #[serde(default, alias = "systemPrompt")]
    pub system_prompt: Option<String>,
}

fn default_max_rounds() -> u32 {
    8
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            answer_format: AnswerFormat::default(),
            system_prompt: None,
        }
    }
}

// ── LLM ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url", alias = "baseUrl")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_llm_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    #[serde(default = "default_llm_max_tokens", alias = "maxTokens")]
    pub max_tokens: i32,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,

    #[serde(default = "default_llm_timeout", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_max_tokens() -> i32 {
    1024
}
fn default_llm_temperature() -> f64 {
    0.2
}
fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// What the credential store does when no usable credential exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMode {
    /// Fail with `CredentialMissing`; run `courier auth` out of band.
    #[default]
    Disabled,
    /// Open the system browser and wait on a loopback redirect.
    Interactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Token file name stem and OAuth provider key.
    #[serde(default = "default_provider_name")]
    pub provider: String,

    /// Directory holding `<provider>.json`. Defaults to `~/.courier/tokens`.
    #[serde(default, alias = "tokenDir")]
    pub token_dir: Option<String>,

    #[serde(default, alias = "clientId")]
    pub client_id: String,

    /// Environment variable holding the OAuth client secret.
    #[serde(default = "default_client_secret_env", alias = "clientSecretEnv")]
    pub client_secret_env: String,

    #[serde(default = "default_auth_url", alias = "authUrl")]
    pub auth_url: String,

    #[serde(default = "default_token_url", alias = "tokenUrl")]
    pub token_url: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub consent: ConsentMode,

    /// Loopback port for the consent redirect; 0 picks a free port.
    #[serde(default, alias = "redirectPort")]
    pub redirect_port: u16,
}

fn default_provider_name() -> String {
    "google".into()
}
fn default_client_secret_env() -> String {
    "COURIER_GOOGLE_CLIENT_SECRET".into()
}
fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".into()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}
fn default_scopes() -> Vec<String> {
    vec![GMAIL_SEND_SCOPE.into(), GMAIL_READONLY_SCOPE.into()]
}

impl CredentialsConfig {
    pub fn token_dir(&self) -> PathBuf {
        match &self.token_dir {
            Some(dir) => expand_home(dir),
            None => expand_home("~/.courier/tokens"),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider_name(),
            token_dir: None,
            client_id: String::new(),
            client_secret_env: default_client_secret_env(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            consent: ConsentMode::default(),
            redirect_port: 0,
        }
    }
}

// ── Mail ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Gmail REST root for the authenticated user.
    #[serde(default = "default_mail_base_url", alias = "baseUrl")]
    pub base_url: String,

    #[serde(default = "default_mail_max_results", alias = "defaultMaxResults")]
    pub default_max_results: u32,

    #[serde(default = "default_mail_timeout", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_mail_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1/users/me".into()
}
fn default_mail_max_results() -> u32 {
    10
}
fn default_mail_timeout() -> u64 {
    30
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            base_url: default_mail_base_url(),
            default_max_results: default_mail_max_results(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

// ── Web ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_timeout", alias = "staticTimeoutSecs")]
    pub static_timeout_secs: u64,

    #[serde(default = "default_web_timeout", alias = "dynamicTimeoutSecs")]
    pub dynamic_timeout_secs: u64,

    /// Domains pages may be fetched from. Empty allows any public host.
    #[serde(default, alias = "allowedDomains")]
    pub allowed_domains: Vec<String>,

    #[serde(default = "default_user_agent", alias = "userAgent")]
    pub user_agent: String,

    /// Chrome/Chromium executable; auto-detected when unset.
    #[serde(default, alias = "chromePath")]
    pub chrome_path: Option<PathBuf>,
}

fn default_web_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("courier/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            static_timeout_secs: default_web_timeout(),
            dynamic_timeout_secs: default_web_timeout(),
            allowed_domains: Vec::new(),
            user_agent: default_user_agent(),
            chrome_path: None,
        }
    }
}

// ── Search ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Registers the `web_search` tool and requires its API key at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_search_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    #[serde(default = "default_search_max_results", alias = "maxResults")]
    pub max_results: u32,
}

fn default_true() -> bool {
    true
}
fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".into()
}
fn default_search_api_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_search_max_results() -> u32 {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
            max_results: default_search_max_results(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Config {
        let mut cfg = Config::default();
        cfg.credentials.client_id = "client-123.apps.googleusercontent.com".into();
        cfg
    }

    #[test]
    fn empty_object_yields_defaults() {
        let cfg: Config = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cfg.agent.max_rounds, 8);
        assert_eq!(cfg.agent.answer_format, AnswerFormat::Plain);
        assert_eq!(cfg.mail.default_max_results, 10);
        assert_eq!(cfg.search.max_results, 3);
        assert_eq!(cfg.credentials.consent, ConsentMode::Disabled);
        assert_eq!(cfg.credentials.scopes.len(), 2);
    }

    #[test]
    fn camel_case_aliases() {
        let cfg: Config = serde_json::from_value(json!({
            "agent": {"maxRounds": 3, "answerFormat": "sourced"},
            "credentials": {"clientId": "abc", "consent": "interactive", "redirectPort": 8085},
            "web": {"allowedDomains": ["example.com"]}
        }))
        .unwrap();
        assert_eq!(cfg.agent.max_rounds, 3);
        assert_eq!(cfg.agent.answer_format, AnswerFormat::Sourced);
        assert_eq!(cfg.credentials.client_id, "abc");
        assert_eq!(cfg.credentials.consent, ConsentMode::Interactive);
        assert_eq!(cfg.credentials.redirect_port, 8085);
        assert_eq!(cfg.web.allowed_domains, vec!["example.com"]);
    }

    #[test]
    fn validate_accepts_defaults_with_client_id() {
        valid().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_rounds() {
        let mut cfg = valid();
        cfg.agent.max_rounds = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }

    #[test]
    fn validate_rejects_out_of_range_mail_results() {
        let mut cfg = valid();
        cfg.mail.default_max_results = 501;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut cfg = valid();
        cfg.web.dynamic_timeout_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("web.dynamic_timeout_secs"));
    }

    #[test]
    fn validate_requires_client_id() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn token_dir_expands_home() {
        let cfg = CredentialsConfig {
            token_dir: Some("/tmp/courier-tokens".into()),
            ..Default::default()
        };
        assert_eq!(cfg.token_dir(), PathBuf::from("/tmp/courier-tokens"));
        assert!(CredentialsConfig::default().token_dir().ends_with(".courier/tokens"));
    }
}
