//! Application bootstrap and dependency wiring.
//!
//! Provides [`AppContext`], which builds every component from a [`Config`]
//! and the [`Secrets`] resolved from the environment, then hands out an
//! [`Orchestrator`] ready to answer requests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_core::bootstrap::{AppContext, Secrets};
//! use courier_types::config::loader::load_config;
//!
//! let config = load_config(None)?;
//! let secrets = Secrets::resolve(&config)?;
//! let ctx = AppContext::new(config, secrets)?;
//! let orchestrator = ctx.into_orchestrator();
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use courier_llm::{LlmProviderConfig, OpenAiCompatProvider};
use courier_mail::GmailProvider;
use courier_oauth2::CredentialStore;
use courier_types::config::Config;
use courier_types::{CourierError, SecretString};
use courier_web::SearchClient;

use crate::agent::{LlmReasoningEngine, Orchestrator, OrchestratorConfig};
use crate::tools::mail::MailDeps;
use crate::tools::register_builtin_tools;
use crate::tools::registry::ToolRegistry;

/// Secrets read from the environment at startup.
///
/// The config only names the variables; a missing one fails startup with
/// `ConfigInvalid` instead of surfacing on the first request.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub llm_api_key: SecretString,
    pub client_secret: SecretString,
    /// Present only when web search is enabled.
    pub search_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn resolve(config: &Config) -> Result<Self, CourierError> {
        let llm_api_key = require(&config.llm.api_key_env, "llm.api_key_env")?;
        let client_secret = require(
            &config.credentials.client_secret_env,
            "credentials.client_secret_env",
        )?;
        let search_api_key = if config.search.enabled {
            Some(require(&config.search.api_key_env, "search.api_key_env")?)
        } else {
            None
        };
        Ok(Self {
            llm_api_key,
            client_secret,
            search_api_key,
        })
    }
}

fn require(var: &str, field: &str) -> Result<SecretString, CourierError> {
    SecretString::from_env(var).ok_or_else(|| CourierError::ConfigInvalid {
        reason: format!("environment variable {var} (named by {field}) is not set"),
    })
}

/// Fully initialized application context.
pub struct AppContext {
    config: Config,
    credentials: Arc<CredentialStore>,
    tools: Arc<ToolRegistry>,
    orchestrator: Orchestrator,
}

impl AppContext {
    /// Validate the config and wire all components.
    ///
    /// Nothing touches the network here; the credential is loaded on the
    /// first mail call.
    pub fn new(config: Config, secrets: Secrets) -> Result<Self, CourierError> {
        info!("bootstrapping application context");
        config.validate()?;

        let credentials = Arc::new(CredentialStore::from_config(
            &config.credentials,
            secrets.client_secret,
        ));
        debug!(
            provider = credentials.provider(),
            consent = ?config.credentials.consent,
            "credential store created"
        );

        let mail = MailDeps {
            credentials: Arc::clone(&credentials),
            provider: Arc::new(GmailProvider::from_config(&config.mail)),
            default_max_results: config.mail.default_max_results,
        };
        let search = secrets
            .search_api_key
            .filter(|_| config.search.enabled)
            .map(|key| Arc::new(SearchClient::from_config(&config.search, key)));

        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, mail, &config.web, search);
        let tools = Arc::new(registry);

        let provider = Arc::new(OpenAiCompatProvider::with_api_key(
            LlmProviderConfig::from(&config.llm),
            secrets.llm_api_key,
        ));
        let engine = Arc::new(LlmReasoningEngine::from_config(provider, &config.llm));
        debug!(model = engine.model(), "reasoning engine created");

        let orchestrator = Orchestrator::new(
            engine,
            Arc::clone(&tools),
            OrchestratorConfig::from(&config.agent),
        );

        info!(tools = tools.len(), "bootstrap complete");
        Ok(Self {
            config,
            credentials,
            tools,
            orchestrator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The process-wide credential store shared by the mail tools.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn into_orchestrator(self) -> Orchestrator {
        self.orchestrator
    }
}
