//! The credential lifecycle: obtain, persist, refresh.
//!
//! ```text
//! Absent --consent--> Valid --time--> Expired --refresh ok--> Valid
//!                                        \--refresh error--> Failed (terminal)
//! ```
//!
//! All transitions happen under one async mutex, so concurrent callers that
//! find an expired credential trigger a single token exchange and then share
//! its result. A failed refresh never touches the file on disk.

use std::sync::Arc;

use courier_types::CourierError;
use courier_types::config::{ConsentMode, CredentialsConfig};
use courier_types::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::consent::{ConsentFlow, LoopbackConsent};
use crate::exchange::TokenEndpoint;
use crate::token_store::TokenStore;
use crate::types::{Credential, CredentialStatus, OAuth2ProviderConfig};

#[derive(Debug)]
enum State {
    /// Nothing read from disk yet.
    Unloaded,
    Cached(Credential),
    Failed(String),
}

pub struct CredentialStore {
    config: OAuth2ProviderConfig,
    tokens: TokenStore,
    endpoint: TokenEndpoint,
    consent: Option<Arc<dyn ConsentFlow>>,
    state: Mutex<State>,
}

impl CredentialStore {
    /// A store with consent disabled.
    pub fn new(config: OAuth2ProviderConfig, tokens: TokenStore) -> Self {
        let endpoint = TokenEndpoint::new(&config);
        Self {
            config,
            tokens,
            endpoint,
            consent: None,
            state: Mutex::new(State::Unloaded),
        }
    }

    /// Enable interactive consent when no usable credential exists.
    pub fn with_consent(mut self, flow: Arc<dyn ConsentFlow>) -> Self {
        self.consent = Some(flow);
        self
    }

    /// Build from the `credentials` config section.
    pub fn from_config(cfg: &CredentialsConfig, client_secret: SecretString) -> Self {
        let store = Self::new(
            OAuth2ProviderConfig::from_config(cfg, client_secret),
            TokenStore::with_dir(cfg.token_dir()),
        );
        match cfg.consent {
            ConsentMode::Interactive => store.with_consent(Arc::new(LoopbackConsent::default())),
            ConsentMode::Disabled => store,
        }
    }

    pub fn provider(&self) -> &str {
        &self.config.name
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.config.scopes
    }

    /// Return a valid credential, refreshing or running consent as needed.
    pub async fn obtain(&self) -> Result<Credential, CourierError> {
        let mut state = self.state.lock().await;

        let current = match &*state {
            State::Failed(reason) => {
                return Err(CourierError::CredentialRefreshFailed {
                    reason: reason.clone(),
                });
            }
            State::Cached(c) => Some(c.clone()),
            State::Unloaded => self.load()?,
        };

        let credential = match current {
            None => self.consent_or_missing("no stored credential").await?,
            Some(c) if !c.has_scopes(&self.config.scopes) => {
                let reason = format!(
                    "stored credential lacks scopes: {}",
                    c.missing_scopes(&self.config.scopes).join(", ")
                );
                self.consent_or_missing(&reason).await?
            }
            Some(c) if c.is_expired() => {
                if c.refresh_token.is_some() {
                    self.refresh_locked(&c, &mut state).await?
                } else if self.consent.is_some() {
                    self.consent_or_missing("expired without refresh token").await?
                } else {
                    return Err(CourierError::CredentialRefreshFailed {
                        reason: "credential expired and has no refresh token".into(),
                    });
                }
            }
            Some(c) => c,
        };

        *state = State::Cached(credential.clone());
        Ok(credential)
    }

    /// Write `credential` to disk and make it the cached credential.
    pub async fn persist(&self, credential: &Credential) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        self.tokens.store(credential)?;
        *state = State::Cached(credential.clone());
        Ok(())
    }

    /// Exchange the refresh token for a new access token and persist it.
    ///
    /// On failure the store enters the terminal failed state.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, CourierError> {
        let mut state = self.state.lock().await;
        if let State::Failed(reason) = &*state {
            return Err(CourierError::CredentialRefreshFailed {
                reason: reason.clone(),
            });
        }
        let refreshed = self.refresh_locked(credential, &mut state).await?;
        *state = State::Cached(refreshed.clone());
        Ok(refreshed)
    }

    /// Run consent unconditionally (the `courier auth` command).
    pub async fn reauthorize(&self) -> Result<Credential, CourierError> {
        let mut state = self.state.lock().await;
        let flow = self.consent.clone().unwrap_or_else(|| Arc::new(LoopbackConsent::default()));
        let credential = self.run_consent(flow.as_ref()).await?;
        *state = State::Cached(credential.clone());
        Ok(credential)
    }

    /// Inspect the credential without refreshing or prompting.
    pub async fn status(&self) -> Result<CredentialStatus, CourierError> {
        let state = self.state.lock().await;
        let current = match &*state {
            State::Failed(reason) => {
                return Ok(CredentialStatus::Failed {
                    reason: reason.clone(),
                });
            }
            State::Cached(c) => Some(c.clone()),
            State::Unloaded => self.load()?,
        };
        Ok(match current {
            None => CredentialStatus::Absent,
            Some(c) if c.is_expired() => CredentialStatus::Expired {
                refreshable: c.refresh_token.is_some(),
            },
            Some(c) => CredentialStatus::Valid {
                expires_at: c.expires_at,
            },
        })
    }

    fn load(&self) -> Result<Option<Credential>, CourierError> {
        self.tokens
            .load(&self.config.name)
            .map_err(|e| CourierError::CredentialMissing {
                reason: format!(
                    "stored credential at {} is unreadable: {e}",
                    self.tokens.path_for(&self.config.name).display()
                ),
            })
    }

    async fn refresh_locked(
        &self,
        credential: &Credential,
        state: &mut State,
    ) -> Result<Credential, CourierError> {
        debug!(provider = %self.config.name, "refreshing expired credential");
        match self.endpoint.refresh(credential).await {
            Ok(refreshed) => {
                self.tokens.store(&refreshed)?;
                info!(provider = %self.config.name, expires_at = ?refreshed.expires_at, "credential refreshed");
                Ok(refreshed)
            }
            Err(reason) => {
                error!(provider = %self.config.name, %reason, "credential refresh failed");
                *state = State::Failed(reason.clone());
                Err(CourierError::CredentialRefreshFailed { reason })
            }
        }
    }

    async fn consent_or_missing(&self, reason: &str) -> Result<Credential, CourierError> {
        let Some(flow) = self.consent.clone() else {
            return Err(CourierError::CredentialMissing {
                reason: format!("{reason}; run `courier auth` to grant access"),
            });
        };
        warn!(provider = %self.config.name, reason, "starting interactive consent");
        self.run_consent(flow.as_ref()).await
    }

    async fn run_consent(&self, flow: &dyn ConsentFlow) -> Result<Credential, CourierError> {
        let grant = flow.authorize(&self.config).await?;
        let credential = self
            .endpoint
            .exchange_code(&grant, &self.config.name, &self.config.scopes)
            .await
            .map_err(|reason| CourierError::CredentialMissing {
                reason: format!("authorization code exchange failed: {reason}"),
            })?;

        if !credential.has_scopes(&self.config.scopes) {
            return Err(CourierError::CredentialMissing {
                reason: format!(
                    "consent did not grant scopes: {}",
                    credential.missing_scopes(&self.config.scopes).join(", ")
                ),
            });
        }

        self.tokens.store(&credential)?;
        info!(provider = %self.config.name, "consent completed, credential stored");
        Ok(credential)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("provider", &self.config.name)
            .field("token_dir", &self.tokens.dir())
            .field("consent", &self.consent.is_some())
            .finish()
    }
}
