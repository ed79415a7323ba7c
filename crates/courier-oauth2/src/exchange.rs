//! Token endpoint client: authorization code exchange and refresh.

use std::time::Duration;

use courier_types::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::types::{AuthorizationGrant, Credential, OAuth2ProviderConfig};

const TOKEN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Posts `application/x-www-form-urlencoded` grants to the token URL.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl TokenEndpoint {
    pub fn new(config: &OAuth2ProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Exchange a consent grant for a fresh credential.
    ///
    /// `requested` fills the scope list when the server omits `scope`.
    pub async fn exchange_code(
        &self,
        grant: &AuthorizationGrant,
        provider: &str,
        requested: &[String],
    ) -> Result<Credential, String> {
        let body = self
            .post_form(&[
                ("grant_type", "authorization_code"),
                ("code", &grant.code),
                ("redirect_uri", &grant.redirect_uri),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose()),
                ("code_verifier", &grant.pkce_verifier),
            ])
            .await?;

        let access_token = body
            .access_token
            .ok_or_else(|| "no access_token in token response".to_string())?;

        debug!(provider, has_refresh_token = body.refresh_token.is_some(), "authorization code exchanged");

        Ok(Credential {
            access_token,
            refresh_token: body.refresh_token,
            token_type: body.token_type.unwrap_or_else(|| "Bearer".into()),
            expires_at: expires_at(chrono::Utc::now().timestamp(), body.expires_in),
            scopes: body
                .scope
                .map(|s| split_scopes(&s))
                .unwrap_or_else(|| requested.to_vec()),
            provider: provider.to_string(),
        })
    }

    /// Exchange `current.refresh_token` for a new access token.
    ///
    /// A rotated refresh token replaces the old one; otherwise the old one is kept.
    pub async fn refresh(&self, current: &Credential) -> Result<Credential, String> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| "credential has no refresh token".to_string())?;

        let body = self
            .post_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose()),
            ])
            .await?;

        let access_token = body
            .access_token
            .ok_or_else(|| "no access_token in refresh response".to_string())?;

        debug!(
            provider = %current.provider,
            rotated = body.refresh_token.is_some(),
            "access token refreshed"
        );

        Ok(Credential {
            access_token,
            refresh_token: body.refresh_token.or_else(|| current.refresh_token.clone()),
            token_type: body.token_type.unwrap_or_else(|| current.token_type.clone()),
            expires_at: expires_at(chrono::Utc::now().timestamp(), body.expires_in),
            scopes: body
                .scope
                .map(|s| split_scopes(&s))
                .unwrap_or_else(|| current.scopes.clone()),
            provider: current.provider.clone(),
        })
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token endpoint unreachable: {e}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("failed to read token response: {e}"))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(text);
            return Err(format!("token endpoint returned {status}: {detail}"));
        }

        serde_json::from_str(&text).map_err(|e| format!("failed to parse token response: {e}"))
    }
}

/// Absolute expiry from a relative `expires_in`, clamped at the `i64` range.
fn expires_at(now: i64, expires_in: Option<i64>) -> Option<i64> {
    expires_in.map(|secs| now.saturating_add(secs))
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}
