//! Credential and provider types.

use std::fmt;

use courier_types::SecretString;
use courier_types::config::CredentialsConfig;
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a token is treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth2 client settings for the mail provider.
#[derive(Debug, Clone)]
pub struct OAuth2ProviderConfig {
    /// Provider name; also the token file stem.
    pub name: String,
    pub client_id: String,
    /// Resolved once at startup from the configured environment variable.
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    /// Scopes requested at consent; a stored credential must hold all of them.
    pub scopes: Vec<String>,
    /// Loopback port for the consent redirect; 0 picks a free port.
    pub redirect_port: u16,
}

impl OAuth2ProviderConfig {
    pub fn from_config(cfg: &CredentialsConfig, client_secret: SecretString) -> Self {
        Self {
            name: cfg.provider.clone(),
            client_id: cfg.client_id.clone(),
            client_secret,
            auth_url: cfg.auth_url.clone(),
            token_url: cfg.token_url.clone(),
            scopes: cfg.scopes.clone(),
            redirect_port: cfg.redirect_port,
        }
    }
}

/// Persisted OAuth2 token material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiration timestamp (Unix seconds). `None` means no expiry was reported.
    #[serde(default)]
    pub expires_at: Option<i64>,

    #[serde(default)]
    pub scopes: Vec<String>,

    pub provider: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Expired at `now`, counting the skew buffer.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now >= expires_at.saturating_sub(EXPIRY_SKEW_SECS))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Every required scope is granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }

    /// Scopes in `required` that this credential lacks.
    pub fn missing_scopes<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|s| !self.scopes.contains(s))
            .map(String::as_str)
            .collect()
    }

    /// Value for the HTTP `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("provider", &self.provider)
            .finish()
    }
}

/// What consent hands back: an authorization code plus the PKCE verifier
/// and redirect URI the token exchange must repeat.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    pub pkce_verifier: String,
    pub redirect_uri: String,
}

/// Observable lifecycle state of the stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Absent,
    Valid { expires_at: Option<i64> },
    Expired { refreshable: bool },
    /// A refresh failed earlier in this process.
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: Option<i64>) -> Credential {
        Credential {
            access_token: "ya29.secret".into(),
            refresh_token: Some("1//refresh".into()),
            token_type: "Bearer".into(),
            expires_at,
            scopes: vec!["a".into(), "b".into()],
            provider: "google".into(),
        }
    }

    #[test]
    fn expiry_uses_skew_buffer() {
        let c = credential(Some(1_000));
        assert!(!c.is_expired_at(1_000 - EXPIRY_SKEW_SECS - 1));
        assert!(c.is_expired_at(1_000 - EXPIRY_SKEW_SECS));
        assert!(c.is_expired_at(2_000));
    }

    #[test]
    fn extreme_expiry_does_not_overflow() {
        let c = credential(Some(i64::MIN));
        assert!(c.is_expired_at(i64::MIN));
        assert!(c.is_expired_at(0));
        assert!(!credential(Some(i64::MAX)).is_expired_at(i64::MAX - EXPIRY_SKEW_SECS - 1));
    }

    #[test]
    fn no_expiry_is_never_expired() {
        assert!(!credential(None).is_expired_at(i64::MAX));
    }

    #[test]
    fn scope_superset() {
        let c = credential(None);
        assert!(c.has_scopes(&["a".into()]));
        assert!(c.has_scopes(&["a".into(), "b".into()]));
        assert!(!c.has_scopes(&["a".into(), "c".into()]));
        assert_eq!(c.missing_scopes(&["c".into(), "a".into()]), vec!["c"]);
    }

    #[test]
    fn debug_redacts_tokens() {
        let dbg = format!("{:?}", credential(None));
        assert!(!dbg.contains("ya29.secret"));
        assert!(!dbg.contains("1//refresh"));
    }

    #[test]
    fn authorization_header_uses_token_type() {
        assert_eq!(credential(None).authorization_header(), "Bearer ya29.secret");
    }

    #[test]
    fn deserialize_fills_defaults() {
        let c: Credential =
            serde_json::from_str(r#"{"access_token": "t", "provider": "google"}"#).unwrap();
        assert_eq!(c.token_type, "Bearer");
        assert!(c.refresh_token.is_none());
        assert!(c.scopes.is_empty());
    }
}
