//! Interactive consent: authorization code flow with PKCE over a loopback
//! redirect.
//!
//! [`LoopbackConsent`] binds `127.0.0.1:<port>`, opens the provider's consent
//! page in the system browser, and waits for the single redirect carrying
//! `code` and `state`. The `state` must match what was sent.

use std::time::Duration;

use async_trait::async_trait;
use courier_types::CourierError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::pkce;
use crate::types::{AuthorizationGrant, OAuth2ProviderConfig};

/// Obtains an authorization code from the user.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(
        &self,
        config: &OAuth2ProviderConfig,
    ) -> Result<AuthorizationGrant, CourierError>;
}

const MAX_REQUEST_BYTES: usize = 8 * 1024;

pub struct LoopbackConsent {
    timeout: Duration,
    open_browser: bool,
}

impl Default for LoopbackConsent {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            open_browser: true,
        }
    }
}

impl LoopbackConsent {
    pub fn new(timeout: Duration, open_browser: bool) -> Self {
        Self {
            timeout,
            open_browser,
        }
    }
}

fn consent_failed(reason: impl Into<String>) -> CourierError {
    CourierError::CredentialMissing {
        reason: format!("consent failed: {}", reason.into()),
    }
}

/// Build the provider consent URL.
///
/// `access_type=offline` and `prompt=consent` make Google issue a refresh token.
pub fn authorize_url(
    config: &OAuth2ProviderConfig,
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> Result<url::Url, CourierError> {
    let mut url = url::Url::parse(&config.auth_url)
        .map_err(|e| consent_failed(format!("invalid auth_url '{}': {e}", config.auth_url)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url)
}

#[async_trait]
impl ConsentFlow for LoopbackConsent {
    async fn authorize(
        &self,
        config: &OAuth2ProviderConfig,
    ) -> Result<AuthorizationGrant, CourierError> {
        let listener = TcpListener::bind(("127.0.0.1", config.redirect_port)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");

        let state = pkce::generate_state();
        let verifier = pkce::generate_verifier();
        let url = authorize_url(config, &redirect_uri, &state, &pkce::challenge_for(&verifier))?;

        info!(provider = %config.name, %url, "waiting for consent; open the URL if no browser appears");
        if self.open_browser
            && let Err(e) = open::that(url.as_str())
        {
            warn!(error = %e, "could not open system browser");
        }

        let callback = tokio::time::timeout(self.timeout, wait_for_callback(&listener))
            .await
            .map_err(|_| consent_failed(format!("no redirect within {}s", self.timeout.as_secs())))??;

        if callback.state != state {
            return Err(consent_failed("state parameter mismatch (possible CSRF)"));
        }

        Ok(AuthorizationGrant {
            code: callback.code,
            pkce_verifier: verifier,
            redirect_uri,
        })
    }
}

#[derive(Debug, PartialEq)]
struct Callback {
    code: String,
    state: String,
}

/// Accept connections until one hits `/callback`.
async fn wait_for_callback(listener: &TcpListener) -> Result<Callback, CourierError> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let target = match read_request_target(&mut stream).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "dropping malformed redirect request");
                continue;
            }
        };

        match parse_callback(&target) {
            None => respond(&mut stream, "404 Not Found", "Not found.").await,
            Some(Err(reason)) => {
                respond(&mut stream, "400 Bad Request", "Authorization was not granted. You can close this window.").await;
                return Err(consent_failed(reason));
            }
            Some(Ok(callback)) => {
                respond(&mut stream, "200 OK", "Access granted. You can close this window and return to courier.").await;
                return Ok(callback);
            }
        }
    }
}

async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target.to_string()),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unexpected request line: {request_line}"),
        )),
    }
}

/// `None` when the path is not `/callback`.
fn parse_callback(target: &str) -> Option<Result<Callback, String>> {
    let url = url::Url::parse(&format!("http://127.0.0.1{target}")).ok()?;
    if url.path() != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }

    Some(match (error, code, state) {
        (Some(error), _, _) => Err(format!("provider returned error '{error}'")),
        (None, Some(code), Some(state)) => Ok(Callback { code, state }),
        _ => Err("redirect is missing code or state".into()),
    })
}

async fn respond(stream: &mut TcpStream, status: &str, message: &str) {
    let body = format!("<!doctype html><html><body><p>{message}</p></body></html>");
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(error = %e, "failed to answer redirect request");
    }
    let _ = stream.shutdown().await;
}
