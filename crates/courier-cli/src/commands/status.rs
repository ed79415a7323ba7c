//! `courier status` -- show configuration and credential status.
//!
//! Never refreshes a token or opens the browser.

use std::path::Path;

use chrono::{TimeZone, Utc};

use courier_oauth2::{CredentialStatus, CredentialStore};
use courier_types::SecretString;
use courier_types::config::loader::discover_config_path;

use super::load;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("courier status");
    println!("==============");
    println!();

    match config_path
        .map(Path::to_path_buf)
        .or_else(|| discover_config_path(dirs::home_dir()))
    {
        Some(path) => println!("Config: {}", path.display()),
        None => {
            println!("Config: not found");
            println!("  Searched: ~/.courier/config.json");
            println!("  Set COURIER_CONFIG to override");
        }
    }

    let config = match load(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("  Invalid: {e:#}");
            return Ok(());
        }
    };

    println!();
    println!("Reasoning engine:");
    println!("  Endpoint:    {}", config.llm.base_url);
    println!("  Model:       {}", config.llm.model);
    println!("  Max rounds:  {}", config.agent.max_rounds);
    println!("  API key:     {}", env_state(&config.llm.api_key_env));

    println!();
    println!("Web:");
    println!(
        "  Timeouts:    static {}s, dynamic {}s",
        config.web.static_timeout_secs, config.web.dynamic_timeout_secs
    );
    if config.web.allowed_domains.is_empty() {
        println!("  Domains:     any");
    } else {
        println!("  Domains:     {}", config.web.allowed_domains.join(", "));
    }
    if config.search.enabled {
        println!("  Search key:  {}", env_state(&config.search.api_key_env));
    } else {
        println!("  Search:      disabled");
    }

    let creds = &config.credentials;
    println!();
    println!("Mailbox ({}):", creds.provider);
    println!("  Token dir:   {}", creds.token_dir().display());
    println!("  Consent:     {:?}", creds.consent);
    println!("  Secret:      {}", env_state(&creds.client_secret_env));

    let secret = SecretString::from_env(&creds.client_secret_env).unwrap_or_default();
    let store = CredentialStore::from_config(creds, secret);
    let line = match store.status().await {
        Ok(status) => describe(&status),
        Err(e) => format!("unreadable ({e})"),
    };
    println!("  Credential:  {line}");

    Ok(())
}

fn env_state(var: &str) -> String {
    match SecretString::from_env(var) {
        Some(_) => format!("{var} (set)"),
        None => format!("{var} (NOT SET)"),
    }
}

fn describe(status: &CredentialStatus) -> String {
    match status {
        CredentialStatus::Absent => "none (run `courier auth`)".into(),
        CredentialStatus::Valid { expires_at: None } => "valid".into(),
        CredentialStatus::Valid {
            expires_at: Some(ts),
        } => match Utc.timestamp_opt(*ts, 0).single() {
            Some(at) => format!("valid until {}", at.format("%Y-%m-%d %H:%M UTC")),
            None => "valid".into(),
        },
        CredentialStatus::Expired { refreshable: true } => {
            "expired (will refresh on next use)".into()
        }
        CredentialStatus::Expired { refreshable: false } => {
            "expired, no refresh token (run `courier auth`)".into()
        }
        CredentialStatus::Failed { reason } => format!("refresh failed: {reason}"),
    }
}
