//! `courier auth` -- run the browser consent flow and store the credential.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use tracing::info;

use courier_oauth2::{CredentialStore, LoopbackConsent};
use courier_types::SecretString;

use super::load;

/// Arguments for the `courier auth` subcommand.
#[derive(Args)]
pub struct AuthArgs {
    /// Print the consent URL instead of opening the browser.
    #[arg(long)]
    pub no_browser: bool,

    /// Seconds to wait for the redirect.
    #[arg(long, default_value = "300")]
    pub timeout: u64,
}

pub async fn run(args: AuthArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let creds = &config.credentials;
    let client_secret = SecretString::from_env(&creds.client_secret_env)
        .with_context(|| format!("environment variable {} is not set", creds.client_secret_env))?;

    let consent = LoopbackConsent::new(Duration::from_secs(args.timeout), !args.no_browser);
    let store = CredentialStore::from_config(creds, client_secret).with_consent(Arc::new(consent));

    info!(provider = store.provider(), "starting consent flow");
    let credential = store.reauthorize().await?;

    println!("Authorized {} for:", store.provider());
    for scope in &credential.scopes {
        println!("  - {scope}");
    }
    println!("Token stored in {}", creds.token_dir().display());
    Ok(())
}
