//! CLI command implementations for `courier`.
//!
//! - [`agent`] -- Interactive session or single-message mode.
//! - [`auth`] -- Browser consent for the mail provider.
//! - [`status`] -- Configuration and credential diagnostics.

pub mod agent;
pub mod auth;
pub mod status;

use std::path::Path;

use anyhow::Context;

use courier_types::config::Config;
use courier_types::config::loader::load_config;

/// Load configuration from the given path override or via auto-discovery
/// (`COURIER_CONFIG`, then `~/.courier/config.json`, then defaults).
pub fn load(config_override: Option<&Path>) -> anyhow::Result<Config> {
    load_config(config_override).context("failed to load configuration")
}
