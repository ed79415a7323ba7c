//! Configuration file discovery and loading.
//!
//! Discovery order:
//! 1. An explicit path (the CLI `--config` flag).
//! 2. `COURIER_CONFIG` environment variable.
//! 3. `~/.courier/config.json`
//! 4. Nothing found: defaults.
//!
//! JSON keys are normalized from camelCase to snake_case before
//! deserialization, so nested maps written by other tools still line up.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use super::Config;
use crate::error::CourierError;

/// Environment variable naming an absolute config path.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

/// Find the config file, or `None` when defaults should be used.
pub fn discover_config_path(home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV)
        && !env_path.trim().is_empty()
    {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".courier").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Load, normalize, deserialize, and validate the configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, CourierError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config_path(dirs::home_dir()),
    };

    let raw = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            let contents = fs::read_to_string(&path).map_err(|e| CourierError::ConfigInvalid {
                reason: format!("failed to read {}: {e}", path.display()),
            })?;
            let value: Value =
                serde_json::from_str(&contents).map_err(|e| CourierError::ConfigInvalid {
                    reason: format!("failed to parse {}: {e}", path.display()),
                })?;
            normalize_keys(value)
        }
        None => {
            info!("no config file found, using defaults");
            Value::Object(serde_json::Map::new())
        }
    };

    let config: Config = serde_json::from_value(raw).map_err(|e| CourierError::ConfigInvalid {
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Convert camelCase JSON keys to snake_case recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (camel_to_snake(&k), normalize_keys(v)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert one camelCase identifier to snake_case, keeping acronyms together
/// (`"HTMLParser"` becomes `"html_parser"`).
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_to_snake_cases() {
        assert_eq!(camel_to_snake("maxRounds"), "max_rounds");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("HTMLParser"), "html_parser");
        assert_eq!(camel_to_snake("oauth2ClientId"), "oauth2_client_id");
    }

    #[test]
    fn normalize_keys_recurses() {
        let v = normalize_keys(json!({
            "agent": {"maxRounds": 2},
            "web": {"allowedDomains": ["A.com"]}
        }));
        assert_eq!(v["agent"]["max_rounds"], 2);
        assert_eq!(v["web"]["allowed_domains"][0], "A.com");
    }

    #[test]
    fn env_var_takes_precedence() {
        temp_env::with_var(CONFIG_ENV, Some("/etc/courier.json"), || {
            let found = discover_config_path(Some(PathBuf::from("/nonexistent-home")));
            assert_eq!(found, Some(PathBuf::from("/etc/courier.json")));
        });
    }

    #[test]
    fn home_config_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(".courier");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.json"), "{}").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let found = discover_config_path(Some(home.path().to_path_buf()));
            assert_eq!(found, Some(dir.join("config.json")));
        });
    }

    #[test]
    fn missing_home_config_yields_none() {
        let home = tempfile::tempdir().unwrap();
        temp_env::with_var_unset(CONFIG_ENV, || {
            assert!(discover_config_path(Some(home.path().to_path_buf())).is_none());
        });
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"agent": {"maxRounds": 4}, "credentials": {"clientId": "cid"}}"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.agent.max_rounds, 4);
        assert_eq!(cfg.credentials.client_id, "cid");
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, CourierError::ConfigInvalid { .. }));
    }

    #[test]
    fn load_runs_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"credentials": {"clientId": "cid"}, "agent": {"maxRounds": 0}}"#)
            .unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }
}
