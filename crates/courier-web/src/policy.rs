//! Navigation policy shared by static and rendered fetches.

use courier_types::config::WebConfig;

/// Schemes that are never fetched, regardless of configuration.
pub const BLOCKED_SCHEMES: &[&str] = &["file", "data", "javascript"];

/// Which URLs the web adapter may load.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    /// Hosts (and their subdomains) pages may come from. Empty allows any host.
    pub allowed_domains: Vec<String>,
}

impl UrlPolicy {
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self { allowed_domains }
    }

    pub fn from_config(cfg: &WebConfig) -> Self {
        Self::new(cfg.allowed_domains.clone())
    }

    /// Parse `url` and check it against the policy.
    ///
    /// Returns the parsed URL, or a message describing the violation.
    pub fn check(&self, url: &str) -> Result<url::Url, String> {
        let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;

        let scheme = parsed.scheme().to_lowercase();
        if BLOCKED_SCHEMES.contains(&scheme.as_str()) {
            return Err(format!("blocked URL scheme: '{scheme}://'"));
        }
        if scheme != "http" && scheme != "https" {
            return Err(format!("unsupported URL scheme: '{scheme}://'"));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| "URL has no host".to_string())?
            .to_lowercase();

        if !self.allowed_domains.is_empty() {
            let allowed = self.allowed_domains.iter().any(|d| {
                let d = d.to_lowercase();
                host == d || host.ends_with(&format!(".{d}"))
            });
            if !allowed {
                return Err(format!("domain '{host}' not in allowed_domains"));
            }
        }

        Ok(parsed)
    }
}
