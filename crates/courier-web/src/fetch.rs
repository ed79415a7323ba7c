//! Static page fetch: one GET, paragraph text extraction.

use std::time::Duration;

use courier_types::CourierError;
use courier_types::config::WebConfig;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::policy::UrlPolicy;

/// Fetches pages over plain HTTP and extracts their paragraph text.
///
/// No JavaScript runs; pages that build their content client-side yield
/// little or nothing. Use [`DynamicFetcher`](crate::DynamicFetcher) for those.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    http: reqwest::Client,
    policy: UrlPolicy,
}

impl StaticFetcher {
    pub fn new(policy: UrlPolicy, user_agent: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, policy }
    }

    pub fn from_config(cfg: &WebConfig) -> Self {
        Self::new(UrlPolicy::from_config(cfg), &cfg.user_agent)
    }

    /// GET `url` within `timeout` and return the text of its `<p>` elements,
    /// one per line in document order.
    ///
    /// A page without paragraph text is `Ok("")`, not an error.
    pub async fn fetch_static(&self, url: &str, timeout: Duration) -> Result<String, CourierError> {
        let fail = |cause: String| {
            warn!(url, %cause, "static fetch failed");
            CourierError::FetchFailed {
                url: url.to_string(),
                cause,
            }
        };

        let parsed = self.policy.check(url).map_err(fail)?;

        debug!(url, timeout_secs = timeout.as_secs(), "fetching page");
        let response = self
            .http
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fail(format!("timed out after {}s", timeout.as_secs()))
                } else {
                    fail(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| fail(format!("reading body: {e}")))?;

        let text = paragraph_text(&html);
        debug!(url, chars = text.len(), "page fetched");
        Ok(text)
    }
}

/// Trimmed text of every non-empty `<p>`, joined by newlines.
pub fn paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
