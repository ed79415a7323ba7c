//! Web search against a Tavily-compatible endpoint.

use std::time::Duration;

use courier_types::config::SearchConfig;
use courier_types::{CourierError, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    /// Snippet or extracted page content.
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Client for a Tavily-style `POST {endpoint}` search API.
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    max_results: u32,
}

impl SearchClient {
    pub fn new(endpoint: impl Into<String>, api_key: SecretString, max_results: u32) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            max_results,
        }
    }

    pub fn from_config(cfg: &SearchConfig, api_key: SecretString) -> Self {
        Self::new(cfg.endpoint.clone(), api_key, cfg.max_results)
    }

    /// Up to `max_results` hits for `query`, in provider ranking order.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CourierError> {
        let fail = |cause: String| {
            warn!(query, %cause, "web search failed");
            CourierError::SearchFailed {
                query: query.to_string(),
                cause,
            }
        };

        debug!(query, max_results = self.max_results, "web search");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&SearchRequest {
                api_key: self.api_key.expose(),
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("search API returned {status}: {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| fail(format!("unexpected response: {e}")))?;

        let mut hits = parsed.results;
        hits.truncate(self.max_results as usize);
        debug!(query, count = hits.len(), "web search complete");
        Ok(hits)
    }
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Render hits the way the model sees them: snippet then source, per hit.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("Snippet: {}\nSource: {}", h.content, h.url))
        .collect::<Vec<_>>()
        .join("\n")
}
