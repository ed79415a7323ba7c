//! Web tools: `web_search`, `browse_website`, `browse_website_dynamic`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use courier_types::CourierError;
use courier_types::config::WebConfig;
use courier_types::tool::{ToolResult, ToolStatus};
use courier_web::search::format_hits;
use courier_web::{BrowserLauncher, DynamicFetcher, SearchClient, StaticFetcher, UrlPolicy};

use super::decode_args as decode;
use super::registry::{Tool, result_schema_with_details};

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

fn url_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {"type": "string", "minLength": 1, "description": "Absolute http(s) URL"}
        },
        "required": ["url"],
        "additionalProperties": false
    })
}

fn page_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {"type": "string"},
            "content": {"type": "string"}
        },
        "required": ["url", "content"]
    })
}

fn page_result(url: &str, content: String, rendered: bool) -> Value {
    let message = match (content.is_empty(), rendered) {
        (true, _) => format!("No readable content found at {url}"),
        (false, false) => format!("Content from {url}"),
        (false, true) => format!("Dynamic content from {url}"),
    };
    ToolResult::success(
        ToolStatus::Fetched,
        message,
        json!({"url": url, "content": content}),
    )
    .to_value()
}

// ---------------------------------------------------------------------------
// web_search
// ---------------------------------------------------------------------------

pub struct WebSearchTool {
    client: Arc<SearchClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<SearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for general queries. Returns snippets with their source URLs."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "minLength": 1, "description": "The search query"}
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(json!({
            "type": "object",
            "properties": {
                "results": {"type": "array"},
                "text": {"type": "string"}
            },
            "required": ["results", "text"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: QueryArgs = decode(self.name(), args)?;
        let hits = self.client.search(&args.query).await?;
        Ok(ToolResult::success(
            ToolStatus::Searched,
            format!("Found {} web results.", hits.len()),
            json!({"results": hits, "text": format_hits(&hits)}),
        )
        .to_value())
    }
}

// ---------------------------------------------------------------------------
// browse_website
// ---------------------------------------------------------------------------

/// Builds a fresh [`StaticFetcher`] for every call.
pub struct BrowseWebsiteTool {
    config: WebConfig,
}

impl BrowseWebsiteTool {
    pub fn new(config: WebConfig) -> Self {
        Self { config }
    }

    fn fetcher(&self) -> StaticFetcher {
        StaticFetcher::from_config(&self.config)
    }
}

#[async_trait]
impl Tool for BrowseWebsiteTool {
    fn name(&self) -> &str {
        "browse_website"
    }

    fn description(&self) -> &str {
        "Visit a URL and return the paragraph text of the page. Does not run JavaScript."
    }

    fn parameters(&self) -> Value {
        url_parameters()
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(page_details_schema())
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: UrlArgs = decode(self.name(), args)?;
        let timeout = Duration::from_secs(self.config.static_timeout_secs);
        let content = self.fetcher().fetch_static(&args.url, timeout).await?;
        Ok(page_result(&args.url, content, false))
    }
}

// ---------------------------------------------------------------------------
// browse_website_dynamic
// ---------------------------------------------------------------------------

/// Builds a fresh [`DynamicFetcher`] for every call; each fetch then runs in
/// its own browser session.
pub struct BrowseWebsiteDynamicTool {
    launcher: Arc<dyn BrowserLauncher>,
    policy: UrlPolicy,
    timeout: Duration,
}

impl BrowseWebsiteDynamicTool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &WebConfig) -> Self {
        Self {
            launcher,
            policy: UrlPolicy::from_config(config),
            timeout: Duration::from_secs(config.dynamic_timeout_secs),
        }
    }

    fn fetcher(&self) -> DynamicFetcher {
        DynamicFetcher::new(Arc::clone(&self.launcher), self.policy.clone())
    }
}

#[async_trait]
impl Tool for BrowseWebsiteDynamicTool {
    fn name(&self) -> &str {
        "browse_website_dynamic"
    }

    fn description(&self) -> &str {
        "Visit a URL in a headless browser and return the rendered page text. \
         Use for pages that need JavaScript."
    }

    fn parameters(&self) -> Value {
        url_parameters()
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(page_details_schema())
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: UrlArgs = decode(self.name(), args)?;
        let content = self.fetcher().fetch_dynamic(&args.url, self.timeout).await?;
        Ok(page_result(&args.url, content, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use courier_web::RenderSession;

    /// Counts sessions; every page renders `text`.
    #[derive(Default)]
    struct CountingLauncher {
        launched: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    struct Session {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserLauncher for CountingLauncher {
        async fn launch(&self) -> Result<Box<dyn RenderSession>, String> {
            self.launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Session {
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[async_trait]
    impl RenderSession for Session {
        async fn navigate(&mut self, _url: &str) -> Result<(), String> {
            Ok(())
        }
        async fn wait_for(&mut self, _selector: &str) -> Result<(), String> {
            Ok(())
        }
        async fn inner_text(&mut self, _selector: &str) -> Result<String, String> {
            Ok("Rendered".into())
        }
        async fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn page_result_messages() {
        let empty = page_result("https://a.example", String::new(), false);
        assert_eq!(empty["message"], "No readable content found at https://a.example");
        assert_eq!(empty["details"]["content"], "");

        let rendered = page_result("https://a.example", "hi".into(), true);
        assert_eq!(rendered["status"], "fetched");
        assert_eq!(rendered["message"], "Dynamic content from https://a.example");
    }

    #[tokio::test]
    async fn blocked_url_is_fetch_failed() {
        let tool = BrowseWebsiteTool::new(WebConfig::default());
        let err = tool
            .execute(json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::FetchFailed { .. }));
        assert!(err.is_tool_recoverable());
    }

    #[tokio::test]
    async fn each_dynamic_call_gets_its_own_session() {
        let launcher = Arc::new(CountingLauncher::default());
        let tool = BrowseWebsiteDynamicTool::new(launcher.clone(), &WebConfig::default());

        for _ in 0..2 {
            let out = tool
                .execute(json!({"url": "https://spa.example.com/"}))
                .await
                .unwrap();
            assert_eq!(out["details"]["content"], "Rendered");
        }
        assert_eq!(launcher.launched.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dynamic_tool_applies_configured_domains() {
        let launcher = Arc::new(CountingLauncher::default());
        let config = WebConfig {
            allowed_domains: vec!["docs.example.com".into()],
            ..WebConfig::default()
        };
        let tool = BrowseWebsiteDynamicTool::new(launcher.clone(), &config);

        let err = tool
            .execute(json!({"url": "https://other.example.org/"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::FetchFailed { .. }));
        assert_eq!(launcher.launched.load(Ordering::SeqCst), 0);
    }
}
