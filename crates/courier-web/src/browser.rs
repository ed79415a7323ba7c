//! Rendered page fetch through a headless browser.
//!
//! [`DynamicFetcher`] drives a [`BrowserLauncher`]: each fetch launches a
//! fresh, isolated session, navigates, waits for the document body, reads its
//! visible text, and closes the session. The session is closed on every exit
//! path, including timeout.
//!
//! [`ChromiumLauncher`] is the Chrome DevTools Protocol implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use courier_types::CourierError;
use courier_types::config::WebConfig;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::policy::UrlPolicy;

/// Selector that marks a page as ready for extraction.
pub const READY_SELECTOR: &str = "body";

/// Time past the fetch deadline that closing a session may still take.
/// A session cut off here is dropped, which kills the browser process.
pub const CLOSE_SLACK: Duration = Duration::from_millis(500);

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, String>;
}

/// One open browser session.
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), String>;

    /// Resolve once `selector` matches an element. May wait indefinitely;
    /// callers bound it.
    async fn wait_for(&mut self, selector: &str) -> Result<(), String>;

    /// Rendered text of the first element matching `selector`.
    async fn inner_text(&mut self, selector: &str) -> Result<String, String>;

    /// Release the session and everything it holds.
    async fn close(self: Box<Self>);
}

/// Fetches pages through a browser so client-side content is rendered.
#[derive(Clone)]
pub struct DynamicFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    policy: UrlPolicy,
}

impl DynamicFetcher {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, policy: UrlPolicy) -> Self {
        Self { launcher, policy }
    }

    /// Render `url` and return the visible text of its body.
    ///
    /// Launch, navigation, readiness, and extraction together must finish
    /// within `timeout`; closing the session gets whatever is left of it
    /// plus [`CLOSE_SLACK`].
    pub async fn fetch_dynamic(&self, url: &str, timeout: Duration) -> Result<String, CourierError> {
        let fail = |cause: String| {
            warn!(url, %cause, "dynamic fetch failed");
            CourierError::FetchFailed {
                url: url.to_string(),
                cause,
            }
        };
        let timed_out = || fail(format!("timed out after {}s", timeout.as_secs()));

        let parsed = self.policy.check(url).map_err(fail)?;
        let deadline = tokio::time::Instant::now() + timeout;

        let mut session = match tokio::time::timeout_at(deadline, self.launcher.launch()).await {
            Ok(Ok(session)) => session,
            Ok(Err(cause)) => return Err(fail(format!("browser launch failed: {cause}"))),
            Err(_) => return Err(timed_out()),
        };

        let rendered = tokio::time::timeout_at(deadline, render(session.as_mut(), parsed.as_str())).await;

        let close_by = deadline.max(tokio::time::Instant::now()) + CLOSE_SLACK;
        if tokio::time::timeout_at(close_by, session.close()).await.is_err() {
            warn!(url, "browser session did not close in time; dropping it");
        }

        match rendered {
            Ok(Ok(text)) => {
                debug!(url, chars = text.len(), "page rendered");
                Ok(text)
            }
            Ok(Err(cause)) => Err(fail(cause)),
            Err(_) => Err(timed_out()),
        }
    }
}

async fn render(session: &mut dyn RenderSession, url: &str) -> Result<String, String> {
    session.navigate(url).await?;
    session.wait_for(READY_SELECTOR).await?;
    let text = session.inner_text(READY_SELECTOR).await?;
    Ok(text.trim().to_string())
}

impl std::fmt::Debug for DynamicFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicFetcher")
            .field("policy", &self.policy)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Chromium
// ---------------------------------------------------------------------------

/// Launches headless Chrome/Chromium with a throwaway profile per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    /// Browser executable; chromiumoxide auto-detects when `None`.
    pub executable: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl ChromiumLauncher {
    pub fn from_config(cfg: &WebConfig) -> Self {
        Self {
            executable: cfg.chrome_path.clone(),
            user_agent: Some(cfg.user_agent.clone()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, String> {
        let profile = tempfile::Builder::new()
            .prefix("courier-browser-")
            .tempdir()
            .map_err(|e| format!("creating profile dir: {e}"))?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .user_data_dir(profile.path());
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        let config = builder.build()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("{e}"))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(profile = %profile.path().display(), "browser launched");
        Ok(Box::new(ChromiumSession {
            browser,
            events,
            page: None,
            _profile: profile,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    events: JoinHandle<()>,
    page: Option<Page>,
    // Dropped after the browser exits, removing the profile.
    _profile: tempfile::TempDir,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, String> {
        self.page.as_ref().ok_or_else(|| "no page open".to_string())
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), String> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| format!("navigation failed: {e}"))?;
        self.page = Some(page);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<(), String> {
        let page = self.page()?;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn inner_text(&mut self, selector: &str) -> Result<String, String> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| format!("element '{selector}' not found: {e}"))?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| format!("reading text: {e}"))?;
        Ok(text.unwrap_or_default())
    }

    async fn close(mut self: Box<Self>) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "browser close failed; killing process");
            if let Some(Err(e)) = self.browser.kill().await {
                warn!(error = %e, "failed to kill browser process");
            }
        }
        let _ = self.browser.wait().await;
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.events.abort();
    }
}
