//! Web content adapter for courier.
//!
//! - [`StaticFetcher`]: plain HTTP GET, paragraph text extraction.
//! - [`DynamicFetcher`]: headless browser rendering through a
//!   [`BrowserLauncher`]; [`ChromiumLauncher`] speaks CDP via `chromiumoxide`.
//! - [`SearchClient`]: Tavily-compatible web search.
//!
//! All navigation is checked against a [`UrlPolicy`]: `file://`, `data:` and
//! `javascript:` URLs are always refused, and an optional domain allow-list
//! restricts hosts. Failures are reported as `FetchFailed` / `SearchFailed`;
//! nothing is retried.

pub mod browser;
pub mod fetch;
pub mod policy;
pub mod search;

pub use browser::{BrowserLauncher, ChromiumLauncher, DynamicFetcher, RenderSession};
pub use fetch::StaticFetcher;
pub use policy::UrlPolicy;
pub use search::{SearchClient, SearchHit};
