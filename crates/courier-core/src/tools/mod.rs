//! Tool contract, schema validation, and the built-in tools.

pub mod mail;
pub mod registry;
pub mod schema;
pub mod web;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use courier_types::CourierError;
use courier_types::config::WebConfig;
use courier_web::{ChromiumLauncher, SearchClient};

use self::mail::{ListEmailsTool, MailDeps, SearchEmailsTool, SendEmailTool};
use self::registry::ToolRegistry;
use self::web::{BrowseWebsiteDynamicTool, BrowseWebsiteTool, WebSearchTool};

/// Decode schema-checked arguments into a typed struct.
pub(crate) fn decode_args<T: for<'de> Deserialize<'de>>(
    tool: &str,
    args: Value,
) -> Result<T, CourierError> {
    serde_json::from_value(args).map_err(|e| CourierError::InvalidToolArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Register the mail and web tools.
///
/// Tools keep only configuration and shared handles; mail clients and web
/// fetchers are built per call. `web_search` is only registered when a
/// search client is supplied.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    mail: MailDeps,
    web: &WebConfig,
    search: Option<Arc<SearchClient>>,
) {
    registry.register(Arc::new(SendEmailTool::new(mail.clone())));
    registry.register(Arc::new(ListEmailsTool::new(mail.clone())));
    registry.register(Arc::new(SearchEmailsTool::new(mail)));

    registry.register(Arc::new(BrowseWebsiteTool::new(web.clone())));
    registry.register(Arc::new(BrowseWebsiteDynamicTool::new(
        Arc::new(ChromiumLauncher::from_config(web)),
        web,
    )));

    if let Some(client) = search {
        registry.register(Arc::new(WebSearchTool::new(client)));
    }

    info!(tools = ?registry.list(), "built-in tools registered");
}
