//! Mail tools: `send_email`, `list_emails`, `search_emails`.
//!
//! Each invocation builds its own [`MailClient`] from the shared credential
//! store and provider, so concurrent conversations share no adapter state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use courier_mail::{MailClient, MailProvider};
use courier_oauth2::CredentialStore;
use courier_types::CourierError;
use courier_types::mail::{EmailMessage, MAX_RESULTS_LIMIT, MailOperation, MaxResults};
use courier_types::tool::{ToolResult, ToolStatus};

use super::decode_args as decode;
use super::registry::{Tool, result_schema_with_details};

/// What the mail tools need to build a client per call.
#[derive(Clone)]
pub struct MailDeps {
    pub credentials: Arc<CredentialStore>,
    pub provider: Arc<dyn MailProvider>,
    /// Used when the engine omits `max_results`.
    pub default_max_results: u32,
}

impl MailDeps {
    fn client(&self) -> MailClient {
        MailClient::new(Arc::clone(&self.credentials), Arc::clone(&self.provider))
    }

    fn max_results(&self, tool: &str, requested: Option<u32>) -> Result<MaxResults, CourierError> {
        MaxResults::new(requested.unwrap_or(self.default_max_results)).map_err(|e| {
            CourierError::InvalidToolArguments {
                tool: tool.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn max_results_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": MAX_RESULTS_LIMIT,
        "description": "Maximum number of emails to return (default: 10)"
    })
}

fn messages_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"messages": {"type": "array"}},
        "required": ["messages"]
    })
}

// ---------------------------------------------------------------------------
// send_email
// ---------------------------------------------------------------------------

pub struct SendEmailTool {
    deps: MailDeps,
}

impl SendEmailTool {
    pub fn new(deps: MailDeps) -> Self {
        Self { deps }
    }
}

#[derive(Deserialize)]
struct SendArgs {
    to: String,
    subject: String,
    body: String,
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send a plain-text email from the user's mailbox."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "string", "minLength": 3, "description": "Recipient email address"},
                "subject": {"type": "string", "description": "Subject line"},
                "body": {"type": "string", "description": "Plain-text message body"}
            },
            "required": ["to", "subject", "body"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "required": ["id"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: SendArgs = decode(self.name(), args)?;
        let message = EmailMessage::new(args.to, args.subject, args.body).map_err(|e| {
            CourierError::MailOperationFailed {
                operation: MailOperation::Send,
                cause: e.to_string(),
            }
        })?;

        let receipt = self.deps.client().send(message).await?;
        Ok(ToolResult::success(
            ToolStatus::Sent,
            "Email sent successfully.",
            serde_json::to_value(&receipt)?,
        )
        .to_value())
    }
}

// ---------------------------------------------------------------------------
// list_emails
// ---------------------------------------------------------------------------

pub struct ListEmailsTool {
    deps: MailDeps,
}

impl ListEmailsTool {
    pub fn new(deps: MailDeps) -> Self {
        Self { deps }
    }
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default)]
    max_results: Option<u32>,
}

#[async_trait]
impl Tool for ListEmailsTool {
    fn name(&self) -> &str {
        "list_emails"
    }

    fn description(&self) -> &str {
        "List the most recent emails in the user's mailbox (ids only)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"max_results": max_results_schema()},
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(messages_details_schema())
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: ListArgs = decode(self.name(), args)?;
        let max = self.deps.max_results(self.name(), args.max_results)?;

        let messages = self.deps.client().list(max).await?;
        info!(count = messages.len(), "list_emails tool complete");
        Ok(ToolResult::success(
            ToolStatus::Listed,
            format!("Retrieved {} emails.", messages.len()),
            json!({"messages": messages}),
        )
        .to_value())
    }
}

// ---------------------------------------------------------------------------
// search_emails
// ---------------------------------------------------------------------------

pub struct SearchEmailsTool {
    deps: MailDeps,
}

impl SearchEmailsTool {
    pub fn new(deps: MailDeps) -> Self {
        Self { deps }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
}

#[async_trait]
impl Tool for SearchEmailsTool {
    fn name(&self) -> &str {
        "search_emails"
    }

    fn description(&self) -> &str {
        "Search emails using Gmail search syntax (e.g. 'from:alice@example.com', \
         'subject:meeting') and return the matching messages in full."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "minLength": 1, "description": "Gmail search query"},
                "max_results": max_results_schema()
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        result_schema_with_details(messages_details_schema())
    }

    async fn execute(&self, args: Value) -> Result<Value, CourierError> {
        let args: SearchArgs = decode(self.name(), args)?;
        let max = self.deps.max_results(self.name(), args.max_results)?;

        let messages = self.deps.client().search(&args.query, max).await?;
        info!(query = %args.query, found_count = messages.len(), "search_emails tool complete");
        Ok(ToolResult::success(
            ToolStatus::Searched,
            format!("Found {} emails matching the search criteria.", messages.len()),
            json!({"messages": messages}),
        )
        .to_value())
    }
}
