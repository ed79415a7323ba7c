//! Error types for courier.
//!
//! [`CourierError`] is shared by every crate in the workspace. Variants are
//! grouped by the component that raises them. [`CourierError::is_tool_recoverable`]
//! decides whether a failure inside a tool is reported back to the reasoning
//! engine or aborts the whole request.

use thiserror::Error;

use crate::mail::MailOperation;

/// Top-level error type for courier.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CourierError {
    // ── Credentials ──────────────────────────────────────────────────

    /// No usable credential exists and interactive consent is not available.
    #[error("credential missing: {reason}")]
    CredentialMissing {
        /// Why no credential could be produced.
        reason: String,
    },

    /// Refreshing an expired credential failed.
    #[error("credential refresh failed: {reason}")]
    CredentialRefreshFailed {
        /// Provider or transport failure description.
        reason: String,
    },

    // ── Adapters ─────────────────────────────────────────────────────

    /// A mail provider operation failed.
    #[error("mail {operation} failed: {cause}")]
    MailOperationFailed {
        /// Which mail operation failed.
        operation: MailOperation,
        /// Provider failure description.
        cause: String,
    },

    /// A web page could not be fetched or rendered.
    #[error("fetch failed for {url}: {cause}")]
    FetchFailed {
        /// The URL that was requested.
        url: String,
        /// Transport, status, or browser failure description.
        cause: String,
    },

    /// The web search provider failed.
    #[error("search failed for '{query}': {cause}")]
    SearchFailed {
        /// The query that was sent.
        query: String,
        /// Provider failure description.
        cause: String,
    },

    // ── Tools ────────────────────────────────────────────────────────

    /// Arguments did not match the tool's input schema.
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments {
        /// Tool name.
        tool: String,
        /// First schema violation found.
        reason: String,
    },

    /// A tool handler produced output that did not match its output schema.
    #[error("invalid result from tool '{tool}': {reason}")]
    InvalidToolResult {
        /// Tool name.
        tool: String,
        /// First schema violation found.
        reason: String,
    },

    /// The reasoning engine asked for a tool that is not registered.
    #[error("tool not found: {name}")]
    ToolNotFound {
        /// Requested tool name.
        name: String,
    },

    // ── Orchestration ────────────────────────────────────────────────

    /// The round bound was reached without a valid final answer.
    #[error("orchestration stalled after {rounds} rounds")]
    OrchestrationStalled {
        /// Number of rounds that were executed.
        rounds: u32,
    },

    /// The reasoning engine returned an error.
    #[error("reasoning engine error: {message}")]
    Provider {
        /// Provider-supplied error message.
        message: String,
    },

    // ── Fatal ────────────────────────────────────────────────────────

    /// Configuration is malformed or a required secret is missing.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CourierError {
    /// Whether a failure raised inside a tool should be turned into an
    /// error result for the reasoning engine instead of aborting the request.
    ///
    /// Credential, schema, and configuration failures always propagate.
    pub fn is_tool_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MailOperationFailed { .. }
                | Self::FetchFailed { .. }
                | Self::SearchFailed { .. }
                | Self::ToolNotFound { .. }
        )
    }

    /// Plain-language description suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialMissing { .. } => {
                "I don't have access to your mailbox yet. Run `courier auth` to grant access."
                    .into()
            }
            Self::CredentialRefreshFailed { .. } => {
                "Your mailbox access has expired and could not be renewed. Run `courier auth` again."
                    .into()
            }
            Self::MailOperationFailed { operation, .. } => {
                format!("The mail service could not {}. Please try again later.", operation.verb())
            }
            Self::FetchFailed { url, .. } => format!("I couldn't load {url}."),
            Self::SearchFailed { .. } => "The web search service is unavailable right now.".into(),
            Self::OrchestrationStalled { .. } => {
                "I couldn't finish that request. Try rephrasing it or splitting it into smaller steps."
                    .into()
            }
            Self::ConfigInvalid { reason } => format!("courier is misconfigured: {reason}"),
            other => format!("Error processing request: {other}"),
        }
    }
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CourierError>;
