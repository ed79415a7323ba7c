//! Tool call / tool result pair exchanged between the orchestrator and the
//! tool registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request from the reasoning engine to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id issued by the reasoning engine. Results are keyed on it.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// JSON object of arguments, validated against the tool's input schema.
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome category of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Sent,
    Listed,
    Searched,
    Fetched,
    Error,
}

/// Structured result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ToolResult {
    /// A successful result. Non-object `details` are wrapped as `{"value": ..}`.
    pub fn success(status: ToolStatus, message: impl Into<String>, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    /// An error result reported back to the reasoning engine.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    /// Details may only be empty when the status is `error`.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !self.is_error() && self.details.is_empty() {
            return Err(format!(
                "details must not be empty for status '{}'",
                serde_json::to_value(self.status)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default()
            ));
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "message": self.message,
            "details": self.details,
        })
    }
}
