//! Tool registry and [`Tool`] trait definition.
//!
//! Defines the contract every tool satisfies ([`Tool`]) and a
//! [`ToolRegistry`] that dispatches [`ToolCall`]s by name. The registry owns
//! the schema contract: arguments are validated before a handler runs and
//! handler output is validated before it reaches the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use courier_types::CourierError;
use courier_types::tool::{ToolCall, ToolResult};

use super::schema;

/// Output schema shared by all tools: a [`ToolResult`] object.
pub fn result_schema() -> Value {
    result_schema_with_details(serde_json::json!({"type": "object"}))
}

/// [`result_schema`] with a narrower schema for `details`.
pub fn result_schema_with_details(details: Value) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "status": {"enum": ["sent", "listed", "searched", "fetched", "error"]},
            "message": {"type": "string"},
            "details": details
        },
        "required": ["status", "message", "details"]
    })
}

/// A tool that can be invoked by the orchestrator.
///
/// Implementations supply a name, description, input schema, output schema,
/// and an async handler. Handlers receive arguments that already satisfy
/// [`parameters`](Tool::parameters) and keep no state between calls.
///
/// ```rust,ignore
/// struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echo back the input" }
///     fn parameters(&self) -> Value {
///         json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
///     }
///     async fn execute(&self, args: Value) -> Result<Value, CourierError> {
///         Ok(ToolResult::success(ToolStatus::Fetched, "echoed", args).to_value())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, used in function calling.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;

    /// JSON Schema the handler's output must satisfy.
    fn output_schema(&self) -> Value {
        result_schema()
    }

    /// Run the tool. The returned value is decoded into a [`ToolResult`].
    async fn execute(&self, args: Value) -> Result<Value, CourierError>;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "registering tool");
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "replaced previously registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool schemas in OpenAI function calling format, sorted by name.
    pub fn schemas(&self) -> Vec<Value> {
        let mut schemas: Vec<(String, Value)> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                let schema = serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                });
                (name.clone(), schema)
            })
            .collect();

        schemas.sort_by(|a, b| a.0.cmp(&b.0));
        schemas.into_iter().map(|(_, v)| v).collect()
    }

    /// Validate and run one call.
    ///
    /// - unknown name: [`CourierError::ToolNotFound`]
    /// - arguments violate the input schema: [`CourierError::InvalidToolArguments`],
    ///   and the handler is not called
    /// - output violates the output schema or the [`ToolResult`] invariants:
    ///   [`CourierError::InvalidToolResult`]
    ///
    /// Handler errors are returned unchanged.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, CourierError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| CourierError::ToolNotFound {
                name: call.name.clone(),
            })?;

        schema::validate(&tool.parameters(), &call.arguments).map_err(|reason| {
            warn!(tool = %call.name, call_id = %call.id, %reason, "rejected tool arguments");
            CourierError::InvalidToolArguments {
                tool: call.name.clone(),
                reason,
            }
        })?;

        debug!(tool = %call.name, call_id = %call.id, "executing tool");
        let output = tool.execute(call.arguments.clone()).await?;

        let invalid = |reason: String| CourierError::InvalidToolResult {
            tool: call.name.clone(),
            reason,
        };
        schema::validate(&tool.output_schema(), &output).map_err(invalid)?;
        let result: ToolResult =
            serde_json::from_value(output).map_err(|e| invalid(e.to_string()))?;
        result.check_invariants().map_err(invalid)?;

        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
