//! Tool trait and executor seam — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! read and edit files, run shell commands, inspect git state.
//! The control loop never talks to a concrete tool; it dispatches
//! through a [`ToolExecutor`], whose contract is that **every dispatched
//! call yields exactly one [`ToolResult`]** — failures are results with
//! `success = false`, never propagated errors or panics.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call id when present)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value (string-keyed object)
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a call with a generated ID.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Fetch a required string argument.
    pub fn str_arg(&self, key: &str) -> std::result::Result<&str, ToolError> {
        self.arguments[key]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
    }

    /// Fetch an optional string argument.
    pub fn opt_str_arg(&self, key: &str) -> Option<&str> {
        self.arguments[key].as_str()
    }

    /// Fetch an optional integer argument.
    pub fn opt_u64_arg(&self, key: &str) -> Option<u64> {
        self.arguments[key].as_u64()
    }
}

/// The result of a tool execution.
///
/// Invariant: `error` is `Some` iff `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content (may be empty)
    pub content: String,

    /// Error text, present iff not success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// A successful result.
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            content: content.into(),
            error: None,
        }
    }

    /// A failed result.
    pub fn failure(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            content: String::new(),
            error: Some(error.into()),
        }
    }

    /// The text the control loop records as the observation.
    pub fn observation_text(&self) -> &str {
        match &self.error {
            Some(err) => err,
            None => &self.content,
        }
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,

    /// Whether this tool mutates workspace state. Read-only tools do
    /// not count toward task completion and feed stall detection.
    #[serde(default)]
    pub mutating: bool,
}

/// The core Tool trait.
///
/// Each tool (read_file, write_file, run_command, git_status, ...)
/// implements this trait. Tools are registered in the [`ToolCatalog`]
/// and dispatched by the executor.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "run_command", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether executing this tool can mutate workspace state.
    fn is_mutating(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolSpec for the catalog.
    fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            mutating: self.is_mutating(),
        }
    }
}

/// A registry of available tools — the tool catalog.
pub struct ToolCatalog {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Whether a name is in the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool specs (for sending to the model).
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.to_spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// The dispatch seam the control loop calls through.
///
/// `execute` is infallible by signature: implementations catch every
/// tool failure and wrap it as a `success = false` result. The control
/// loop decides what a failure means (observation, failure-cap tick,
/// soft-success), not the executor.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one tool call, returning exactly one result.
    async fn execute(&self, call: &ToolCall) -> ToolResult;

    /// The catalog of tools this executor can dispatch.
    fn catalog(&self) -> Vec<ToolSpec>;

    /// Whether the named tool mutates workspace state.
    fn is_mutating(&self, tool_name: &str) -> bool {
        self.catalog()
            .iter()
            .any(|spec| spec.name == tool_name && spec.mutating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
            let text = call.str_arg("text")?;
            Ok(ToolResult::ok(&call.id, text))
        }
    }

    #[test]
    fn catalog_register_and_lookup() {
        let mut catalog = ToolCatalog::new();
        catalog.register(Box::new(EchoTool));
        assert!(catalog.get("echo").is_some());
        assert!(catalog.get("nonexistent").is_none());
    }

    #[test]
    fn catalog_specs_sorted() {
        let mut catalog = ToolCatalog::new();
        catalog.register(Box::new(EchoTool));
        let specs = catalog.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert!(!specs[0].mutating);
    }

    #[tokio::test]
    async fn tool_execute() {
        let tool = EchoTool;
        let call = ToolCall::new("echo", serde_json::json!({"text": "hello world"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.content, "hello world");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn missing_argument_rejected() {
        let tool = EchoTool;
        let call = ToolCall::new("echo", serde_json::json!({}));
        let err = tool.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn failure_result_carries_error() {
        let result = ToolResult::failure("c1", "boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.observation_text(), "boom");
    }
}
