//! Scripted model backends for exercising the control loop without a
//! live endpoint. Used by this crate's tests and the integration suite.

use async_trait::async_trait;
use codewright_core::{
    Message, ModelClient, ModelError, ModelRequest, ModelResponse, ToolCall, ToolCallRequest,
    ToolExecutor, ToolResult, ToolSpec,
};
use std::sync::Mutex;

/// Plays back a fixed sequence of responses, one per `complete` call.
/// When the script runs out, it keeps repeating the last response so a
/// loop under test can overrun without panicking.
pub struct ScriptedClient {
    name: String,
    supports_tool_calls: bool,
    script: Mutex<Vec<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<ModelResponse>) -> Self {
        Self {
            name: "scripted".into(),
            supports_tool_calls: true,
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client that reports no structured tool calling, forcing the
    /// loop through the free-text recovery path.
    pub fn without_tool_calls(script: Vec<ModelResponse>) -> Self {
        let mut client = Self::new(script);
        client.supports_tool_calls = false;
        client
    }

    /// Requests the loop has sent so far.
    pub fn seen_requests(&self) -> Vec<ModelRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_tool_calls(&self) -> bool {
        self.supports_tool_calls
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let mut script = self
            .script
            .lock()
            .map_err(|_| ModelError::Network("scripted client poisoned".into()))?;
        if script.is_empty() {
            return Err(ModelError::Network("script exhausted".into()));
        }
        let response = if script.len() == 1 {
            script[0].clone()
        } else {
            script.remove(0)
        };
        Ok(response)
    }
}

/// A plain text response with no tool calls.
pub fn text_response(content: &str) -> ModelResponse {
    ModelResponse {
        content: content.into(),
        tool_calls: vec![],
        usage: None,
        model: "scripted".into(),
    }
}

/// A response requesting one structured tool call.
pub fn tool_call_response(
    id: &str,
    tool: &str,
    arguments: serde_json::Value,
) -> ModelResponse {
    ModelResponse {
        content: String::new(),
        tool_calls: vec![ToolCallRequest {
            id: id.into(),
            name: tool.into(),
            arguments: arguments.to_string(),
        }],
        usage: None,
        model: "scripted".into(),
    }
}

/// The system prompt the loop sent with a request, if any.
pub fn system_prompt_of(request: &ModelRequest) -> Option<&Message> {
    request
        .messages
        .first()
        .filter(|m| m.role == codewright_core::Role::System)
}

/// An executor that records every dispatched call and answers each one
/// with a canned success (or a canned failure).
pub struct StubExecutor {
    specs: Vec<ToolSpec>,
    calls: Mutex<Vec<ToolCall>>,
    fail_with: Option<String>,
    reply: String,
}

impl StubExecutor {
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        Self {
            specs,
            calls: Mutex::new(Vec::new()),
            fail_with: None,
            reply: "ok".into(),
        }
    }

    /// Every dispatched call fails with the given error text.
    pub fn failing(specs: Vec<ToolSpec>, error: &str) -> Self {
        let mut executor = Self::new(specs);
        executor.fail_with = Some(error.into());
        executor
    }

    /// Override the canned success content.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn seen_calls(&self) -> Vec<ToolCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ToolExecutor for StubExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        match &self.fail_with {
            Some(error) => ToolResult::failure(&call.id, error),
            None => ToolResult::ok(&call.id, &self.reply),
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        self.specs.clone()
    }
}

/// A minimal tool spec for stub catalogs.
pub fn stub_spec(name: &str, mutating: bool) -> ToolSpec {
    ToolSpec {
        name: name.into(),
        description: format!("the {name} tool"),
        parameters: serde_json::json!({"type": "object"}),
        mutating,
    }
}
