//! ModelClient trait — the abstraction over LLM backends.
//!
//! A ModelClient knows how to send a message history (plus an optional
//! tool catalog) to a model and get back content and/or structured tool
//! calls. Backends that cannot do structured tool calling report it via
//! [`ModelClient::supports_tool_calls`]; the control loop then falls
//! back to free-text recovery through the protocol parser.

use crate::error::ModelError;
use crate::message::{Message, ToolCallRequest};
use crate::tool::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "gpt-4o", "qwen2.5-coder")
    pub model: String,

    /// The message history, system prompt first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool catalog the model may call. Empty when the backend does not
    /// support structured calling (the catalog is then described in the
    /// system prompt instead).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

fn default_temperature() -> f32 {
    0.2
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            tools: Vec::new(),
        }
    }
}

/// A complete response from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text content (may be empty when only tool calls)
    pub content: String,

    /// Structured tool calls, if the backend produced any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Which model actually responded
    pub model: String,
}

impl ModelResponse {
    /// Whether this response carries structured tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The model backend seam.
///
/// Every backend (OpenAI-compatible HTTP, catalog-injection wrapper,
/// scripted test client) implements this trait. The control loop calls
/// `complete()` without knowing which backend is in use.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Whether this backend produces structured tool calls when given a
    /// catalog. The catalog is sent either way; when false the backend
    /// is expected to surface it in the prompt itself and the control
    /// loop recovers calls from the reply text.
    fn supports_tool_calls(&self) -> bool {
        true
    }

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = ModelRequest::new("gpt-4o", vec![]);
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert!(req.tools.is_empty());
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn response_tool_call_detection() {
        let mut resp = ModelResponse {
            content: "thinking".into(),
            tool_calls: vec![],
            usage: None,
            model: "m".into(),
        };
        assert!(!resp.has_tool_calls());
        resp.tool_calls.push(ToolCallRequest {
            id: "c1".into(),
            name: "read_file".into(),
            arguments: "{}".into(),
        });
        assert!(resp.has_tool_calls());
    }
}
