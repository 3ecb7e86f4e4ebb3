//! OpenAI-compatible model client.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, LM Studio, and any
//! other endpoint exposing `/v1/chat/completions`. Transport failures
//! classify distinctly (wrong path, service down, bad hostname, slow
//! endpoint) so the run log tells the operator exactly what to fix.

use async_trait::async_trait;
use codewright_core::{
    Message, ModelClient, ModelError, ModelRequest, ModelResponse, Role, TokenUsage,
    ToolCallRequest, ToolSpec,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatClient {
    name: String,
    /// Full chat-completions URL, e.g. `http://localhost:11434/v1/chat/completions`.
    url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    native_tool_calls: bool,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, ModelError> {
        Self::with_timeout(url, api_key, 120)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            name: "openai-compat".into(),
            url: url.into(),
            api_key,
            timeout_secs,
            native_tool_calls: true,
            client,
        })
    }

    /// An Ollama client (convenience constructor).
    pub fn ollama(base: Option<&str>) -> Result<Self, ModelError> {
        let base = base.unwrap_or("http://localhost:11434").trim_end_matches('/');
        Self::new(format!("{base}/v1/chat/completions"), None)
    }

    /// Mark the backend as lacking structured tool calling. The agent
    /// will inject the catalog into the prompt and recover calls from
    /// free text instead.
    pub fn with_native_tool_calls(mut self, native: bool) -> Self {
        self.native_tool_calls = native;
        self
    }

    /// Classify a reqwest transport failure into a distinct error.
    fn classify_transport(&self, e: &reqwest::Error) -> ModelError {
        let host = e
            .url()
            .and_then(|u| u.host_str())
            .map(|h| {
                match e.url().and_then(|u| u.port()) {
                    Some(port) => format!("{h}:{port}"),
                    None => h.to_string(),
                }
            })
            .unwrap_or_else(|| self.url.clone());

        if e.is_timeout() {
            return ModelError::Timeout {
                timeout_secs: self.timeout_secs,
            };
        }
        if e.is_connect() {
            // reqwest does not expose the io::ErrorKind, so inspect the
            // rendered chain to separate DNS failures from refusals.
            let chain = format!("{e:?}").to_lowercase();
            if chain.contains("dns") || chain.contains("resolve") || chain.contains("lookup") {
                return ModelError::HostUnresolvable { host };
            }
            return ModelError::ConnectionRefused { host };
        }
        ModelError::Network(e.to_string())
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolSpec]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_tool_calls(&self) -> bool {
        self.native_tool_calls
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if self.native_tool_calls && !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(model = %request.model, url = %self.url, "sending completion request");

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify_transport(&e))?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            401 | 403 => {
                return Err(ModelError::AuthenticationFailed(
                    "Invalid API key or insufficient permissions".into(),
                ));
            }
            404 => {
                // A 404 is either a wrong URL path or an unknown model;
                // the body disambiguates.
                let body = response.text().await.unwrap_or_default();
                if body.to_lowercase().contains("model") {
                    return Err(ModelError::ModelNotFound(request.model));
                }
                return Err(ModelError::EndpointNotFound {
                    url: self.url.clone(),
                });
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status, body = %error_body, "model endpoint returned error");
                return Err(ModelError::ApiError {
                    status_code: status,
                    message: error_body,
                });
            }
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedResponse("No choices in response".into()))?;

        let tool_calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: if tc.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    tc.id
                },
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: api_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: api_response.model,
        })
    }
}

// --- OpenAI API wire types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    /// JSON-encoded argument object, per the wire format.
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
