//! Manual tool-catalog injection for backends without structured
//! tool calling.
//!
//! Instead of a second control loop per calling convention, the
//! catalog is rendered into the system prompt and the backend is asked
//! to emit tagged tool-call blocks; the agent's free-text recovery
//! parser does the rest. Wrapping any [`ModelClient`] in
//! [`ManualToolCallClient`] makes this transparent to the loop.

use async_trait::async_trait;
use codewright_core::{Message, ModelClient, ModelError, ModelRequest, ModelResponse, Role, ToolSpec};

/// Render the tool catalog as prompt text, with the calling convention
/// the recovery parser's strictest tier understands.
pub fn render_catalog_prompt(tools: &[ToolSpec]) -> String {
    let mut out = String::from(
        "You have access to the following tools. To call one, emit a block of the form:\n\
         <tool_call>\n{\"name\": \"tool_name\", \"arguments\": {...}}\n</tool_call>\n\
         Emit one block per call and nothing else on those lines.\n\nAvailable tools:\n",
    );
    for tool in tools {
        out.push_str(&format!(
            "- {}: {}\n  parameters: {}\n",
            tool.name,
            tool.description,
            serde_json::to_string(&tool.parameters).unwrap_or_else(|_| "{}".into())
        ));
    }
    out
}

/// Wrapper that injects the catalog into the system prompt and strips
/// the structured `tools` field before forwarding.
pub struct ManualToolCallClient<C> {
    inner: C,
}

impl<C: ModelClient> ManualToolCallClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for ManualToolCallClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_tool_calls(&self) -> bool {
        false
    }

    async fn complete(&self, mut request: ModelRequest) -> Result<ModelResponse, ModelError> {
        if !request.tools.is_empty() {
            let catalog_text = render_catalog_prompt(&request.tools);
            request.tools.clear();

            match request.messages.first_mut() {
                Some(system) if system.role == Role::System => {
                    system.content = format!("{}\n\n{catalog_text}", system.content);
                }
                _ => {
                    request.messages.insert(0, Message::system(catalog_text));
                }
            }
        }

        self.inner.complete(request).await
    }
}
