//! Subagent descriptors and delegation.
//!
//! A subagent is a nested run: same model client and tool executor as
//! the parent, but a fresh [`AgentState`], its own system prompt, and
//! optionally a narrower tool scope or a different model. The parent
//! sees exactly one thing from the whole delegation: the subagent's
//! final reply, capped at the configured length. Internal subagent
//! traffic never enters the parent's history.

use crate::controller::AgentLoopController;
use async_trait::async_trait;
use chrono::Utc;
use codewright_config::PolicyConfig;
use codewright_core::{
    AgentEvent, EventBus, ModelClient, RegistryError, Tool, ToolCall, ToolError, ToolExecutor,
    ToolResult, ToolSpec,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The always-present default delegate.
pub const GENERAL_PURPOSE: &str = "general-purpose";

/// A named subagent descriptor.
#[derive(Debug, Clone)]
pub struct SubagentSpec {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// Tool names this subagent may call. `None` means the full catalog.
    pub tool_scope: Option<Vec<String>>,
    /// Model override. `None` means the parent's model.
    pub model: Option<String>,
}

impl SubagentSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tool_scope: None,
            model: None,
        }
    }

    pub fn with_tool_scope(mut self, tools: Vec<String>) -> Self {
        self.tool_scope = Some(tools);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

fn general_purpose_spec() -> SubagentSpec {
    SubagentSpec::new(
        GENERAL_PURPOSE,
        "General-purpose delegate for self-contained subtasks",
        "You are a focused coding subagent. Complete the delegated subtask using the available \
         tools, then reply with a concise summary of what you did and found. Your reply is the \
         only thing the delegating agent will see.",
    )
}

/// Registry of available subagent descriptors. The general-purpose
/// entry is always present and cannot be overwritten.
pub struct SubagentRegistry {
    specs: HashMap<String, SubagentSpec>,
}

impl SubagentRegistry {
    pub fn new() -> Self {
        let mut specs = HashMap::new();
        let general = general_purpose_spec();
        specs.insert(general.name.clone(), general);
        Self { specs }
    }

    /// Register a descriptor. Existing names, including the reserved
    /// general-purpose entry, cannot be replaced.
    pub fn register(&mut self, spec: SubagentSpec) -> Result<(), RegistryError> {
        if self.specs.contains_key(&spec.name) {
            return Err(RegistryError::NameConflict(spec.name));
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&SubagentSpec, RegistryError> {
        self.specs
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSubagent(name.into()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.specs.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SubagentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Restricts an executor to a named subset of its catalog.
struct ScopedExecutor {
    inner: Arc<dyn ToolExecutor>,
    allowed: Vec<String>,
}

#[async_trait]
impl ToolExecutor for ScopedExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.allowed.iter().any(|name| name == &call.name) {
            return ToolResult::failure(
                &call.id,
                format!("Tool '{}' is not available to this subagent", call.name),
            );
        }
        self.inner.execute(call).await
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        self.inner
            .catalog()
            .into_iter()
            .filter(|spec| self.allowed.iter().any(|name| name == &spec.name))
            .collect()
    }
}

/// Runs delegated subtasks on behalf of a parent run.
pub struct SubagentRunner {
    client: Arc<dyn ModelClient>,
    executor: Arc<dyn ToolExecutor>,
    model: String,
    policy: PolicyConfig,
    events: Arc<EventBus>,
    registry: SubagentRegistry,
}

impl SubagentRunner {
    pub fn new(
        client: Arc<dyn ModelClient>,
        executor: Arc<dyn ToolExecutor>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            executor,
            model: model.into(),
            policy: PolicyConfig::default(),
            events: Arc::new(EventBus::default()),
            registry: SubagentRegistry::new(),
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &SubagentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SubagentRegistry {
        &mut self.registry
    }

    /// Run a delegated task under the named descriptor and return the
    /// subagent's final reply, capped at the configured length. Run
    /// failures come back as an error marker, never as `Err`: only an
    /// unknown descriptor name is the caller's mistake.
    pub async fn delegate(&self, name: &str, task: &str) -> Result<String, RegistryError> {
        let spec = self.registry.get(name)?;
        debug!(subagent = %spec.name, "delegating task");

        let executor: Arc<dyn ToolExecutor> = match &spec.tool_scope {
            Some(allowed) => Arc::new(ScopedExecutor {
                inner: Arc::clone(&self.executor),
                allowed: allowed.clone(),
            }),
            None => Arc::clone(&self.executor),
        };
        let model = spec.model.clone().unwrap_or_else(|| self.model.clone());

        let controller = AgentLoopController::new(Arc::clone(&self.client), executor, model)
            .with_system_prompt(spec.system_prompt.clone())
            .with_policy(self.policy.clone());

        let reply = match controller.run(task).await {
            Ok(outcome) => outcome.answer,
            Err(error) => format!("[subagent '{name}' failed: {error}]"),
        };
        let reply = cap_reply(reply, self.policy.subagent_reply_cap);

        self.events.publish(AgentEvent::SubagentFinished {
            name: name.into(),
            reply_chars: reply.chars().count(),
            timestamp: Utc::now(),
        });
        Ok(reply)
    }
}

/// The `delegate` tool: hands a subtask to a named subagent and
/// surfaces only its capped final reply. The parent's history grows by
/// exactly one tool result per delegation, no matter how many calls
/// the subagent made internally.
pub struct DelegateTool {
    runner: Arc<SubagentRunner>,
}

impl DelegateTool {
    pub fn new(runner: Arc<SubagentRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        "delegate"
    }

    fn description(&self) -> &str {
        "Delegate a self-contained subtask to a subagent and get back its final summary"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "subagent": {
                    "type": "string",
                    "description": "Name of the subagent to delegate to"
                },
                "task": {
                    "type": "string",
                    "description": "The subtask to complete"
                }
            },
            "required": ["task"]
        })
    }

    fn is_mutating(&self) -> bool {
        // the subagent may mutate the workspace on the parent's behalf
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let task = call.str_arg("task")?;
        let name = call.opt_str_arg("subagent").unwrap_or(GENERAL_PURPOSE);

        let reply = self.runner.delegate(name, task).await.map_err(|_| {
            ToolError::InvalidArguments(format!(
                "Unknown subagent '{name}'. Available: {}",
                self.runner.registry().names().join(", ")
            ))
        })?;
        Ok(ToolResult::ok(&call.id, reply))
    }
}

/// Truncate a reply to the cap, marking the cut.
fn cap_reply(reply: String, cap: usize) -> String {
    if reply.chars().count() <= cap {
        return reply;
    }
    let marker = " [truncated]";
    let keep = cap.saturating_sub(marker.len());
    let mut capped: String = reply.chars().take(keep).collect();
    capped.push_str(marker);
    capped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        ScriptedClient, StubExecutor, stub_spec, text_response, tool_call_response,
    };

    #[test]
    fn general_purpose_always_present() {
        let registry = SubagentRegistry::new();
        assert!(registry.get(GENERAL_PURPOSE).is_ok());
        assert_eq!(registry.names(), vec![GENERAL_PURPOSE]);
    }

    #[test]
    fn reserved_name_cannot_be_overwritten() {
        let mut registry = SubagentRegistry::new();
        let err = registry
            .register(SubagentSpec::new(GENERAL_PURPOSE, "mine", "prompt"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NameConflict(_)));
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = SubagentRegistry::new();
        registry
            .register(SubagentSpec::new("reviewer", "reviews code", "review"))
            .unwrap();
        let err = registry
            .register(SubagentSpec::new("reviewer", "again", "review"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NameConflict(_)));
    }

    #[test]
    fn unknown_name_rejected() {
        let registry = SubagentRegistry::new();
        assert!(matches!(
            registry.get("nonexistent"),
            Err(RegistryError::UnknownSubagent(_))
        ));
    }

    #[test]
    fn cap_reply_respects_limit() {
        let long = "x".repeat(5_000);
        let capped = cap_reply(long, 2_000);
        assert_eq!(capped.chars().count(), 2_000);
        assert!(capped.ends_with(" [truncated]"));

        let short = cap_reply("brief".into(), 2_000);
        assert_eq!(short, "brief");
    }

    #[tokio::test]
    async fn delegation_returns_capped_final_reply() {
        let long_answer = "finding ".repeat(1_000);
        let client = Arc::new(ScriptedClient::new(vec![
            tool_call_response("c1", "read_file", serde_json::json!({"path": "a.rs"})),
            text_response(&long_answer),
        ]));
        let executor = Arc::new(StubExecutor::new(vec![stub_spec("read_file", false)]));
        let runner = SubagentRunner::new(client, executor, "test-model");

        let reply = runner
            .delegate(GENERAL_PURPOSE, "inspect a.rs")
            .await
            .unwrap();
        assert!(reply.chars().count() <= 2_000);
        assert!(reply.starts_with("finding"));
    }

    #[tokio::test]
    async fn tool_scope_blocks_out_of_scope_calls() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_call_response(
                "c1",
                "write_file",
                serde_json::json!({"path": "a.rs", "content": "x"}),
            ),
            text_response("could not write, reporting back"),
        ]));
        let executor = Arc::new(StubExecutor::new(vec![
            stub_spec("read_file", false),
            stub_spec("write_file", true),
        ]));
        let mut runner =
            SubagentRunner::new(client, Arc::clone(&executor) as Arc<dyn ToolExecutor>, "m");
        runner
            .registry_mut()
            .register(
                SubagentSpec::new("reader", "read-only delegate", "only read")
                    .with_tool_scope(vec!["read_file".into()]),
            )
            .unwrap();

        runner.delegate("reader", "look at a.rs").await.unwrap();
        // the scoped wrapper rejected the call before dispatch
        assert!(executor.seen_calls().is_empty());
    }

    #[tokio::test]
    async fn run_failure_becomes_error_marker() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let executor = Arc::new(StubExecutor::new(vec![]));
        let runner = SubagentRunner::new(client, executor, "m");

        let reply = runner.delegate(GENERAL_PURPOSE, "anything").await.unwrap();
        assert!(reply.starts_with("[subagent 'general-purpose' failed:"));
    }
}
