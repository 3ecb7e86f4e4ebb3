//! End-to-end runs of the control loop against the real workspace
//! executor, with scripted model backends standing in for an endpoint.

use codewright_agent::controller::{AgentLoopController, StopReason};
use codewright_agent::subagent::{DelegateTool, SubagentRunner};
use codewright_agent::test_helpers::{ScriptedClient, text_response, tool_call_response};
use codewright_core::{ModelClient, ModelError, ModelRequest, ModelResponse, Role, ToolExecutor};
use codewright_providers::ManualToolCallClient;
use codewright_tools::{Workspace, WorkspaceExecutor};
use std::sync::Arc;

/// Hands a shared scripted backend to an owning wrapper so the test can
/// still inspect what was forwarded to it.
struct SharedScript(Arc<ScriptedClient>);

#[async_trait::async_trait]
impl ModelClient for SharedScript {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.0.complete(request).await
    }
}

fn workspace_executor() -> (tempfile::TempDir, Arc<WorkspaceExecutor>) {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    let executor = Arc::new(WorkspaceExecutor::with_defaults(workspace));
    (dir, executor)
}

#[tokio::test]
async fn structured_run_creates_the_requested_file() {
    let (dir, executor) = workspace_executor();
    let client = ScriptedClient::new(vec![
        tool_call_response(
            "call_1",
            "write_file",
            serde_json::json!({"path": "notes.txt", "content": "hello"}),
        ),
        text_response("Created notes.txt containing 'hello'."),
    ]);

    let controller = AgentLoopController::new(
        Arc::new(client),
        executor as Arc<dyn ToolExecutor>,
        "test-model",
    );
    let outcome = controller
        .run("create a file named notes.txt with content 'hello'")
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Completed);
    assert!(outcome.state.files_modified.contains("notes.txt"));
    let written = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
    assert_eq!(written, "hello");
}

#[tokio::test]
async fn free_text_run_recovers_the_write_and_creates_the_file() {
    let (dir, executor) = workspace_executor();
    // A backend with no structured calling emits a tagged block; the
    // recovery parser turns it into the same write_file call.
    let client = ScriptedClient::without_tool_calls(vec![
        text_response(
            "I'll create the file now.\n<tool_call>\n{\"name\": \"write_file\", \
             \"arguments\": {\"path\": \"notes.txt\", \"content\": \"hello\"}}\n</tool_call>",
        ),
        text_response("notes.txt is in place with the requested content."),
    ]);

    let controller = AgentLoopController::new(
        Arc::new(client),
        executor as Arc<dyn ToolExecutor>,
        "test-model",
    );
    let outcome = controller
        .run("create a file named notes.txt with content 'hello'")
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Completed);
    let written = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
    assert_eq!(written, "hello");
}

#[tokio::test]
async fn manual_backend_sees_the_catalog_in_its_prompt() {
    let (dir, executor) = workspace_executor();
    let scripted = Arc::new(ScriptedClient::new(vec![
        text_response(
            "<tool_call>\n{\"name\": \"write_file\", \"arguments\": \
             {\"path\": \"notes.txt\", \"content\": \"hello\"}}\n</tool_call>",
        ),
        text_response("notes.txt is written."),
    ]));
    let client = ManualToolCallClient::new(SharedScript(Arc::clone(&scripted)));

    let controller = AgentLoopController::new(
        Arc::new(client),
        executor as Arc<dyn ToolExecutor>,
        "test-model",
    );
    let outcome = controller
        .run("create a file named notes.txt with content 'hello'")
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Completed);
    assert!(dir.path().join("notes.txt").exists());

    // The backend received the catalog as prompt text with the call
    // convention, never as structured tools.
    let requests = scripted.seen_requests();
    assert!(requests[0].tools.is_empty());
    let system = &requests[0].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("<tool_call>"));
    assert!(system.content.contains("write_file"));
    assert!(system.content.contains("read_file"));
}

#[tokio::test]
async fn mutation_run_reads_then_edits() {
    let (dir, executor) = workspace_executor();
    std::fs::write(dir.path().join("greeting.txt"), "goodbye\n").unwrap();

    let client = ScriptedClient::new(vec![
        tool_call_response("c1", "read_file", serde_json::json!({"path": "greeting.txt"})),
        tool_call_response(
            "c2",
            "search_replace",
            serde_json::json!({"path": "greeting.txt", "search": "goodbye", "replace": "hello"}),
        ),
        text_response("Replaced the greeting."),
    ]);

    let controller = AgentLoopController::new(
        Arc::new(client),
        executor as Arc<dyn ToolExecutor>,
        "test-model",
    );
    let outcome = controller
        .run("update greeting.txt to say hello")
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Completed);
    assert!(outcome.state.files_read.contains("greeting.txt"));
    assert!(outcome.state.files_modified.contains("greeting.txt"));
    let content = std::fs::read_to_string(dir.path().join("greeting.txt")).unwrap();
    assert_eq!(content, "hello\n");
}

#[tokio::test]
async fn delegation_adds_one_observation_to_the_parent() {
    let (dir, executor) = workspace_executor();
    std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();

    // One shared script serves both parent and subagent: the parent
    // delegates, the subagent reads twice and writes once, then both
    // wrap up with text.
    let long_summary = format!("Subagent findings: {}", "detail ".repeat(600));
    let client: Arc<dyn ModelClient> = Arc::new(ScriptedClient::new(vec![
        tool_call_response(
            "p1",
            "delegate",
            serde_json::json!({"subagent": "general-purpose", "task": "annotate a.rs"}),
        ),
        tool_call_response("s1", "read_file", serde_json::json!({"path": "a.rs"})),
        tool_call_response("s2", "file_info", serde_json::json!({"path": "a.rs"})),
        tool_call_response(
            "s3",
            "write_file",
            serde_json::json!({"path": "a.rs", "content": "// entry\nfn main() {}\n"}),
        ),
        text_response(&long_summary),
        text_response("Delegated the annotation; the subagent handled it."),
    ]));

    let runner = Arc::new(SubagentRunner::new(
        Arc::clone(&client),
        Arc::clone(&executor) as Arc<dyn ToolExecutor>,
        "test-model",
    ));
    let workspace = Workspace::new(dir.path()).unwrap();
    let mut catalog = codewright_tools::default_catalog(workspace);
    catalog.register(Box::new(DelegateTool::new(Arc::clone(&runner))));
    let parent_executor = Arc::new(WorkspaceExecutor::new(catalog));

    let controller = AgentLoopController::new(
        client,
        parent_executor as Arc<dyn ToolExecutor>,
        "test-model",
    );
    let outcome = controller.run("get a.rs annotated").await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Completed);
    // the subagent ran three tool calls but the parent recorded one action
    assert_eq!(outcome.state.recent_actions.len(), 1);
    assert_eq!(outcome.state.steps.len(), 2);

    // and the observation the parent saw is the capped reply
    let observation = &outcome.state.steps[0].observation;
    assert!(observation.starts_with("Subagent findings:"));
    assert!(observation.chars().count() <= 2_000);
}
