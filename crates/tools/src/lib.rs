//! Workspace-confined tool catalog for Codewright.
//!
//! Every tool operates on a single [`Workspace`] root: file paths are
//! validated against it and shell commands run inside it. The
//! [`WorkspaceExecutor`] is the dispatch seam the agent loop calls
//! through — it never returns an error, only `ToolResult`s, so a tool
//! failure is always an observation the model can react to rather than
//! a crashed run.

pub mod analyze;
pub mod batch;
pub mod edit;
pub mod file_read;
pub mod file_write;
pub mod git;
pub mod patch;
pub mod path;
pub mod shell;
pub mod todo;

pub use path::Workspace;

use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolCatalog, ToolExecutor, ToolResult, ToolSpec};
use tracing::debug;

/// Shell commands the agent may run by default.
fn default_allowed_commands() -> Vec<String> {
    [
        "ls", "cat", "head", "tail", "echo", "pwd", "date", "wc", "grep", "find", "which",
        "diff", "tree", "mkdir", "touch", "cp", "mv", "git", "cargo", "rustc", "node", "npm",
        "npx", "python", "python3", "pip", "pytest", "go", "make", "sed", "awk",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Build the full built-in catalog over one workspace root.
pub fn default_catalog(workspace: Workspace) -> ToolCatalog {
    let mut catalog = ToolCatalog::new();

    catalog.register(Box::new(file_read::ReadFileTool::new(workspace.clone())));
    catalog.register(Box::new(file_read::FileInfoTool::new(workspace.clone())));
    catalog.register(Box::new(file_write::WriteFileTool::new(workspace.clone())));
    catalog.register(Box::new(file_write::ListFilesTool::new(workspace.clone())));
    catalog.register(Box::new(file_write::SearchFilesTool::new(workspace.clone())));
    catalog.register(Box::new(edit::SearchReplaceTool::new(workspace.clone())));
    catalog.register(Box::new(edit::InsertLinesTool::new(workspace.clone())));
    catalog.register(Box::new(edit::ReplaceLinesTool::new(workspace.clone())));
    catalog.register(Box::new(patch::ApplyPatchTool::new(workspace.clone())));
    catalog.register(Box::new(shell::RunCommandTool::new(
        workspace.clone(),
        default_allowed_commands(),
    )));
    catalog.register(Box::new(shell::RunTestsTool::new(workspace.clone())));
    catalog.register(Box::new(shell::LintTool::new(workspace.clone())));
    catalog.register(Box::new(shell::FormatCodeTool::new(workspace.clone())));
    catalog.register(Box::new(shell::CheckSyntaxTool::new(workspace.clone())));
    catalog.register(Box::new(analyze::ExtractFunctionTool::new(workspace.clone())));
    catalog.register(Box::new(analyze::CodeStructureTool::new(workspace.clone())));
    catalog.register(Box::new(analyze::DependenciesTool::new(workspace.clone())));
    catalog.register(Box::new(analyze::FindUsagesTool::new(workspace.clone())));
    catalog.register(Box::new(git::GitStatusTool::new(workspace.clone())));
    catalog.register(Box::new(git::GitDiffTool::new(workspace.clone())));
    catalog.register(Box::new(git::GitCommitTool::new(workspace.clone())));
    catalog.register(Box::new(git::GitBranchTool::new(workspace.clone())));
    catalog.register(Box::new(batch::BatchApplyTool::new(workspace)));
    catalog.register(Box::new(todo::TodoTool::new()));

    catalog
}

/// Executor over a [`ToolCatalog`].
///
/// Converts every tool-level error into a `success = false` result, so
/// the control loop always gets exactly one result per dispatched call.
pub struct WorkspaceExecutor {
    catalog: ToolCatalog,
}

impl WorkspaceExecutor {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    /// Executor with the full built-in catalog.
    pub fn with_defaults(workspace: Workspace) -> Self {
        Self::new(default_catalog(workspace))
    }
}

#[async_trait]
impl ToolExecutor for WorkspaceExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.catalog.get(&call.name) else {
            return ToolResult::failure(
                &call.id,
                format!(
                    "Unknown tool '{}'. Available tools: {}",
                    call.name,
                    self.catalog.names().join(", ")
                ),
            );
        };

        debug!(tool = %call.name, "dispatching tool call");
        match tool.execute(call).await {
            Ok(mut result) => {
                result.call_id = call.id.clone();
                result
            }
            Err(e) => ToolResult::failure(&call.id, e.to_string()),
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        self.catalog.specs()
    }

    fn is_mutating(&self, tool_name: &str) -> bool {
        self.catalog
            .get(tool_name)
            .map(|t| t.is_mutating())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> (tempfile::TempDir, WorkspaceExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, WorkspaceExecutor::with_defaults(ws))
    }

    #[tokio::test]
    async fn unknown_tool_is_failure_result_not_panic() {
        let (_dir, executor) = executor();
        let call = ToolCall::new("teleport", serde_json::json!({}));
        let result = executor.execute(&call).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Unknown tool"));
        assert!(result.error.as_deref().unwrap().contains("write_file"));
    }

    #[tokio::test]
    async fn tool_error_becomes_failure_result() {
        let (_dir, executor) = executor();
        let call = ToolCall::new("read_file", serde_json::json!({"path": "../../etc/passwd"}));
        let result = executor.execute(&call).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("workspace"));
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let (_dir, executor) = executor();
        let write = ToolCall::new(
            "write_file",
            serde_json::json!({"path": "notes.txt", "content": "hello"}),
        );
        assert!(executor.execute(&write).await.success);

        let read = ToolCall::new("read_file", serde_json::json!({"path": "notes.txt"}));
        let result = executor.execute(&read).await;
        assert!(result.success);
        assert_eq!(result.content, "hello");
    }

    #[test]
    fn catalog_covers_expected_tools() {
        let (_dir, executor) = executor();
        let names: Vec<String> = executor.catalog().iter().map(|s| s.name.clone()).collect();
        for expected in [
            "read_file",
            "write_file",
            "list_files",
            "search_files",
            "run_command",
            "apply_patch",
            "git_status",
            "todo",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn mutating_flags() {
        let (_dir, executor) = executor();
        assert!(executor.is_mutating("write_file"));
        assert!(executor.is_mutating("apply_patch"));
        assert!(!executor.is_mutating("read_file"));
        assert!(!executor.is_mutating("git_status"));
        assert!(!executor.is_mutating("no_such_tool"));
    }

    #[tokio::test]
    async fn result_call_id_matches_call() {
        let (_dir, executor) = executor();
        let call = ToolCall::new("list_files", serde_json::json!({}));
        let result = executor.execute(&call).await;
        assert_eq!(result.call_id, call.id);
    }
}
