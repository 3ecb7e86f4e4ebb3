//! Git tools, shelling out to the `git` binary in the workspace root.

use crate::path::Workspace;
use crate::shell::run_shell;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};

/// Show the working tree status.
pub struct GitStatusTool {
    workspace: Workspace,
}

impl GitStatusTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Show the git working tree status (short format) and current branch."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        run_shell(
            "git_status",
            "git status --short --branch",
            self.workspace.root(),
            &call.id,
        )
        .await
    }
}

/// Show unstaged (or staged) changes.
pub struct GitDiffTool {
    workspace: Workspace,
}

impl GitDiffTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }

    fn description(&self) -> &str {
        "Show the current diff. Pass staged=true for the index diff, or path to limit to one file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "staged": { "type": "boolean", "description": "Diff the index instead of the working tree" },
                "path": { "type": "string", "description": "Limit the diff to this path" }
            }
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let mut command = String::from("git diff");
        if call.arguments["staged"].as_bool().unwrap_or(false) {
            command.push_str(" --cached");
        }
        if let Some(path) = call.opt_str_arg("path") {
            // Resolve to reject escapes, then pass the relative form.
            let resolved = self.workspace.resolve(path)?;
            command.push_str(" -- ");
            command.push_str(&self.workspace.display_path(&resolved).display().to_string());
        }
        run_shell("git_diff", &command, self.workspace.root(), &call.id).await
    }
}

/// Stage everything and commit.
pub struct GitCommitTool {
    workspace: Workspace,
}

impl GitCommitTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Stage all changes and create a commit with the given message."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "The commit message" }
            },
            "required": ["message"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let message = call.str_arg("message")?;
        if message.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Commit message is empty".into()));
        }
        // Single-quote the message; embedded quotes are escaped the
        // POSIX way.
        let quoted = format!("'{}'", message.replace('\'', r"'\''"));
        let command = format!("git add -A && git commit -m {quoted}");
        run_shell("git_commit", &command, self.workspace.root(), &call.id).await
    }
}

/// List branches or create/switch to one.
pub struct GitBranchTool {
    workspace: Workspace,
}

impl GitBranchTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GitBranchTool {
    fn name(&self) -> &str {
        "git_branch"
    }

    fn description(&self) -> &str {
        "List branches, or pass name to create-and-switch to that branch."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Branch to create or switch to (omit to list)" }
            }
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let command = match call.opt_str_arg("name") {
            Some(name) => {
                if !name
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
                {
                    return Err(ToolError::InvalidArguments(format!(
                        "Invalid branch name: {name}"
                    )));
                }
                format!("git switch -c {name} 2>/dev/null || git switch {name}")
            }
            None => "git branch --list".to_string(),
        };
        run_shell("git_branch", &command, self.workspace.root(), &call.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn git_workspace() -> Option<(tempfile::TempDir, Workspace)> {
        // Skip these tests on machines without git.
        if tokio::process::Command::new("git")
            .arg("--version")
            .output()
            .await
            .is_err()
        {
            return None;
        }
        let dir = tempfile::tempdir().unwrap();
        let init = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        assert!(init.success());
        for (key, value) in [("user.email", "t@example.com"), ("user.name", "t")] {
            std::process::Command::new("git")
                .args(["config", key, value])
                .current_dir(dir.path())
                .status()
                .unwrap();
        }
        let ws = Workspace::new(dir.path()).unwrap();
        Some((dir, ws))
    }

    #[tokio::test]
    async fn status_reports_untracked() {
        let Some((dir, ws)) = git_workspace().await else {
            return;
        };
        std::fs::write(dir.path().join("new.txt"), "x").unwrap();
        let tool = GitStatusTool::new(ws);
        let call = ToolCall::new("git_status", serde_json::json!({}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.content.contains("new.txt"));
    }

    #[tokio::test]
    async fn commit_then_clean_status() {
        let Some((dir, ws)) = git_workspace().await else {
            return;
        };
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let commit = GitCommitTool::new(ws.clone());
        let call = ToolCall::new("git_commit", serde_json::json!({"message": "add a.txt"}));
        let result = commit.execute(&call).await.unwrap();
        assert!(result.success, "{:?}", result.error);

        let status = GitStatusTool::new(ws);
        let call = ToolCall::new("git_status", serde_json::json!({}));
        let result = status.execute(&call).await.unwrap();
        assert!(!result.content.contains("a.txt"));
    }

    #[tokio::test]
    async fn empty_commit_message_rejected() {
        let Some((_dir, ws)) = git_workspace().await else {
            return;
        };
        let tool = GitCommitTool::new(ws);
        let call = ToolCall::new("git_commit", serde_json::json!({"message": "  "}));
        assert!(matches!(
            tool.execute(&call).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn hostile_branch_name_rejected() {
        let Some((_dir, ws)) = git_workspace().await else {
            return;
        };
        let tool = GitBranchTool::new(ws);
        let call = ToolCall::new(
            "git_branch",
            serde_json::json!({"name": "x; rm -rf /"}),
        );
        assert!(matches!(
            tool.execute(&call).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
