//! Shell execution tools.
//!
//! `run_command` executes an allow-listed command in the workspace
//! root. The project-aware tools (`run_tests`, `lint`, `format_code`,
//! `check_syntax`) pick the right command for the project kind found
//! at the root, so the model does not have to know the build system.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default per-command timeout.
const COMMAND_TIMEOUT_SECS: u64 = 60;

/// Output is truncated past this size; the full output rarely helps
/// the model more than the head does.
const MAX_OUTPUT_CHARS: usize = 20_000;

pub(crate) async fn run_shell(
    tool_name: &str,
    command: &str,
    cwd: &std::path::Path,
    call_id: &str,
) -> Result<ToolResult, ToolError> {
    debug!(command, cwd = %cwd.display(), "executing shell command");

    let future = Command::new("sh").args(["-c", command]).current_dir(cwd).output();
    let output = match tokio::time::timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS), future).await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ToolError::ExecutionFailed {
                tool_name: tool_name.into(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(ToolError::Timeout {
                tool_name: tool_name.into(),
                timeout_secs: COMMAND_TIMEOUT_SECS,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    let mut text = if success {
        if stderr.is_empty() {
            stdout
        } else {
            format!("{stdout}\n[stderr]: {stderr}")
        }
    } else {
        let code = output.status.code().unwrap_or(-1);
        warn!(command, exit_code = code, "command failed");
        format!("[exit code: {code}]\n{stdout}\n{stderr}")
    };
    text = text.trim().to_string();
    if text.len() > MAX_OUTPUT_CHARS {
        text.truncate(MAX_OUTPUT_CHARS);
        text.push_str("\n... (output truncated)");
    }

    if success {
        Ok(ToolResult::ok(call_id, text))
    } else {
        Ok(ToolResult::failure(call_id, text))
    }
}

/// Execute an allow-listed shell command in the workspace.
pub struct RunCommandTool {
    workspace: Workspace,
    /// If non-empty, only commands whose first word is listed run.
    allowed_commands: Vec<String>,
}

impl RunCommandTool {
    pub fn new(workspace: Workspace, allowed_commands: Vec<String>) -> Self {
        Self {
            workspace,
            allowed_commands,
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }
        let base = command.split_whitespace().next().unwrap_or("");
        self.allowed_commands.iter().any(|a| a == base)
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the workspace root and return stdout/stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "The shell command to execute" }
            },
            "required": ["command"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let command = call.str_arg("command")?;
        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: "run_command".into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }
        run_shell("run_command", command, self.workspace.root(), &call.id).await
    }
}

/// The build system detected at the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Rust,
    Node,
    Python,
    Go,
    Unknown,
}

impl ProjectKind {
    /// Detect from the marker files present at `root`.
    pub fn detect(root: &std::path::Path) -> Self {
        if root.join("Cargo.toml").exists() {
            Self::Rust
        } else if root.join("package.json").exists() {
            Self::Node
        } else if root.join("pyproject.toml").exists() || root.join("setup.py").exists() {
            Self::Python
        } else if root.join("go.mod").exists() {
            Self::Go
        } else {
            Self::Unknown
        }
    }

    fn test_command(self) -> Option<&'static str> {
        match self {
            Self::Rust => Some("cargo test"),
            Self::Node => Some("npm test"),
            Self::Python => Some("python3 -m pytest"),
            Self::Go => Some("go test ./..."),
            Self::Unknown => None,
        }
    }

    fn lint_command(self) -> Option<&'static str> {
        match self {
            Self::Rust => Some("cargo clippy --no-deps"),
            Self::Node => Some("npx eslint ."),
            Self::Python => Some("python3 -m ruff check ."),
            Self::Go => Some("go vet ./..."),
            Self::Unknown => None,
        }
    }

    fn format_command(self) -> Option<&'static str> {
        match self {
            Self::Rust => Some("cargo fmt"),
            Self::Node => Some("npx prettier --write ."),
            Self::Python => Some("python3 -m ruff format ."),
            Self::Go => Some("gofmt -w ."),
            Self::Unknown => None,
        }
    }

    fn check_command(self) -> Option<&'static str> {
        match self {
            Self::Rust => Some("cargo check"),
            Self::Node => Some("npx tsc --noEmit"),
            Self::Python => Some("python3 -m compileall -q ."),
            Self::Go => Some("go build ./..."),
            Self::Unknown => None,
        }
    }
}

macro_rules! project_tool {
    ($tool:ident, $name:literal, $desc:literal, $select:ident, $mutating:literal) => {
        pub struct $tool {
            workspace: Workspace,
        }

        impl $tool {
            pub fn new(workspace: Workspace) -> Self {
                Self { workspace }
            }
        }

        #[async_trait]
        impl Tool for $tool {
            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn parameters_schema(&self) -> serde_json::Value {
                serde_json::json!({ "type": "object", "properties": {} })
            }

            fn is_mutating(&self) -> bool {
                $mutating
            }

            async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
                let kind = ProjectKind::detect(self.workspace.root());
                let Some(command) = kind.$select() else {
                    return Ok(ToolResult::failure(
                        &call.id,
                        "Could not detect the project's build system at the workspace root",
                    ));
                };
                run_shell($name, command, self.workspace.root(), &call.id).await
            }
        }
    };
}

project_tool!(
    RunTestsTool,
    "run_tests",
    "Run the project's test suite (detects cargo/npm/pytest/go).",
    test_command,
    false
);
project_tool!(
    LintTool,
    "lint",
    "Run the project's linter (detects clippy/eslint/ruff/go vet).",
    lint_command,
    false
);
project_tool!(
    FormatCodeTool,
    "format_code",
    "Run the project's code formatter in-place.",
    format_command,
    true
);
project_tool!(
    CheckSyntaxTool,
    "check_syntax",
    "Type-check / compile-check the project without producing artifacts.",
    check_command,
    false
);

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    #[test]
    fn allowlist_check() {
        let (_dir, ws) = setup();
        let tool = RunCommandTool::new(ws, vec!["ls".into(), "git".into()]);
        assert!(tool.is_command_allowed("ls -la"));
        assert!(tool.is_command_allowed("git status"));
        assert!(!tool.is_command_allowed("rm -rf /"));
        assert!(!tool.is_command_allowed("sudo anything"));
    }

    #[test]
    fn empty_allowlist_allows_all() {
        let (_dir, ws) = setup();
        let tool = RunCommandTool::new(ws, vec![]);
        assert!(tool.is_command_allowed("anything goes"));
    }

    #[tokio::test]
    async fn execute_echo() {
        let (_dir, ws) = setup();
        let tool = RunCommandTool::new(ws, vec![]);
        let call = ToolCall::new("run_command", serde_json::json!({"command": "echo hello"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.content.contains("hello"));
    }

    #[tokio::test]
    async fn failing_command_is_soft_failure() {
        let (_dir, ws) = setup();
        let tool = RunCommandTool::new(ws, vec![]);
        let call = ToolCall::new("run_command", serde_json::json!({"command": "false"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("exit code"));
    }

    #[tokio::test]
    async fn blocked_command_is_hard_error() {
        let (_dir, ws) = setup();
        let tool = RunCommandTool::new(ws, vec!["ls".into()]);
        let call = ToolCall::new("run_command", serde_json::json!({"command": "rm -rf /"}));
        assert!(matches!(
            tool.execute(&call).await,
            Err(ToolError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn command_runs_in_workspace_root() {
        let (dir, ws) = setup();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let tool = RunCommandTool::new(ws, vec![]);
        let call = ToolCall::new("run_command", serde_json::json!({"command": "ls"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.content.contains("marker.txt"));
    }

    #[test]
    fn project_kind_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Unknown);
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Node);
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        // Cargo.toml wins over package.json
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Rust);
    }

    #[tokio::test]
    async fn project_tool_on_unknown_kind_fails_softly() {
        let (_dir, ws) = setup();
        let tool = RunTestsTool::new(ws);
        let call = ToolCall::new("run_tests", serde_json::json!({}));
        let result = tool.execute(&call).await.unwrap();
        assert!(!result.success);
    }
}
