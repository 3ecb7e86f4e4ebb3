//! File inspection tools: read contents (whole or a line range) and
//! report metadata.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};

/// Read a file's contents, optionally restricted to a line range.
pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Optionally pass start_line and end_line (1-based, inclusive) to read a range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the workspace root" },
                "start_line": { "type": "integer", "description": "First line to include (1-based)" },
                "end_line": { "type": "integer", "description": "Last line to include (inclusive)" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = self.workspace.resolve(call.str_arg("path")?)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolResult::failure(&call.id, format!("Failed to read file: {e}"))),
        };

        let start = call.opt_u64_arg("start_line");
        let end = call.opt_u64_arg("end_line");
        if start.is_none() && end.is_none() {
            return Ok(ToolResult::ok(&call.id, content));
        }

        let start = start.unwrap_or(1).max(1) as usize;
        let total = content.lines().count();
        let end = end.unwrap_or(total as u64) as usize;
        if start > end {
            return Err(ToolError::InvalidArguments(format!(
                "start_line {start} is past end_line {end}"
            )));
        }

        let slice: Vec<String> = content
            .lines()
            .enumerate()
            .skip(start - 1)
            .take(end - start + 1)
            .map(|(i, line)| format!("{:>5} | {line}", i + 1))
            .collect();

        Ok(ToolResult::ok(&call.id, slice.join("\n")))
    }
}

/// Report a file's size, line count, and modification time.
pub struct FileInfoTool {
    workspace: Workspace,
}

impl FileInfoTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileInfoTool {
    fn name(&self) -> &str {
        "file_info"
    }

    fn description(&self) -> &str {
        "Get metadata about a file: size in bytes, line count, and whether it is a directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the workspace root" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = self.workspace.resolve(call.str_arg("path")?)?;

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => return Ok(ToolResult::failure(&call.id, format!("Failed to stat file: {e}"))),
        };

        if meta.is_dir() {
            return Ok(ToolResult::ok(
                &call.id,
                format!("{} is a directory", self.workspace.display_path(&path).display()),
            ));
        }

        let lines = tokio::fs::read_to_string(&path)
            .await
            .map(|c| c.lines().count())
            .unwrap_or(0);

        Ok(ToolResult::ok(
            &call.id,
            format!(
                "{}: {} bytes, {} lines",
                self.workspace.display_path(&path).display(),
                meta.len(),
                lines
            ),
        ))
    }
}
