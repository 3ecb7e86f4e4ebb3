//! Batch file application: write several files in one call.
//!
//! Saves a model round-trip per file when scaffolding a project. Paths
//! are all validated before anything is written.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};

pub struct BatchApplyTool {
    workspace: Workspace,
}

impl BatchApplyTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for BatchApplyTool {
    fn name(&self) -> &str {
        "batch_apply"
    }

    fn description(&self) -> &str {
        "Write multiple files in one call. files is an array of {path, content} objects."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "content": { "type": "string" }
                        },
                        "required": ["path", "content"]
                    }
                }
            },
            "required": ["files"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let files = call.arguments["files"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'files' array".into()))?;
        if files.is_empty() {
            return Err(ToolError::InvalidArguments("'files' array is empty".into()));
        }

        // Validate every path up front so a bad entry rejects the batch
        // before any file is touched.
        let mut staged = Vec::with_capacity(files.len());
        for entry in files {
            let path = entry["path"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("file entry missing 'path'".into()))?;
            let content = entry["content"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("file entry missing 'content'".into()))?;
            staged.push((self.workspace.resolve(path)?, content));
        }

        let mut written = Vec::new();
        for (path, content) in staged {
            if let Some(parent) = path.parent()
                && !parent.exists()
                && let Err(e) = tokio::fs::create_dir_all(parent).await
            {
                return Ok(ToolResult::failure(
                    &call.id,
                    format!("Failed to create directories for {}: {e}", path.display()),
                ));
            }
            if let Err(e) = tokio::fs::write(&path, content).await {
                return Ok(ToolResult::failure(
                    &call.id,
                    format!("Failed to write {}: {e}", path.display()),
                ));
            }
            written.push(self.workspace.display_path(&path).display().to_string());
        }

        Ok(ToolResult::ok(
            &call.id,
            format!("Wrote {} file(s):\n{}", written.len(), written.join("\n")),
        ))
    }
}
