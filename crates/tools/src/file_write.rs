//! Workspace mutation and discovery tools: write files, list
//! directories, and search file contents by regex.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};
use regex_lite::Regex;
use std::path::PathBuf;

/// Directories never descended into while walking the workspace.
const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

/// Write content to a file, creating parent directories as needed.
pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and any parent directories) if needed. Overwrites existing content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the workspace root" },
                "content": { "type": "string", "description": "The full content to write" }
            },
            "required": ["path", "content"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = self.workspace.resolve(call.str_arg("path")?)?;
        let content = call.str_arg("content")?;

        if let Some(parent) = path.parent()
            && !parent.exists()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failure(
                &call.id,
                format!("Failed to create parent directories: {e}"),
            ));
        }

        match tokio::fs::write(&path, content).await {
            Ok(()) => Ok(ToolResult::ok(
                &call.id,
                format!(
                    "Wrote {} bytes to {}",
                    content.len(),
                    self.workspace.display_path(&path).display()
                ),
            )),
            Err(e) => Ok(ToolResult::failure(&call.id, format!("Failed to write file: {e}"))),
        }
    }
}

/// List the entries of a directory.
pub struct ListFilesTool {
    workspace: Workspace,
}

impl ListFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List the files and directories at a path. Directories are suffixed with '/'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path relative to the workspace root (default: the root)" }
            }
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = self.workspace.resolve(call.opt_str_arg("path").unwrap_or("."))?;

        let mut reader = match tokio::fs::read_dir(&path).await {
            Ok(reader) => reader,
            Err(e) => {
                return Ok(ToolResult::failure(
                    &call.id,
                    format!("Failed to list directory: {e}"),
                ));
            }
        };

        let mut entries = Vec::new();
        while let Ok(Some(entry)) = reader.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(if is_dir { format!("{name}/") } else { name });
        }
        entries.sort_unstable();

        if entries.is_empty() {
            return Ok(ToolResult::ok(&call.id, "(empty directory)"));
        }
        Ok(ToolResult::ok(&call.id, entries.join("\n")))
    }
}

/// Search file contents for a regex pattern, recursively.
pub struct SearchFilesTool {
    workspace: Workspace,
}

impl SearchFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Cap on reported matches so a broad pattern cannot flood the
    /// history.
    const MAX_MATCHES: usize = 100;
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search file contents under a directory for a regex pattern. Returns 'path:line: text' matches."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regex pattern to search for" },
                "path": { "type": "string", "description": "Directory to search under (default: workspace root)" }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let pattern = call.str_arg("pattern")?;
        let root = self.workspace.resolve(call.opt_str_arg("path").unwrap_or("."))?;

        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                return Err(ToolError::InvalidArguments(format!("Invalid pattern: {e}")));
            }
        };

        let mut matches = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let Ok(mut reader) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = reader.next_entry().await {
                let entry_path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    if !SKIP_DIRS.contains(&name.as_str()) {
                        pending.push(entry_path);
                    }
                    continue;
                }
                self.scan_file(&entry_path, &regex, &mut matches).await;
                if matches.len() >= Self::MAX_MATCHES {
                    matches.push("... (truncated)".into());
                    return Ok(ToolResult::ok(&call.id, matches.join("\n")));
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::ok(&call.id, "No matches found"));
        }
        Ok(ToolResult::ok(&call.id, matches.join("\n")))
    }
}

impl SearchFilesTool {
    async fn scan_file(&self, path: &PathBuf, regex: &Regex, matches: &mut Vec<String>) {
        // Binary and unreadable files are skipped silently.
        let Ok(content) = tokio::fs::read_to_string(path).await else {
            return;
        };
        let display = self.workspace.display_path(path).display().to_string();
        for (i, line) in content.lines().enumerate() {
            if matches.len() >= Self::MAX_MATCHES {
                return;
            }
            if regex.is_match(line) {
                matches.push(format!("{display}:{}: {}", i + 1, line.trim()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    #[tokio::test]
    async fn write_creates_parents() {
        let (dir, ws) = setup();
        let tool = WriteFileTool::new(ws);
        let call = ToolCall::new(
            "write_file",
            serde_json::json!({"path": "deep/nested/file.txt", "content": "hello"}),
        );
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        let written = std::fs::read_to_string(dir.path().join("deep/nested/file.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn write_is_mutating_read_is_not() {
        let (_dir, ws) = setup();
        assert!(WriteFileTool::new(ws.clone()).is_mutating());
        assert!(!ListFilesTool::new(ws).is_mutating());
    }

    #[tokio::test]
    async fn list_marks_directories() {
        let (dir, ws) = setup();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("README.md"), "x").unwrap();

        let tool = ListFilesTool::new(ws);
        let call = ToolCall::new("list_files", serde_json::json!({}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.content.contains("src/"));
        assert!(result.content.contains("README.md"));
    }

    #[tokio::test]
    async fn search_finds_matches_with_locations() {
        let (dir, ws) = setup();
        std::fs::write(dir.path().join("a.rs"), "fn alpha() {}\nfn beta() {}\n").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/junk"), "fn alpha() {}").unwrap();

        let tool = SearchFilesTool::new(ws);
        let call = ToolCall::new("search_files", serde_json::json!({"pattern": "fn alpha"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.content.contains("a.rs:1:"));
        // .git contents are never searched
        assert_eq!(result.content.matches("fn alpha").count(), 1);
    }

    #[tokio::test]
    async fn search_invalid_pattern_rejected() {
        let (_dir, ws) = setup();
        let tool = SearchFilesTool::new(ws);
        let call = ToolCall::new("search_files", serde_json::json!({"pattern": "[unclosed"}));
        assert!(matches!(
            tool.execute(&call).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn search_no_matches() {
        let (dir, ws) = setup();
        std::fs::write(dir.path().join("a.txt"), "nothing here").unwrap();
        let tool = SearchFilesTool::new(ws);
        let call = ToolCall::new("search_files", serde_json::json!({"pattern": "zzz_absent"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.content, "No matches found");
    }
}
