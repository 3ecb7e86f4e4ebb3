//! Targeted file edits: literal search/replace and line-addressed
//! insert/replace.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};

async fn read_for_edit(
    workspace: &Workspace,
    call: &ToolCall,
) -> Result<(std::path::PathBuf, String), ToolError> {
    let path = workspace.resolve(call.str_arg("path")?)?;
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: call.name.clone(),
            reason: format!("Failed to read {}: {e}", path.display()),
        })?;
    Ok((path, content))
}

/// Replace a literal string in a file.
pub struct SearchReplaceTool {
    workspace: Workspace,
}

impl SearchReplaceTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for SearchReplaceTool {
    fn name(&self) -> &str {
        "search_replace"
    }

    fn description(&self) -> &str {
        "Replace a literal string in a file. Set all=true to replace every occurrence; otherwise the search string must occur exactly once."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "search": { "type": "string", "description": "Exact text to find" },
                "replace": { "type": "string", "description": "Replacement text" },
                "all": { "type": "boolean", "description": "Replace all occurrences (default false)" }
            },
            "required": ["path", "search", "replace"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let search = call.str_arg("search")?;
        let replace = call.str_arg("replace")?;
        let all = call.arguments["all"].as_bool().unwrap_or(false);
        let (path, content) = read_for_edit(&self.workspace, call).await?;

        let occurrences = content.matches(search).count();
        if occurrences == 0 {
            return Ok(ToolResult::failure(
                &call.id,
                format!("Search text not found in {}", self.workspace.display_path(&path).display()),
            ));
        }
        if occurrences > 1 && !all {
            return Ok(ToolResult::failure(
                &call.id,
                format!(
                    "Search text occurs {occurrences} times; pass all=true or make it unique"
                ),
            ));
        }

        let updated = if all {
            content.replace(search, replace)
        } else {
            content.replacen(search, replace, 1)
        };

        match tokio::fs::write(&path, updated).await {
            Ok(()) => Ok(ToolResult::ok(
                &call.id,
                format!(
                    "Replaced {} occurrence(s) in {}",
                    if all { occurrences } else { 1 },
                    self.workspace.display_path(&path).display()
                ),
            )),
            Err(e) => Ok(ToolResult::failure(&call.id, format!("Failed to write file: {e}"))),
        }
    }
}

/// Insert lines before a given 1-based line number.
pub struct InsertLinesTool {
    workspace: Workspace,
}

impl InsertLinesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for InsertLinesTool {
    fn name(&self) -> &str {
        "insert_lines"
    }

    fn description(&self) -> &str {
        "Insert text before the given 1-based line number. line one past the end appends."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "line": { "type": "integer", "description": "1-based line to insert before" },
                "content": { "type": "string", "description": "Text to insert (may be multiple lines)" }
            },
            "required": ["path", "line", "content"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let line = call
            .opt_u64_arg("line")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'line' argument".into()))?
            as usize;
        let insert = call.str_arg("content")?;
        let (path, content) = read_for_edit(&self.workspace, call).await?;

        let mut lines: Vec<&str> = content.lines().collect();
        if line == 0 || line > lines.len() + 1 {
            return Err(ToolError::InvalidArguments(format!(
                "line {line} is out of range (file has {} lines)",
                lines.len()
            )));
        }

        let inserted: Vec<&str> = insert.lines().collect();
        let count = inserted.len();
        lines.splice(line - 1..line - 1, inserted);

        match tokio::fs::write(&path, lines.join("\n") + "\n").await {
            Ok(()) => Ok(ToolResult::ok(
                &call.id,
                format!("Inserted {count} line(s) at line {line}"),
            )),
            Err(e) => Ok(ToolResult::failure(&call.id, format!("Failed to write file: {e}"))),
        }
    }
}

/// Replace an inclusive 1-based line range with new text.
pub struct ReplaceLinesTool {
    workspace: Workspace,
}

impl ReplaceLinesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReplaceLinesTool {
    fn name(&self) -> &str {
        "replace_lines"
    }

    fn description(&self) -> &str {
        "Replace lines start_line..=end_line (1-based, inclusive) with new text. Empty content deletes the range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "start_line": { "type": "integer", "description": "First line to replace (1-based)" },
                "end_line": { "type": "integer", "description": "Last line to replace (inclusive)" },
                "content": { "type": "string", "description": "Replacement text (may be empty)" }
            },
            "required": ["path", "start_line", "end_line", "content"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let start = call
            .opt_u64_arg("start_line")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'start_line' argument".into()))?
            as usize;
        let end = call
            .opt_u64_arg("end_line")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'end_line' argument".into()))?
            as usize;
        let replacement = call.str_arg("content")?;
        let (path, content) = read_for_edit(&self.workspace, call).await?;

        let mut lines: Vec<&str> = content.lines().collect();
        if start == 0 || start > end || end > lines.len() {
            return Err(ToolError::InvalidArguments(format!(
                "range {start}..={end} is invalid (file has {} lines)",
                lines.len()
            )));
        }

        let new_lines: Vec<&str> = if replacement.is_empty() {
            Vec::new()
        } else {
            replacement.lines().collect()
        };
        lines.splice(start - 1..end, new_lines);

        match tokio::fs::write(&path, lines.join("\n") + "\n").await {
            Ok(()) => Ok(ToolResult::ok(
                &call.id,
                format!("Replaced lines {start}..={end}"),
            )),
            Err(e) => Ok(ToolResult::failure(&call.id, format!("Failed to write file: {e}"))),
        }
    }
}
