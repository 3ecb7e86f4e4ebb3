//! Unified-diff patch application.
//!
//! Applies a textual patch produced by `diff -u` / `git diff` to files
//! in the workspace. Hunks are matched against the file's current
//! content; a context mismatch fails the whole patch rather than
//! applying it partially.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};

/// One file's worth of hunks from a unified diff.
#[derive(Debug)]
struct FilePatch {
    path: String,
    hunks: Vec<Hunk>,
}

#[derive(Debug)]
struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

#[derive(Debug)]
enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

/// Parse a unified diff into per-file hunk lists.
fn parse_patch(patch: &str) -> Result<Vec<FilePatch>, String> {
    let mut files: Vec<FilePatch> = Vec::new();

    for line in patch.lines() {
        if let Some(path) = line.strip_prefix("+++ ") {
            let path = path
                .trim()
                .strip_prefix("b/")
                .unwrap_or(path.trim())
                .to_string();
            if path == "/dev/null" {
                return Err("patches that delete files are not supported".into());
            }
            files.push(FilePatch {
                path,
                hunks: Vec::new(),
            });
        } else if line.starts_with("--- ") || line.starts_with("diff ") || line.starts_with("index ")
        {
            // header noise
        } else if let Some(header) = line.strip_prefix("@@") {
            let file = files.last_mut().ok_or("hunk before any +++ header")?;
            let old_start = parse_hunk_start(header)?;
            file.hunks.push(Hunk {
                old_start,
                lines: Vec::new(),
            });
        } else if let Some(file) = files.last_mut()
            && let Some(hunk) = file.hunks.last_mut()
        {
            match line.chars().next() {
                Some('+') => hunk.lines.push(HunkLine::Add(line[1..].to_string())),
                Some('-') => hunk.lines.push(HunkLine::Remove(line[1..].to_string())),
                Some(' ') => hunk.lines.push(HunkLine::Context(line[1..].to_string())),
                Some('\\') => {} // "\ No newline at end of file"
                None => hunk.lines.push(HunkLine::Context(String::new())),
                _ => return Err(format!("unexpected patch line: {line}")),
            }
        }
    }

    if files.is_empty() {
        return Err("no file headers found in patch".into());
    }
    Ok(files)
}

/// Pull the old-file start line out of `@@ -12,5 +12,7 @@`.
fn parse_hunk_start(header: &str) -> Result<usize, String> {
    let spec = header
        .trim()
        .split_whitespace()
        .find(|part| part.starts_with('-'))
        .ok_or("malformed hunk header")?;
    let start = spec[1..]
        .split(',')
        .next()
        .unwrap_or("")
        .parse::<usize>()
        .map_err(|_| format!("malformed hunk header: {header}"))?;
    Ok(start)
}

/// Apply one file's hunks to its content.
fn apply_hunks(content: &str, hunks: &[Hunk]) -> Result<String, String> {
    let mut lines: Vec<String> = content.lines().map(String::from).collect();
    // Later hunks use line numbers from the original file; applying in
    // reverse keeps earlier offsets valid.
    for hunk in hunks.iter().rev() {
        let start = hunk.old_start.saturating_sub(1);
        let mut old_lines = Vec::new();
        let mut new_lines = Vec::new();
        for hunk_line in &hunk.lines {
            match hunk_line {
                HunkLine::Context(l) => {
                    old_lines.push(l.clone());
                    new_lines.push(l.clone());
                }
                HunkLine::Remove(l) => old_lines.push(l.clone()),
                HunkLine::Add(l) => new_lines.push(l.clone()),
            }
        }

        let end = start + old_lines.len();
        if end > lines.len() || lines[start..end] != old_lines[..] {
            return Err(format!(
                "hunk at line {} does not match file content",
                hunk.old_start
            ));
        }
        lines.splice(start..end, new_lines);
    }
    Ok(lines.join("\n") + "\n")
}

/// Apply a unified diff to workspace files.
pub struct ApplyPatchTool {
    workspace: Workspace,
}

impl ApplyPatchTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ApplyPatchTool {
    fn name(&self) -> &str {
        "apply_patch"
    }

    fn description(&self) -> &str {
        "Apply a unified diff (as produced by 'diff -u' or 'git diff') to files in the workspace."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "patch": { "type": "string", "description": "The unified diff text" }
            },
            "required": ["patch"]
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let patch = call.str_arg("patch")?;

        let files = match parse_patch(patch) {
            Ok(files) => files,
            Err(e) => return Ok(ToolResult::failure(&call.id, format!("Invalid patch: {e}"))),
        };

        // Validate every file before touching any of them.
        let mut staged = Vec::new();
        for file in &files {
            let path = self.workspace.resolve(&file.path)?;
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    return Ok(ToolResult::failure(
                        &call.id,
                        format!("Cannot patch {}: {e}", file.path),
                    ));
                }
            };
            match apply_hunks(&content, &file.hunks) {
                Ok(updated) => staged.push((path, updated)),
                Err(e) => {
                    return Ok(ToolResult::failure(
                        &call.id,
                        format!("Patch does not apply to {}: {e}", file.path),
                    ));
                }
            }
        }

        for (path, updated) in &staged {
            if let Err(e) = tokio::fs::write(path, updated).await {
                return Ok(ToolResult::failure(
                    &call.id,
                    format!("Failed to write {}: {e}", path.display()),
                ));
            }
        }

        Ok(ToolResult::ok(
            &call.id,
            format!("Patched {} file(s)", staged.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(name: &str, content: &str) -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), content).unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    #[tokio::test]
    async fn simple_patch_applies() {
        let (dir, ws) = setup("main.rs", "fn main() {\n    old();\n}\n");
        let patch = "--- a/main.rs\n+++ b/main.rs\n@@ -1,3 +1,3 @@\n fn main() {\n-    old();\n+    new();\n }\n";

        let tool = ApplyPatchTool::new(ws);
        let call = ToolCall::new("apply_patch", serde_json::json!({"patch": patch}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success, "{:?}", result.error);
        let content = std::fs::read_to_string(dir.path().join("main.rs")).unwrap();
        assert_eq!(content, "fn main() {\n    new();\n}\n");
    }

    #[tokio::test]
    async fn context_mismatch_rejects_whole_patch() {
        let (dir, ws) = setup("a.txt", "actual content\n");
        let patch = "--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-expected content\n+changed\n";

        let tool = ApplyPatchTool::new(ws);
        let call = ToolCall::new("apply_patch", serde_json::json!({"patch": patch}));
        let result = tool.execute(&call).await.unwrap();
        assert!(!result.success);
        // File untouched on failure
        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "actual content\n");
    }

    #[tokio::test]
    async fn multiple_hunks_apply_in_reverse() {
        let (dir, ws) = setup("f.txt", "a\nb\nc\nd\ne\nf\n");
        let patch = "--- a/f.txt\n+++ b/f.txt\n@@ -1,2 +1,2 @@\n a\n-b\n+B\n@@ -5,2 +5,2 @@\n e\n-f\n+F\n";

        let tool = ApplyPatchTool::new(ws);
        let call = ToolCall::new("apply_patch", serde_json::json!({"patch": patch}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success, "{:?}", result.error);
        let content = std::fs::read_to_string(dir.path().join("f.txt")).unwrap();
        assert_eq!(content, "a\nB\nc\nd\ne\nF\n");
    }

    #[tokio::test]
    async fn garbage_patch_is_soft_failure() {
        let (_dir, ws) = setup("f.txt", "x\n");
        let tool = ApplyPatchTool::new(ws);
        let call = ToolCall::new("apply_patch", serde_json::json!({"patch": "not a diff"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(!result.success);
    }

    #[test]
    fn hunk_header_parsing() {
        assert_eq!(parse_hunk_start(" -12,5 +12,7 @@").unwrap(), 12);
        assert_eq!(parse_hunk_start(" -1 +1 @@").unwrap(), 1);
        assert!(parse_hunk_start(" garbage").is_err());
    }
}
