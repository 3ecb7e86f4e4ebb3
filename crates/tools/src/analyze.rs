//! Read-only code analysis tools.
//!
//! Line-based heuristics, not a real parser: good enough to orient the
//! model inside a file without burning a whole read_file on it.

use crate::path::Workspace;
use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};
use regex_lite::Regex;

/// Patterns that open a named declaration, per common languages.
const DECL_PATTERNS: &[&str] = &[
    r"^\s*(?:pub\s+)?(?:async\s+)?fn\s+(\w+)",
    r"^\s*(?:pub\s+)?struct\s+(\w+)",
    r"^\s*(?:pub\s+)?enum\s+(\w+)",
    r"^\s*(?:pub\s+)?trait\s+(\w+)",
    r"^\s*impl(?:<[^>]*>)?\s+(\w+)",
    r"^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)",
    r"^\s*class\s+(\w+)",
    r"^\s*def\s+(\w+)",
    r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)",
];

fn decl_regexes() -> Vec<Regex> {
    DECL_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

/// Find the 0-based line where the named declaration starts.
fn find_declaration(content: &str, name: &str) -> Option<usize> {
    let regexes = decl_regexes();
    content.lines().position(|line| {
        regexes.iter().any(|re| {
            re.captures(line)
                .and_then(|c| c.get(1))
                .is_some_and(|m| m.as_str() == name)
        })
    })
}

/// Extract a brace-delimited body starting at `start` (0-based line).
/// For indentation-based languages falls back to the indented block.
fn extract_block(content: &str, start: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();

    // def/class suites are indentation-delimited even when the body
    // carries braces (dicts, f-strings).
    let head = lines[start].trim_start();
    if head.ends_with(':')
        && (head.starts_with("def ")
            || head.starts_with("async def ")
            || head.starts_with("class "))
    {
        return indented_suite(&lines, start);
    }

    let mut depth = 0i32;
    let mut seen_open = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        // Braces inside string literals do not delimit the block.
        let mut chars = line.chars();
        let mut in_string = false;
        while let Some(c) = chars.next() {
            if in_string {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return lines[start..=i].join("\n");
        }
    }

    if seen_open {
        // Unbalanced braces: return the remainder rather than nothing.
        return lines[start..].join("\n");
    }

    // No braces at all: take the indented suite.
    indented_suite(&lines, start)
}

fn indented_suite(lines: &[&str], start: usize) -> String {
    let base_indent = indent_of(lines[start]);
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() || indent_of(line) > base_indent {
            end = i;
        } else {
            break;
        }
    }
    lines[start..=end].join("\n")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Extract one named function/struct/class from a file.
pub struct ExtractFunctionTool {
    workspace: Workspace,
}

impl ExtractFunctionTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ExtractFunctionTool {
    fn name(&self) -> &str {
        "extract_function"
    }

    fn description(&self) -> &str {
        "Extract the source of one named function, struct, or class from a file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to read" },
                "name": { "type": "string", "description": "Declaration name to extract" }
            },
            "required": ["path", "name"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let name = call.str_arg("name")?;
        let path = self.workspace.resolve(call.str_arg("path")?)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolResult::failure(&call.id, format!("Failed to read file: {e}"))),
        };

        match find_declaration(&content, name) {
            Some(start) => {
                let block = extract_block(&content, start);
                Ok(ToolResult::ok(
                    &call.id,
                    format!("// {} (line {})\n{block}", name, start + 1),
                ))
            }
            None => Ok(ToolResult::failure(
                &call.id,
                format!("No declaration named '{name}' found"),
            )),
        }
    }
}

/// Outline a file's top-level declarations with line numbers.
pub struct CodeStructureTool {
    workspace: Workspace,
}

impl CodeStructureTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CodeStructureTool {
    fn name(&self) -> &str {
        "code_structure"
    }

    fn description(&self) -> &str {
        "List a file's functions, structs, classes, and traits with their line numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to outline" }
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

        let regexes = decl_regexes();
        let mut outline = Vec::new();
        for (i, line) in content.lines().enumerate() {
            for re in &regexes {
                if re.is_match(line) {
                    outline.push(format!("{:>5}: {}", i + 1, line.trim()));
                    break;
                }
            }
        }

        if outline.is_empty() {
            return Ok(ToolResult::ok(&call.id, "No declarations found"));
        }
        Ok(ToolResult::ok(&call.id, outline.join("\n")))
    }
}

/// List the project's declared dependencies.
pub struct DependenciesTool {
    workspace: Workspace,
}

impl DependenciesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DependenciesTool {
    fn name(&self) -> &str {
        "dependencies"
    }

    fn description(&self) -> &str {
        "List the dependencies declared in Cargo.toml or package.json at the workspace root."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let root = self.workspace.root();

        let cargo = root.join("Cargo.toml");
        if cargo.exists() {
            let content = tokio::fs::read_to_string(&cargo).await.unwrap_or_default();
            let mut deps = Vec::new();
            let mut in_deps = false;
            for line in content.lines() {
                let trimmed = line.trim();
                if trimmed.starts_with('[') {
                    in_deps = trimmed.contains("dependencies");
                    continue;
                }
                if in_deps
                    && let Some((name, _)) = trimmed.split_once('=')
                {
                    deps.push(name.trim().to_string());
                }
            }
            deps.sort_unstable();
            deps.dedup();
            return Ok(ToolResult::ok(
                &call.id,
                format!("Cargo dependencies:\n{}", deps.join("\n")),
            ));
        }

        let package = root.join("package.json");
        if package.exists() {
            let content = tokio::fs::read_to_string(&package).await.unwrap_or_default();
            let parsed: serde_json::Value = serde_json::from_str(&content).unwrap_or_default();
            let mut deps = Vec::new();
            for section in ["dependencies", "devDependencies"] {
                if let Some(map) = parsed[section].as_object() {
                    deps.extend(map.keys().cloned());
                }
            }
            deps.sort_unstable();
            return Ok(ToolResult::ok(
                &call.id,
                format!("npm dependencies:\n{}", deps.join("\n")),
            ));
        }

        Ok(ToolResult::failure(
            &call.id,
            "No Cargo.toml or package.json at the workspace root",
        ))
    }
}

/// Find usages of an identifier across the workspace.
pub struct FindUsagesTool {
    workspace: Workspace,
}

impl FindUsagesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FindUsagesTool {
    fn name(&self) -> &str {
        "find_usages"
    }

    fn description(&self) -> &str {
        "Find where an identifier is used across the workspace (whole-word match)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Identifier to look up" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let name = call.str_arg("name")?;
        let escaped: String = name
            .chars()
            .flat_map(|c| {
                if c.is_alphanumeric() || c == '_' {
                    vec![c]
                } else {
                    vec!['\\', c]
                }
            })
            .collect();

        // Delegate to the workspace-wide regex search.
        let search = crate::file_write::SearchFilesTool::new(self.workspace.clone());
        let inner = ToolCall {
            id: call.id.clone(),
            name: "search_files".into(),
            arguments: serde_json::json!({ "pattern": format!(r"\b{escaped}\b") }),
        };
        search.execute(&inner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"pub struct Config {
    value: u32,
}

pub fn load() -> Config {
    Config { value: 1 }
}

fn helper() {
    load();
}
"#;

    fn setup() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("code.rs"), SAMPLE).unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    #[test]
    fn declaration_lookup() {
        assert_eq!(find_declaration(SAMPLE, "load"), Some(4));
        assert_eq!(find_declaration(SAMPLE, "Config"), Some(0));
        assert_eq!(find_declaration(SAMPLE, "absent"), None);
    }

    #[test]
    fn block_extraction_balances_braces() {
        let block = extract_block(SAMPLE, 4);
        assert!(block.starts_with("pub fn load"));
        assert!(block.ends_with('}'));
        assert!(block.contains("value: 1"));
        assert!(!block.contains("helper"));
    }

    #[test]
    fn python_block_extraction_by_indent() {
        let py = "def greet(name):\n    msg = f\"hi {name}\"\n    return msg\n\nprint(greet(\"x\"))\n";
        let block = extract_block(py, 0);
        assert!(block.contains("return msg"));
        assert!(!block.contains("print"));
    }

    #[test]
    fn braces_inside_string_literals_do_not_close_the_block() {
        let src = "fn render() {\n    let s = \"}{\";\n    s.len();\n}\n\nfn other() {}\n";
        let block = extract_block(src, 0);
        assert!(block.contains("s.len()"));
        assert!(block.ends_with('}'));
        assert!(!block.contains("other"));
    }

    #[tokio::test]
    async fn extract_function_tool() {
        let (_dir, ws) = setup();
        let tool = ExtractFunctionTool::new(ws);
        let call = ToolCall::new(
            "extract_function",
            serde_json::json!({"path": "code.rs", "name": "helper"}),
        );
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.content.contains("fn helper"));
        assert!(result.content.contains("line 9"));
    }

    #[tokio::test]
    async fn structure_outline() {
        let (_dir, ws) = setup();
        let tool = CodeStructureTool::new(ws);
        let call = ToolCall::new("code_structure", serde_json::json!({"path": "code.rs"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.content.contains("1: pub struct Config"));
        assert!(result.content.contains("5: pub fn load"));
        assert!(result.content.contains("9: fn helper"));
    }

    #[tokio::test]
    async fn cargo_dependencies_listed() {
        let (dir, ws) = setup();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"x\"\n[dependencies]\nserde = \"1\"\ntokio = { version = \"1\" }\n",
        )
        .unwrap();
        let tool = DependenciesTool::new(ws);
        let call = ToolCall::new("dependencies", serde_json::json!({}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.content.contains("serde"));
        assert!(result.content.contains("tokio"));
        assert!(!result.content.contains("name"));
    }

    #[tokio::test]
    async fn find_usages_whole_word() {
        let (_dir, ws) = setup();
        let tool = FindUsagesTool::new(ws);
        let call = ToolCall::new("find_usages", serde_json::json!({"name": "load"}));
        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        // Declaration plus call site
        assert!(result.content.contains("code.rs:5"));
        assert!(result.content.contains("code.rs:10"));
    }
}
