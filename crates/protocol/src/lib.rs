//! Tool-call recovery from free-form model text.
//!
//! Models asked to emit structured tool calls comply unevenly: some
//! produce the tagged JSON block they were shown, some fall back to
//! pseudo-code, some narrate shell commands in prose. Rather than
//! reject everything that is not the canonical encoding, the parser
//! runs a sequence of progressively looser extraction tiers and stops
//! at the first one that recognizes anything:
//!
//! 1. [`tagged`] — `<tool_call>{..}</tool_call>` blocks.
//! 2. [`call_syntax`] — `read_file("src/main.rs")` style invocations.
//! 3. [`fenced::extract_single`] — one shell line in a code fence.
//! 4. [`fenced::extract_multi`] — multi-line fences, `&&` expanded.
//! 5. [`inline`] — `` `cargo test` `` / `'git status'` spans in prose.
//! 6. [`natural`] — narrated "create file X" with a following fence.
//!
//! First match wins so a response is never double-counted across tiers.
//! Parsing never fails: malformed, truncated, or unrecognizable text
//! yields an empty list and the caller decides what to do with a turn
//! that produced no actionable calls.

pub mod call_syntax;
pub mod fenced;
pub mod inline;
pub mod natural;
pub mod scanner;
pub mod tagged;

use codewright_core::ToolCall;
use tracing::debug;

/// Command verbs a recovered shell line may start with. Anything else
/// is treated as prose, not a command.
pub const COMMAND_VERBS: &[&str] = &[
    "ls", "cat", "head", "tail", "grep", "find", "mkdir", "touch", "cp", "mv", "echo", "pwd",
    "wc", "diff", "sed", "awk", "chmod", "git", "cargo", "rustc", "npm", "npx", "node", "python",
    "python3", "pip", "pytest", "go", "make", "tree", "which",
];

/// Ordered-tier recovery parser for tool calls embedded in model text.
///
/// Stateless and cheap to construct; the agent keeps one per run for
/// clarity, not necessity.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolCallProtocolParser;

impl ToolCallProtocolParser {
    pub fn new() -> Self {
        Self
    }

    /// Recover tool calls from `text`. Returns them in order of
    /// appearance; empty when nothing is recognized. Never errors.
    pub fn parse(&self, text: &str) -> Vec<ToolCall> {
        let tiers: [(&str, fn(&str) -> Vec<ToolCall>); 6] = [
            ("tagged", tagged::extract),
            ("call_syntax", call_syntax::extract),
            ("fenced_single", fenced::extract_single),
            ("fenced_multi", fenced::extract_multi),
            ("inline", inline::extract),
            ("natural", natural::extract),
        ];

        for (tier, extract) in tiers {
            let calls = extract(text);
            if !calls.is_empty() {
                debug!(tier, count = calls.len(), "recovered tool calls");
                return calls;
            }
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ToolCall> {
        ToolCallProtocolParser::new().parse(text)
    }

    #[test]
    fn tagged_tier_wins() {
        let text = r#"<tool_call>{"name": "read_file", "arguments": {"path": "a.rs"}}</tool_call>
Also you could run `ls`."#;
        let calls = parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
    }

    #[test]
    fn call_syntax_when_no_tag() {
        let calls = parse(r#"I'll check with read_file("src/lib.rs")."#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].arguments["path"], "src/lib.rs");
    }

    #[test]
    fn fenced_single_line() {
        let calls = parse("Run:\n```bash\ncargo test\n```");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "run_command");
        assert_eq!(calls[0].arguments["command"], "cargo test");
    }

    #[test]
    fn fenced_multi_line_chain() {
        let calls = parse("```bash\nmkdir -p src && touch src/lib.rs\ngit init\n```");
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].arguments["command"], "mkdir -p src");
        assert_eq!(calls[2].arguments["command"], "git init");
    }

    #[test]
    fn inline_span() {
        let calls = parse("You should run `git status` before anything else.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["command"], "git status");
    }

    #[test]
    fn natural_language_file_creation() {
        let text = "I'll create a file named greet.py:\n```python\nprint(\"hi\")\n```";
        let calls = parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(calls[0].arguments["path"], "greet.py");
    }

    #[test]
    fn unrecognized_text_yields_empty() {
        assert!(parse("The weather in Lisbon is pleasant in May.").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn malformed_json_yields_empty_not_error() {
        let text = r#"<tool_call>{"name": "write_file", "arguments": {"path": "#;
        assert!(parse(text).is_empty());
    }

    #[test]
    fn tiers_do_not_double_count() {
        // A fenced command also quoted inline must appear exactly once.
        let text = "Run `cargo build`:\n```bash\ncargo build\n```";
        let calls = parse(text);
        assert_eq!(calls.len(), 1);
    }
}
