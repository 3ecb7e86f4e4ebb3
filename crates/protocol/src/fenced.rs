//! Tiers 3 and 4 — shell commands inside fenced code blocks.
//!
//! Tier 3 recovers a single shell-looking line from a fence; tier 4
//! handles multi-line blocks by splitting lines, expanding `&&` chains,
//! and keeping only lines that start with an allow-listed command verb.

use crate::COMMAND_VERBS;
use codewright_core::ToolCall;

/// A fenced code block with its (possibly empty) language tag.
#[derive(Debug)]
pub struct FencedBlock<'a> {
    pub lang: &'a str,
    pub body: &'a str,
}

/// Extract all fenced code blocks from markdown-ish text.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    let mut base = 0usize;

    while let Some(open) = rest.find("```") {
        let after_open = base + open + 3;
        let Some(lang_end) = text[after_open..].find('\n') else {
            break;
        };
        let lang = text[after_open..after_open + lang_end].trim();
        let body_start = after_open + lang_end + 1;
        let Some(close) = text[body_start..].find("```") else {
            break;
        };
        blocks.push(FencedBlock {
            lang,
            body: &text[body_start..body_start + close],
        });
        base = body_start + close + 3;
        rest = &text[base..];
    }

    blocks
}

/// Language tags under which we treat a fence as shell input.
fn is_shell_lang(lang: &str) -> bool {
    matches!(lang, "" | "bash" | "sh" | "shell" | "zsh" | "console" | "terminal")
}

/// Whether a trimmed line starts with an allow-listed command verb.
pub fn is_command_line(line: &str) -> bool {
    let first = line.split_whitespace().next().unwrap_or("");
    COMMAND_VERBS.contains(&first)
}

/// Strip a leading `$ ` prompt copied from a terminal transcript.
fn strip_prompt(line: &str) -> &str {
    line.strip_prefix("$ ").unwrap_or(line).trim()
}

/// Tier 3: exactly one shell-looking line inside a fenced block.
pub fn extract_single(text: &str) -> Vec<ToolCall> {
    for block in fenced_blocks(text) {
        if !is_shell_lang(block.lang) {
            continue;
        }
        let lines: Vec<&str> = block
            .body
            .lines()
            .map(strip_prompt)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if let [only] = lines.as_slice()
            && is_command_line(only)
            && !only.contains("&&")
        {
            return vec![command_call(only)];
        }
    }
    Vec::new()
}

/// Tier 4: multi-line fenced block, `&&` chains expanded, only
/// allow-listed command lines kept.
pub fn extract_multi(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();

    for block in fenced_blocks(text) {
        if !is_shell_lang(block.lang) {
            continue;
        }
        for line in block.body.lines() {
            let line = strip_prompt(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for segment in line.split("&&") {
                let segment = segment.trim();
                if is_command_line(segment) {
                    calls.push(command_call(segment));
                }
            }
        }
    }

    calls
}

fn command_call(command: &str) -> ToolCall {
    ToolCall::new("run_command", serde_json::json!({ "command": command }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command_in_fence() {
        let text = "Run this:\n```bash\nls -la src/\n```\n";
        let calls = extract_single(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "run_command");
        assert_eq!(calls[0].arguments["command"], "ls -la src/");
    }

    #[test]
    fn prompt_prefix_stripped() {
        let text = "```console\n$ git status\n```";
        let calls = extract_single(text);
        assert_eq!(calls[0].arguments["command"], "git status");
    }

    #[test]
    fn non_shell_language_skipped() {
        let text = "```rust\nls() // not a command\n```";
        assert!(extract_single(text).is_empty());
        assert!(extract_multi(text).is_empty());
    }

    #[test]
    fn multi_line_block_filtered() {
        let text = "```bash\nmkdir -p src\nthis is prose, not a command\ncargo build\n```";
        let calls = extract_multi(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["command"], "mkdir -p src");
        assert_eq!(calls[1].arguments["command"], "cargo build");
    }

    #[test]
    fn and_chains_expanded() {
        let text = "```sh\nmkdir demo && touch demo/mod.rs && git add demo\n```";
        let calls = extract_multi(text);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].arguments["command"], "touch demo/mod.rs");
    }

    #[test]
    fn comments_and_blanks_ignored() {
        let text = "```bash\n# set up the project\n\ncargo init\n```";
        let calls = extract_multi(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["command"], "cargo init");
    }

    #[test]
    fn single_requires_exactly_one_line() {
        let text = "```bash\nls\ncat a.txt\n```";
        assert!(extract_single(text).is_empty());
        assert_eq!(extract_multi(text).len(), 2);
    }

    #[test]
    fn unclosed_fence_ignored() {
        let text = "```bash\nls -la";
        assert!(extract_single(text).is_empty());
    }

    #[test]
    fn disallowed_verb_dropped() {
        let text = "```bash\nsudo rm -rf /\n```";
        assert!(extract_single(text).is_empty());
        assert!(extract_multi(text).is_empty());
    }
}
