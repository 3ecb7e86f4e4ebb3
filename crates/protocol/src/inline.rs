//! Tier 5 — inline quoted command spans.
//!
//! Recovers commands mentioned in prose, e.g.
//! "run `cargo test` to verify" or "execute 'git status' first".
//! Only spans whose first token is an allow-listed command verb are
//! kept; quoted file names, phrases, and code identifiers fall through.

use crate::fenced::is_command_line;
use codewright_core::ToolCall;

/// Extract inline backtick- or single-quoted command spans, in order.
pub fn extract(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();

    for delim in ['`', '\''] {
        let mut cursor = 0usize;
        while let Some(open) = text[cursor..].find(delim) {
            let start = cursor + open + 1;
            let Some(close) = text[start..].find(delim) else {
                break;
            };
            let span = text[start..start + close].trim();
            cursor = start + close + 1;

            // Single line, starts with an allowed verb, has arguments or
            // is a bare verb like `pwd`. Multi-line spans are fences'
            // business, not ours.
            if !span.contains('\n') && is_command_line(span) {
                calls.push(ToolCall::new(
                    "run_command",
                    serde_json::json!({ "command": span }),
                ));
            }
        }
        if !calls.is_empty() {
            // Backtick spans take precedence; mixing delimiters would
            // double-report commands quoted both ways.
            break;
        }
    }

    calls
}
