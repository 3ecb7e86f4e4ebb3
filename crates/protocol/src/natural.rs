//! Tier 6 — natural-language file-creation intent.
//!
//! Last resort for models that narrate instead of calling:
//!
//! ````text
//! I'll create a file named `hello.py` with the following content:
//!
//! ```python
//! print("hello")
//! ```
//! ````
//!
//! The file name comes from the prose, the content from the first code
//! fence after the mention. Without a fence there is nothing reliable
//! to write, so no call is produced.

use crate::fenced::fenced_blocks;
use codewright_core::ToolCall;
use regex_lite::Regex;
use std::sync::OnceLock;

fn intent_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            // "create a file named hello.py", "write the file `src/lib.rs`",
            // "make a new file called test.txt" and close variants.
            Regex::new(
                r#"(?i)(?:create|write|make|add)\s+(?:a\s+|the\s+)?(?:new\s+)?file\s+(?:named\s+|called\s+)?[`'"]?([A-Za-z0-9_./-]+\.[A-Za-z0-9]+)[`'"]?"#,
            )
            .ok()
        })
        .as_ref()
}

/// Extract a `write_file` call from narrated file-creation intent.
pub fn extract(text: &str) -> Vec<ToolCall> {
    let Some(captures) = intent_pattern().and_then(|re| re.captures(text)) else {
        return Vec::new();
    };
    let Some(path) = captures.get(1) else {
        return Vec::new();
    };

    // Content must come from a fence that follows the mention.
    let mention_end = path.end();
    let tail = &text[mention_end..];
    let Some(block) = fenced_blocks(tail).into_iter().next() else {
        return Vec::new();
    };

    let content = block.body.trim_end_matches('\n');
    if content.is_empty() {
        return Vec::new();
    }

    vec![ToolCall::new(
        "write_file",
        serde_json::json!({ "path": path.as_str(), "content": content }),
    )]
}
