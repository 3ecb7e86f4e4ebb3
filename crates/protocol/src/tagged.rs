//! Tier 1 — strict tagged tool-call blocks.
//!
//! The most reliable encoding models produce when asked:
//!
//! ```text
//! <tool_call>
//! {"name": "write_file", "arguments": {"path": "notes.txt", "content": "hello"}}
//! </tool_call>
//! ```
//!
//! The JSON payload is located with the escape-aware scanner, so a
//! block whose object is still streaming (unbalanced braces) is skipped
//! rather than misparsed.

use crate::scanner::extract_json_object;
use codewright_core::ToolCall;

const OPEN_TAG: &str = "<tool_call>";

/// Extract every complete tagged tool call, in order of appearance.
pub fn extract(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut cursor = 0usize;

    while let Some(tag_pos) = text[cursor..].find(OPEN_TAG) {
        let search_from = cursor + tag_pos + OPEN_TAG.len();
        let Some((value, end)) = extract_json_object(text, search_from) else {
            // Incomplete or malformed payload; nothing after this tag
            // can be trusted either, since the object never closed.
            break;
        };
        cursor = end;

        let Some(name) = value["name"].as_str() else {
            continue;
        };
        let arguments = match &value["arguments"] {
            serde_json::Value::Object(map) => serde_json::Value::Object(map.clone()),
            serde_json::Value::Null => serde_json::json!({}),
            // Some models emit arguments as a JSON-encoded string.
            serde_json::Value::String(s) => match serde_json::from_str(s) {
                Ok(serde_json::Value::Object(map)) => serde_json::Value::Object(map),
                _ => continue,
            },
            _ => continue,
        };

        calls.push(ToolCall::new(name, arguments));
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tagged_call() {
        let text = r#"I'll write the file now.
<tool_call>
{"name": "write_file", "arguments": {"path": "notes.txt", "content": "hello"}}
</tool_call>"#;
        let calls = extract(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(calls[0].arguments["path"], "notes.txt");
        assert_eq!(calls[0].arguments["content"], "hello");
    }

    #[test]
    fn multiple_tagged_calls_in_order() {
        let text = r#"<tool_call>{"name": "read_file", "arguments": {"path": "a.rs"}}</tool_call>
then
<tool_call>{"name": "read_file", "arguments": {"path": "b.rs"}}</tool_call>"#;
        let calls = extract(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["path"], "a.rs");
        assert_eq!(calls[1].arguments["path"], "b.rs");
    }

    #[test]
    fn truncated_payload_skipped() {
        let text = r#"<tool_call>{"name": "write_file", "arguments": {"path": "a.txt", "cont"#;
        assert!(extract(text).is_empty());
    }

    #[test]
    fn string_encoded_arguments_accepted() {
        let text = r#"<tool_call>{"name": "read_file", "arguments": "{\"path\": \"x.rs\"}"}</tool_call>"#;
        let calls = extract(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["path"], "x.rs");
    }

    #[test]
    fn missing_name_skipped() {
        let text = r#"<tool_call>{"arguments": {"path": "a"}}</tool_call>"#;
        assert!(extract(text).is_empty());
    }

    #[test]
    fn null_arguments_become_empty_object() {
        let text = r#"<tool_call>{"name": "git_status"}</tool_call>"#;
        let calls = extract(text);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].arguments.as_object().unwrap().is_empty());
    }
}
