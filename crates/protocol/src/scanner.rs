//! Brace-depth, escape-aware JSON object scanner.
//!
//! Model output frequently contains JSON that is truncated mid-stream,
//! wrapped in prose, or followed by trailing text. `serde_json` alone
//! cannot tell "complete object with junk after it" from "object still
//! being generated", so extraction walks the text character by
//! character, tracking brace depth and string/escape state, and only
//! hands a candidate to serde once the closing brace of the outermost
//! object has actually been seen.

/// Find the first complete top-level JSON object in `text`, starting the
/// search at byte offset `from`.
///
/// Returns the object's byte span `(start, end_exclusive)`, or `None`
/// when no opening brace exists or the object is still incomplete
/// (truncated/streaming input).
pub fn find_json_object(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = text[from.min(text.len())..].find('{')? + from;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }

    // Ran out of input with unbalanced braces: incomplete object.
    None
}

/// Extract and deserialize the first complete JSON object at or after
/// `from`. Malformed-but-balanced candidates return `None` rather than
/// an error.
pub fn extract_json_object(text: &str, from: usize) -> Option<(serde_json::Value, usize)> {
    let (start, end) = find_json_object(text, from)?;
    let value: serde_json::Value = serde_json::from_str(&text[start..end]).ok()?;
    Some((value, end))
}
