//! Tier 2 — canonical call syntax for an allow-listed tool set.
//!
//! Recovers calls written as function invocations in prose:
//!
//! ```text
//! read_file("src/main.rs")
//! write_file(path="notes.txt", content="hello")
//! ```
//!
//! Only the tools in [`CALL_TOOLS`] are recognized; each entry names the
//! positional parameter order. Argument lists are parsed with a
//! quote-aware cursor (parentheses and commas inside string literals do
//! not terminate the list), not a regex.

use codewright_core::ToolCall;

/// Allow-listed tools and their positional parameter names.
pub const CALL_TOOLS: &[(&str, &[&str])] = &[
    ("read_file", &["path"]),
    ("write_file", &["path", "content"]),
    ("list_files", &["path"]),
    ("search_files", &["pattern", "path"]),
    ("run_command", &["command"]),
];

/// Extract every recognized call-syntax invocation, in order.
pub fn extract(text: &str) -> Vec<ToolCall> {
    let mut found: Vec<(usize, ToolCall)> = Vec::new();

    for &(tool, params) in CALL_TOOLS {
        let mut cursor = 0usize;
        while let Some(rel) = text[cursor..].find(tool) {
            let at = cursor + rel;
            cursor = at + tool.len();

            // Must be a standalone identifier followed by '('
            if at > 0 {
                let prev = text[..at].chars().next_back().unwrap();
                if prev.is_alphanumeric() || prev == '_' || prev == '.' {
                    continue;
                }
            }
            let rest = &text[at + tool.len()..];
            let Some(after_paren) = rest.strip_prefix('(') else {
                continue;
            };

            if let Some((args, consumed)) = parse_argument_list(after_paren) {
                cursor = at + tool.len() + 1 + consumed;
                if let Some(call) = bind_arguments(tool, params, args) {
                    found.push((at, call));
                }
            }
        }
    }

    // Restore textual order across tools.
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, call)| call).collect()
}

/// A single parsed argument: positional or `key=value`.
enum Arg {
    Positional(String),
    Keyword(String, String),
}

/// Parse a parenthesized argument list starting just after `(`.
/// Returns the arguments and the number of bytes consumed including the
/// closing `)`, or `None` if the list never closes or is malformed.
fn parse_argument_list(text: &str) -> Option<(Vec<Arg>, usize)> {
    let mut args = Vec::new();
    let mut pos = 0usize;
    let bytes = text.as_bytes();

    loop {
        pos = skip_whitespace(text, pos);
        match bytes.get(pos)? {
            b')' => return Some((args, pos + 1)),
            b'"' | b'\'' => {
                let (value, next) = parse_string_literal(text, pos)?;
                args.push(Arg::Positional(value));
                pos = skip_separator(text, next)?;
            }
            _ => {
                // Expect `ident = "value"`
                let ident_end = text[pos..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .map(|o| pos + o)?;
                let key = text[pos..ident_end].to_string();
                if key.is_empty() {
                    return None;
                }
                let mut p = skip_whitespace(text, ident_end);
                if bytes.get(p) != Some(&b'=') {
                    return None;
                }
                p = skip_whitespace(text, p + 1);
                let (value, next) = parse_string_literal(text, p)?;
                args.push(Arg::Keyword(key, value));
                pos = skip_separator(text, next)?;
            }
        }
    }
}

/// Parse a quoted string literal at `pos`, honoring backslash escapes.
/// Returns the unescaped value and the position just past the closing
/// quote.
fn parse_string_literal(text: &str, pos: usize) -> Option<(String, usize)> {
    let mut chars = text[pos..].char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }

    let mut value = String::new();
    let mut escaped = false;
    for (offset, c) in chars {
        if escaped {
            match c {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                other => value.push(other),
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some((value, pos + offset + c.len_utf8()));
        } else {
            value.push(c);
        }
    }
    None
}

fn skip_whitespace(text: &str, pos: usize) -> usize {
    pos + text[pos..].len() - text[pos..].trim_start().len()
}

/// After an argument: expect `,` (consume it) or `)` (leave it).
fn skip_separator(text: &str, pos: usize) -> Option<usize> {
    let pos = skip_whitespace(text, pos);
    match text.as_bytes().get(pos)? {
        b',' => Some(pos + 1),
        b')' => Some(pos),
        _ => None,
    }
}

/// Bind parsed arguments to the tool's parameter names.
fn bind_arguments(tool: &str, params: &[&str], args: Vec<Arg>) -> Option<ToolCall> {
    let mut map = serde_json::Map::new();
    let mut positional = 0usize;

    for arg in args {
        match arg {
            Arg::Positional(value) => {
                let name = params.get(positional)?;
                map.insert(name.to_string(), serde_json::Value::String(value));
                positional += 1;
            }
            Arg::Keyword(key, value) => {
                if !params.contains(&key.as_str()) {
                    return None;
                }
                map.insert(key, serde_json::Value::String(value));
            }
        }
    }

    if map.is_empty() {
        return None;
    }
    Some(ToolCall::new(tool, serde_json::Value::Object(map)))
}
