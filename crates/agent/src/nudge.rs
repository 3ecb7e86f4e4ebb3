//! Corrective guidance injected into a stuck or drifting run.
//!
//! Everything here is data and pure functions: keyword tables mapping
//! project frameworks to concrete next commands, a classifier for
//! generic filler replies, and the steering text the controller appends
//! as user messages. No control flow lives here.

use crate::loop_detect::LoopKind;

/// Framework keywords paired with the command a stuck run should try.
/// First match wins; probed in order against the lowercased text.
const FRAMEWORK_HINTS: &[(&str, &str)] = &[
    ("cargo", "cargo check"),
    ("rust", "cargo check"),
    ("pytest", "pytest -x"),
    ("django", "python manage.py test"),
    ("flask", "pytest -x"),
    ("python", "python -m pytest -x"),
    ("jest", "npx jest"),
    ("typescript", "npx tsc --noEmit"),
    ("react", "npm test"),
    ("node", "npm test"),
    ("npm", "npm test"),
    ("golang", "go test ./..."),
    ("go mod", "go test ./..."),
    ("make", "make test"),
];

/// Suggest a concrete verification command for the frameworks the text
/// mentions.
pub fn framework_hint(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    FRAMEWORK_HINTS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, command)| *command)
}

/// Stock filler phrases that mark a reply as generic rather than a real
/// answer to the task.
const FILLER_PHRASES: &[&str] = &[
    "let me know",
    "feel free to",
    "how can i help",
    "is there anything else",
    "happy to help",
    "if you have any questions",
    "i'm here to help",
    "what would you like",
];

/// Whether an assistant reply is generic filler: short, no tool calls
/// behind it, and leaning on stock phrases instead of task content.
pub fn is_generic_reply(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.len() > 400 {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    FILLER_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Steering message for a detected loop, naming the repetition so the
/// model can break out of it.
pub fn loop_nudge(kind: &LoopKind, task: &str) -> String {
    let diagnosis = match kind {
        LoopKind::Repeat { key, count } => {
            format!("You have repeated the same action {count} times in a row: {key}.")
        }
        LoopKind::Oscillation { first, second } => {
            format!("You are alternating between two actions without progress: {first} and {second}.")
        }
        LoopKind::ReadOnlyStall => {
            "Your recent actions are all read-only; nothing has changed in the workspace.".into()
        }
    };
    let hint = match framework_hint(task) {
        Some(command) => format!(" If you need to verify your work, try `{command}`."),
        None => String::new(),
    };
    format!(
        "{diagnosis} Stop repeating it. Either take a different action that moves \
         the task forward, or state your final answer.{hint}"
    )
}

/// Steering message after a generic filler reply on an early iteration.
pub fn generic_reply_nudge(task: &str) -> String {
    format!(
        "That was not an answer to the task. The task is: {task}\n\
         Use the available tools to work on it, or give a concrete final answer."
    )
}

/// Steering message after an idempotent "already exists" failure: the
/// goal state already holds, so move on instead of retrying.
pub fn already_satisfied_nudge(observation: &str) -> String {
    format!(
        "The previous step was already satisfied ({observation}). \
         Treat it as done and continue with the next step of the task."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_hints_match() {
        assert_eq!(framework_hint("fix the Cargo.toml"), Some("cargo check"));
        assert_eq!(framework_hint("the pytest suite fails"), Some("pytest -x"));
        assert_eq!(framework_hint("bump the npm dependency"), Some("npm test"));
        assert_eq!(framework_hint("tidy the prose in README"), None);
    }

    #[test]
    fn generic_replies_classified() {
        assert!(is_generic_reply("Let me know if you need anything else!"));
        assert!(is_generic_reply(""));
        assert!(is_generic_reply("How can I help you today?"));
        assert!(!is_generic_reply(
            "The bug is in parse_hunk_start: it reads the old range where it should read the new one."
        ));
        // long answers are never filler even if polite at the end
        let long = format!("{} let me know if you have questions", "analysis ".repeat(50));
        assert!(!is_generic_reply(&long));
    }

    #[test]
    fn loop_nudge_names_the_pattern() {
        let nudge = loop_nudge(
            &LoopKind::Repeat {
                key: "read_file({\"path\":\"a.rs\"})".into(),
                count: 4,
            },
            "fix the rust build",
        );
        assert!(nudge.contains("4 times"));
        assert!(nudge.contains("a.rs"));
        assert!(nudge.contains("cargo check"));
    }

    #[test]
    fn stall_nudge_mentions_read_only() {
        let nudge = loop_nudge(&LoopKind::ReadOnlyStall, "tidy the prose");
        assert!(nudge.contains("read-only"));
        assert!(!nudge.contains('`'));
    }
}
