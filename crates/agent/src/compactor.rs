//! Context compaction: bounded history, bounded tool results.
//!
//! Two mechanisms keep a long run inside the model's context window:
//!
//! - **Message-count compaction** — past a threshold, everything except
//!   the most recent K messages collapses into one synthetic summary
//!   retaining tool names invoked, files touched, and outcomes.
//! - **Large-result eviction** — a tool result past the size cutoff is
//!   parked in a scratch store and replaced in-history by a preview
//!   plus a retrieval hint.
//!
//! Summaries are extractive and deterministic — no model call, so
//! compaction cannot fail on transport. If extraction somehow yields
//! nothing, raw truncation is the fallback.

use codewright_core::{History, Message, Role};
use std::collections::HashMap;
use tracing::debug;

/// Side-channel storage for evicted tool results.
#[derive(Debug, Default)]
pub struct ScratchStore {
    entries: HashMap<String, String>,
}

impl ScratchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park content and get back its retrieval key.
    pub fn store(&mut self, content: String) -> String {
        let key = format!("scratch-{}", &uuid::Uuid::new_v4().to_string()[..8]);
        self.entries.insert(key.clone(), content);
        key
    }

    /// Retrieve previously parked content.
    pub fn retrieve(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a compaction pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    pub messages_before: usize,
    pub messages_after: usize,
}

/// Compacts run history and evicts oversized tool results.
#[derive(Debug, Clone)]
pub struct ContextCompactor {
    /// History length above which compaction triggers.
    compact_threshold: usize,
    /// Recent messages kept verbatim.
    keep_recent: usize,
    /// Result size above which content is evicted.
    evict_over_chars: usize,
    /// Inline preview length for an evicted result.
    preview_chars: usize,
}

impl ContextCompactor {
    pub fn new(
        compact_threshold: usize,
        keep_recent: usize,
        evict_over_chars: usize,
        preview_chars: usize,
    ) -> Self {
        Self {
            compact_threshold,
            keep_recent,
            evict_over_chars,
            preview_chars,
        }
    }

    /// Compact the history in place when it exceeds the threshold.
    /// The most recent K messages always survive verbatim.
    pub fn compact(&self, history: &mut History) -> Option<CompactionReport> {
        if history.len() <= self.compact_threshold {
            return None;
        }

        let before = history.len();
        let keep_from = before - self.keep_recent;
        let collapsed: Vec<Message> = history.messages.drain(..keep_from).collect();

        let mut summary = summarize_messages(&collapsed);
        if summary.is_empty() {
            // Extraction found nothing usable: truncate instead.
            summary = collapsed
                .iter()
                .map(|m| m.content.chars().take(80).collect::<String>())
                .collect::<Vec<_>>()
                .join(" | ");
            summary.truncate(2_000);
        }

        history.messages.insert(
            0,
            Message::system(format!(
                "[Summary of {} earlier messages]\n{summary}",
                collapsed.len()
            )),
        );

        let report = CompactionReport {
            messages_before: before,
            messages_after: history.len(),
        };
        debug!(before = report.messages_before, after = report.messages_after, "compacted history");
        Some(report)
    }

    /// If a tool result is oversized, park it in the scratch store and
    /// return the in-history replacement. Small results pass through.
    pub fn evict_if_large(
        &self,
        result_text: String,
        scratch: &mut ScratchStore,
    ) -> (String, Option<String>) {
        if result_text.len() <= self.evict_over_chars {
            return (result_text, None);
        }

        let original_chars = result_text.len();
        let preview: String = result_text.chars().take(self.preview_chars).collect();
        let key = scratch.store(result_text);

        debug!(%key, original_chars, "evicted oversized tool result");
        let replacement = format!(
            "[Output too large: {original_chars} chars. Stored as {key}; \
             call read_scratch with key \"{key}\" for the full content.]\n\
             Preview (first {} chars):\n{preview}",
            self.preview_chars
        );
        (replacement, Some(key))
    }
}

/// Extract the salient facts from a slice of collapsed messages: the
/// task, the tools invoked, the files touched, and failure counts.
fn summarize_messages(messages: &[Message]) -> String {
    let mut parts = Vec::new();

    if let Some(first_user) = messages.iter().find(|m| m.role == Role::User) {
        let task: String = first_user.content.chars().take(200).collect();
        parts.push(format!("Task: {task}"));
    }

    let mut tools = Vec::new();
    for message in messages {
        for call in &message.tool_calls {
            if !tools.contains(&call.name) {
                tools.push(call.name.clone());
            }
        }
    }
    if !tools.is_empty() {
        parts.push(format!("Tools used: {}", tools.join(", ")));
    }

    let mut paths = Vec::new();
    for message in messages {
        for call in &message.tool_calls {
            if let Ok(args) = serde_json::from_str::<serde_json::Value>(&call.arguments)
                && let Some(path) = args["path"].as_str()
                && !paths.contains(&path.to_string())
            {
                paths.push(path.to_string());
            }
        }
    }
    if !paths.is_empty() {
        parts.push(format!("Files touched: {}", paths.join(", ")));
    }

    let failures = messages
        .iter()
        .filter(|m| m.role == Role::Tool && m.content.starts_with("Error"))
        .count();
    let observations = messages.iter().filter(|m| m.role == Role::Tool).count();
    if observations > 0 {
        parts.push(format!(
            "{observations} tool results ({failures} failed)"
        ));
    }

    if let Some(last_assistant) = messages.iter().rev().find(|m| m.role == Role::Assistant) {
        let text: String = last_assistant.content.chars().take(200).collect();
        if !text.is_empty() {
            parts.push(format!("Last assistant note: {text}"));
        }
    }

    parts.join("\n")
}
