//! Loop and stall detection over the recent-action ring.
//!
//! The detector never aborts a run by itself: on a positive detection
//! the controller consults the completion oracle and injects a
//! corrective instruction, because "doing the same thing repeatedly"
//! sometimes just means the task is already done.

use codewright_core::ActionRecord;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// What kind of repetition was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopKind {
    /// The same action repeated k or more times in a row.
    Repeat { key: String, count: usize },
    /// Two actions alternating ABAB.
    Oscillation { first: String, second: String },
    /// A full window of read-only calls with no mutation anywhere.
    ReadOnlyStall,
}

impl LoopKind {
    /// Short label for events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            LoopKind::Repeat { .. } => "repeat",
            LoopKind::Oscillation { .. } => "oscillation",
            LoopKind::ReadOnlyStall => "read-only-stall",
        }
    }
}

/// Detects action loops within a sliding window.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    /// Ring size a stall verdict requires.
    window: usize,
    /// Consecutive identical actions that count as a loop.
    repeat_threshold: usize,
}

impl LoopDetector {
    pub fn new(window: usize, repeat_threshold: usize) -> Self {
        Self {
            window,
            repeat_threshold,
        }
    }

    /// Inspect the recent-action ring. Returns the strongest signal
    /// found, or `None`.
    pub fn detect(&self, recent: &VecDeque<ActionRecord>) -> Option<LoopKind> {
        if let Some(kind) = self.detect_repeat(recent) {
            return Some(kind);
        }
        if let Some(kind) = self.detect_oscillation(recent) {
            return Some(kind);
        }
        self.detect_stall(recent)
    }

    fn detect_repeat(&self, recent: &VecDeque<ActionRecord>) -> Option<LoopKind> {
        if recent.len() < self.repeat_threshold {
            return None;
        }
        let last = &recent[recent.len() - 1].key;
        let run = recent
            .iter()
            .rev()
            .take_while(|action| &action.key == last)
            .count();
        if run >= self.repeat_threshold {
            return Some(LoopKind::Repeat {
                key: last.clone(),
                count: run,
            });
        }
        None
    }

    /// Period-2 oscillation: the last four actions form ABAB, A != B.
    fn detect_oscillation(&self, recent: &VecDeque<ActionRecord>) -> Option<LoopKind> {
        if recent.len() < 4 {
            return None;
        }
        let n = recent.len();
        let (a, b) = (&recent[n - 4].key, &recent[n - 3].key);
        if a != b && &recent[n - 2].key == a && &recent[n - 1].key == b {
            return Some(LoopKind::Oscillation {
                first: a.clone(),
                second: b.clone(),
            });
        }
        None
    }

    /// A window's worth of actions, none of them mutating: the run is
    /// reading in circles.
    fn detect_stall(&self, recent: &VecDeque<ActionRecord>) -> Option<LoopKind> {
        if recent.len() >= self.window && recent.iter().all(|action| !action.mutating) {
            return Some(LoopKind::ReadOnlyStall);
        }
        None
    }
}

/// Build a normalized action key for the ring: tool name plus argument
/// signature with volatile tokens stripped, so `read_file` of the same
/// path at two different timestamps counts as the same action.
pub fn normalize_key(tool_name: &str, arguments: &serde_json::Value) -> String {
    let raw = serde_json::to_string(arguments).unwrap_or_default();
    let mut signature = raw;
    for pattern in volatile_patterns() {
        signature = pattern.replace_all(&signature, "*").into_owned();
    }
    // Long argument payloads (file contents) keep only their leading
    // slice: two writes of slightly different content to the same path
    // are still "the same action" for loop purposes.
    if signature.len() > 200 {
        let cut = signature
            .char_indices()
            .nth(120)
            .map(|(i, _)| i)
            .unwrap_or(signature.len());
        signature.truncate(cut);
        signature.push_str("...");
    }
    format!("{tool_name}({signature})")
}

fn volatile_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // ISO-8601 timestamps
            r"\d{4}-\d{2}-\d{2}[T ][\d:.]+Z?",
            // UUIDs
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
            // Long hex runs (hashes, addresses)
            r"\b[0-9a-fA-F]{12,}\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> ActionRecord {
        ActionRecord {
            key: key.into(),
            mutating: false,
            success: true,
        }
    }

    fn ring(keys: &[&str]) -> VecDeque<ActionRecord> {
        keys.iter().map(|k| record(k)).collect()
    }

    #[test]
    fn four_identical_actions_detected() {
        let detector = LoopDetector::new(8, 4);
        let recent = ring(&["A", "A", "A", "A"]);
        assert!(matches!(
            detector.detect(&recent),
            Some(LoopKind::Repeat { count: 4, .. })
        ));
    }

    #[test]
    fn three_identical_actions_not_enough() {
        let detector = LoopDetector::new(8, 4);
        let recent = ring(&["A", "A", "A"]);
        assert_eq!(detector.detect(&recent), None);
    }

    #[test]
    fn abab_oscillation_detected() {
        let detector = LoopDetector::new(8, 4);
        let recent = ring(&["A", "B", "A", "B"]);
        assert!(matches!(
            detector.detect(&recent),
            Some(LoopKind::Oscillation { .. })
        ));
    }

    #[test]
    fn abca_is_not_a_loop() {
        let detector = LoopDetector::new(8, 4);
        let recent = ring(&["A", "B", "C", "A"]);
        assert_eq!(detector.detect(&recent), None);
    }

    #[test]
    fn repeat_wins_over_oscillation_on_aaaa() {
        let detector = LoopDetector::new(8, 4);
        let recent = ring(&["X", "A", "A", "A", "A"]);
        assert!(matches!(
            detector.detect(&recent),
            Some(LoopKind::Repeat { .. })
        ));
    }

    #[test]
    fn full_read_only_window_is_a_stall() {
        let detector = LoopDetector::new(4, 4);
        let recent = ring(&["A", "B", "C", "D"]);
        assert_eq!(detector.detect(&recent), Some(LoopKind::ReadOnlyStall));
    }

    #[test]
    fn mutation_in_window_prevents_stall() {
        let detector = LoopDetector::new(4, 4);
        let mut recent = ring(&["A", "B", "C"]);
        recent.push_back(ActionRecord {
            key: "D".into(),
            mutating: true,
            success: true,
        });
        assert_eq!(detector.detect(&recent), None);
    }

    #[test]
    fn normalize_strips_timestamps_and_uuids() {
        let a = normalize_key(
            "write_file",
            &serde_json::json!({"path": "log-2026-08-23T10:11:12Z.txt"}),
        );
        let b = normalize_key(
            "write_file",
            &serde_json::json!({"path": "log-2026-08-23T10:15:47Z.txt"}),
        );
        assert_eq!(a, b);

        let c = normalize_key(
            "read_file",
            &serde_json::json!({"path": "550e8400-e29b-41d4-a716-446655440000.json"}),
        );
        let d = normalize_key(
            "read_file",
            &serde_json::json!({"path": "123e4567-e89b-12d3-a456-426614174000.json"}),
        );
        assert_eq!(c, d);
    }

    #[test]
    fn normalize_keeps_distinct_paths_distinct() {
        let a = normalize_key("read_file", &serde_json::json!({"path": "a.rs"}));
        let b = normalize_key("read_file", &serde_json::json!({"path": "b.rs"}));
        assert_ne!(a, b);
    }

    #[test]
    fn huge_arguments_truncated() {
        let content = "x".repeat(5_000);
        let key = normalize_key(
            "write_file",
            &serde_json::json!({"path": "big.txt", "content": content}),
        );
        assert!(key.len() < 200);
        assert!(key.ends_with("...)"));

        // A trailing-content difference does not change the key
        let other = "x".repeat(4_000) + "y";
        let key2 = normalize_key(
            "write_file",
            &serde_json::json!({"path": "big.txt", "content": other}),
        );
        assert_eq!(key, key2);
    }
}
