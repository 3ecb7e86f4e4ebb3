//! Per-run agent state — the scratchpad for a single task lifecycle.
//!
//! Everything mutable about a run lives here and is threaded through the
//! control loop explicitly: the reasoning trace, the files touched, the
//! accumulated errors, and the bounded ring of recent actions that loop
//! detection reads. One `AgentState` per run; subagent runs own an
//! independent one and never share or merge with the parent's.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// The control-loop phase a step hands off to next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Ask the model to reason about what to do
    Think,
    /// Execute the model's requested tool calls
    Act,
    /// Check whether the task looks satisfied
    Verify,
    /// Terminal
    Complete,
}

/// One think–act–observe step in the reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// The model's reasoning text for this step
    pub thought: String,

    /// The action taken, if any (rendered as "tool(args)")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// What the action produced
    pub observation: String,

    /// Where the loop goes next
    pub next_phase: Phase,
}

/// A recent action, normalized for loop detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Normalized key: tool name + argument signature with volatile
    /// tokens (timestamps, UUIDs) stripped.
    pub key: String,

    /// Whether the tool can mutate workspace state.
    pub mutating: bool,

    /// Whether the execution succeeded.
    pub success: bool,
}

/// Runtime state of a single agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The task text this run is working on
    pub task: String,

    /// Ordered reasoning trace
    pub steps: Vec<ReasoningStep>,

    /// Files the run has read
    pub files_read: HashSet<String>,

    /// Files the run has created or modified
    pub files_modified: HashSet<String>,

    /// Errors accumulated across tool executions
    pub errors: Vec<String>,

    /// Successful mutating actions with no file path to attribute
    /// (shell commands, delegation)
    #[serde(default)]
    pub unnamed_mutations: u32,

    /// Bounded ring of recent normalized actions
    pub recent_actions: VecDeque<ActionRecord>,

    /// Capacity of the recent-action ring
    ring_capacity: usize,
}

impl AgentState {
    /// Create state for a new run.
    pub fn new(task: impl Into<String>, ring_capacity: usize) -> Self {
        Self {
            task: task.into(),
            steps: Vec::new(),
            files_read: HashSet::new(),
            files_modified: HashSet::new(),
            errors: Vec::new(),
            unnamed_mutations: 0,
            recent_actions: VecDeque::with_capacity(ring_capacity),
            ring_capacity,
        }
    }

    /// Record a reasoning step.
    pub fn record_step(&mut self, step: ReasoningStep) {
        self.steps.push(step);
    }

    /// Record a recent action, evicting the oldest past capacity.
    pub fn record_action(&mut self, action: ActionRecord) {
        if self.recent_actions.len() == self.ring_capacity {
            self.recent_actions.pop_front();
        }
        self.recent_actions.push_back(action);
    }

    /// Record a file access.
    pub fn record_read(&mut self, path: impl Into<String>) {
        self.files_read.insert(path.into());
    }

    /// Record a file mutation.
    pub fn record_mutation(&mut self, path: impl Into<String>) {
        self.files_modified.insert(path.into());
    }

    /// Record a mutation that has no file path to attribute.
    pub fn record_unnamed_mutation(&mut self) {
        self.unnamed_mutations += 1;
    }

    /// Record a tool error.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Whether any successful mutation has been recorded.
    pub fn has_mutations(&self) -> bool {
        !self.files_modified.is_empty() || self.unnamed_mutations > 0
    }

    /// Reset before reuse on a new task. The ring capacity survives.
    pub fn reset(&mut self, task: impl Into<String>) {
        self.task = task.into();
        self.steps.clear();
        self.files_read.clear();
        self.files_modified.clear();
        self.errors.clear();
        self.unnamed_mutations = 0;
        self.recent_actions.clear();
    }

    /// Brief run summary (tool outcomes, files touched) for compaction
    /// and subagent reporting.
    pub fn summarize(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("{} reasoning steps", self.steps.len()));
        if !self.files_read.is_empty() {
            let mut read: Vec<&str> = self.files_read.iter().map(|s| s.as_str()).collect();
            read.sort_unstable();
            parts.push(format!("read: {}", read.join(", ")));
        }
        if !self.files_modified.is_empty() {
            let mut modified: Vec<&str> =
                self.files_modified.iter().map(|s| s.as_str()).collect();
            modified.sort_unstable();
            parts.push(format!("modified: {}", modified.join(", ")));
        }
        if self.unnamed_mutations > 0 {
            parts.push(format!("{} mutating commands", self.unnamed_mutations));
        }
        if !self.errors.is_empty() {
            parts.push(format!("{} errors", self.errors.len()));
        }
        parts.join("; ")
    }
}
