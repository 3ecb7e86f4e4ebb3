//! Run observability events — one-way push notifications.
//!
//! Events are published when something interesting happens during a run.
//! Observers (CLI progress display, logs) subscribe and filter; events
//! carry no return value and are never part of the control contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All run events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A run started on a task
    RunStarted {
        task_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The control loop changed phase
    PhaseChanged {
        iteration: u32,
        phase: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Loop detection fired
    LoopDetected {
        pattern: String,
        timestamp: DateTime<Utc>,
    },

    /// History was compacted
    HistoryCompacted {
        messages_before: usize,
        messages_after: usize,
        timestamp: DateTime<Utc>,
    },

    /// A large tool result was evicted to the scratch store
    ResultEvicted {
        scratch_key: String,
        original_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A corrective/guidance message was injected
    GuidanceInjected {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A subagent run finished
    SubagentFinished {
        name: String,
        reply_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// The run finished
    RunFinished {
        outcome: String,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
