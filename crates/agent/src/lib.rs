//! # Codewright Agent
//!
//! The orchestration layer: the THINK–ACT–OBSERVE control loop and the
//! mechanisms that keep it honest on small local models.
//!
//! - [`controller`] — the loop itself: one loop for every backend,
//!   policy enforcement, observation plumbing
//! - [`loop_detect`] — repeat/oscillation/read-only-stall detection
//!   over normalized action keys
//! - [`compactor`] — history compaction and large-result eviction
//! - [`oracle`] — heuristic and model-backed completion checking
//! - [`nudge`] — corrective guidance text and framework hint tables
//! - [`subagent`] — delegation to nested runs with fresh state
//!
//! The [`test_helpers`] module ships scripted backends so downstream
//! crates can exercise the loop without a live endpoint.

pub mod compactor;
pub mod controller;
pub mod loop_detect;
pub mod nudge;
pub mod oracle;
pub mod subagent;
pub mod test_helpers;

pub use compactor::{CompactionReport, ContextCompactor, ScratchStore};
pub use controller::{AgentLoopController, RunOutcome, StopReason};
pub use loop_detect::{LoopDetector, LoopKind, normalize_key};
pub use oracle::TaskCompletionOracle;
pub use subagent::{DelegateTool, GENERAL_PURPOSE, SubagentRegistry, SubagentRunner, SubagentSpec};
