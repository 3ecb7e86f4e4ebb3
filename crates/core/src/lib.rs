//! # Codewright Core
//!
//! Domain types, traits, and error definitions for the Codewright
//! coding-agent orchestration engine. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem seam is a trait here: the model backend is a
//! [`ModelClient`], tool dispatch is a [`ToolExecutor`]. Implementations
//! live in their respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with scripted/mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod state;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ModelError, RegistryError, Result, ToolError};
pub use event::{AgentEvent, EventBus};
pub use message::{History, Message, Role, ToolCallRequest};
pub use model::{ModelClient, ModelRequest, ModelResponse, TokenUsage};
pub use state::{ActionRecord, AgentState, Phase, ReasoningStep};
pub use tool::{Tool, ToolCall, ToolCatalog, ToolExecutor, ToolResult, ToolSpec};
