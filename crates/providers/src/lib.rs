//! Model backend clients for Codewright.
//!
//! One HTTP client covers every OpenAI-compatible endpoint; capability
//! differences (structured tool calling vs. free-text only) are
//! expressed through [`codewright_core::ModelClient::supports_tool_calls`]
//! and the [`manual`] catalog-injection wrapper, not through separate
//! control loops.

pub mod manual;
pub mod openai_compat;

pub use manual::{ManualToolCallClient, render_catalog_prompt};
pub use openai_compat::OpenAiCompatClient;
