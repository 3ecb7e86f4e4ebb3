//! Error types for the Codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Codewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Subagent registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the model backend.
///
/// Transport failures classify distinctly so the run log tells the
/// operator exactly what to fix: a wrong URL path, a service that is
/// down, a bad hostname, or a slow endpoint.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Endpoint not found at {url} — check the base URL path")]
    EndpointNotFound { url: String },

    #[error("Connection refused by {host} — is the model server running?")]
    ConnectionRefused { host: String },

    #[error("Cannot resolve host '{host}' — check the endpoint hostname")]
    HostUnresolvable { host: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// Whether this error should terminate the run.
    ///
    /// All transport-class failures are fatal; the loop has no way to
    /// make progress without a reachable backend.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ModelError::MalformedResponse(_))
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name} — {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Path escapes workspace root: {0}")]
    OutsideWorkspace(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Errors from the subagent descriptor registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Subagent name '{0}' is reserved and cannot be overwritten")]
    NameConflict(String),

    #[error("No subagent registered under '{0}'")]
    UnknownSubagent(String),
}
