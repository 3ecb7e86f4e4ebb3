//! Configuration loading and validation for Codewright.
//!
//! Loads configuration from `~/.codewright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codewright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model identifier
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Per-request timeout for model calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Whether the endpoint supports native tool calling. When false,
    /// the tool catalog is injected into the system prompt and calls
    /// are recovered from free text.
    #[serde(default = "default_true")]
    pub native_tool_calls: bool,

    /// Run policy: iteration caps, loop thresholds, compaction limits
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Workspace settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

fn default_api_url() -> String {
    "http://localhost:11434/v1/chat/completions".into()
}
fn default_model() -> String {
    "qwen2.5-coder:14b".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("native_tool_calls", &self.native_tool_calls)
            .field("policy", &self.policy)
            .field("workspace", &self.workspace)
            .finish()
    }
}

/// Caps and thresholds governing a single agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hard cap on THINK→ACT iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget for a run, in seconds
    #[serde(default = "default_wall_clock")]
    pub wall_clock_secs: u64,

    /// Consecutive failed tool calls before the run aborts
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Sliding window of recent action keys examined for loops
    #[serde(default = "default_loop_window")]
    pub loop_window: usize,

    /// Identical consecutive actions that count as a loop
    #[serde(default = "default_loop_repeat_threshold")]
    pub loop_repeat_threshold: usize,

    /// History length above which compaction triggers
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: usize,

    /// Recent messages kept verbatim through compaction
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Tool-result size above which content is evicted to scratch
    #[serde(default = "default_evict_over_chars")]
    pub evict_over_chars: usize,

    /// Preview length kept inline for an evicted result
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Maximum length of a subagent's reply to its parent
    #[serde(default = "default_subagent_reply_cap")]
    pub subagent_reply_cap: usize,
}

fn default_max_iterations() -> u32 {
    50
}
fn default_wall_clock() -> u64 {
    300
}
fn default_max_consecutive_failures() -> u32 {
    3
}
fn default_loop_window() -> usize {
    8
}
fn default_loop_repeat_threshold() -> usize {
    4
}
fn default_compact_threshold() -> usize {
    50
}
fn default_keep_recent() -> usize {
    6
}
fn default_evict_over_chars() -> usize {
    50_000
}
fn default_preview_chars() -> usize {
    1_000
}
fn default_subagent_reply_cap() -> usize {
    2_000
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            wall_clock_secs: default_wall_clock(),
            max_consecutive_failures: default_max_consecutive_failures(),
            loop_window: default_loop_window(),
            loop_repeat_threshold: default_loop_repeat_threshold(),
            compact_threshold: default_compact_threshold(),
            keep_recent: default_keep_recent(),
            evict_over_chars: default_evict_over_chars(),
            preview_chars: default_preview_chars(),
            subagent_reply_cap: default_subagent_reply_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory tools are confined to. Empty = current directory.
    #[serde(default)]
    pub root: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { root: String::new() }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codewright/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CODEWRIGHT_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `CODEWRIGHT_API_URL`
    /// - `CODEWRIGHT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("CODEWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("CODEWRIGHT_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("CODEWRIGHT_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codewright")
    }

    /// Resolve the workspace root, defaulting to the current directory.
    pub fn workspace_root(&self) -> PathBuf {
        if self.workspace.root.is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.workspace.root)
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.policy.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "policy.max_iterations must be at least 1".into(),
            ));
        }

        if self.policy.keep_recent >= self.policy.compact_threshold {
            return Err(ConfigError::ValidationError(
                "policy.keep_recent must be below policy.compact_threshold".into(),
            ));
        }

        if self.policy.preview_chars > self.policy.evict_over_chars {
            return Err(ConfigError::ValidationError(
                "policy.preview_chars must not exceed policy.evict_over_chars".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            native_tool_calls: true,
            policy: PolicyConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
