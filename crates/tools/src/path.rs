//! Workspace path confinement.
//!
//! Every file tool resolves its paths through a [`Workspace`], which
//! pins them under a single root directory. Traversal sequences,
//! absolute paths outside the root, and symlink escapes are all
//! rejected before any filesystem access happens.

use codewright_core::ToolError;
use std::path::{Path, PathBuf};

/// The single directory all relative tool paths resolve against.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`. The root is canonicalized
    /// once so later prefix checks compare resolved paths.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into().canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the
    /// workspace, or reject it.
    ///
    /// Checks, in order:
    /// 1. No traversal sequences in the raw string.
    /// 2. Absolute paths must already point under the root.
    /// 3. The resolved path (canonicalized when it exists, otherwise
    ///    its nearest existing ancestor) stays under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let normalized = path.replace('\\', "/");
        if normalized.contains("../") || normalized.ends_with("/..") || normalized == ".." {
            return Err(ToolError::OutsideWorkspace(path.into()));
        }

        let candidate = if Path::new(&normalized).is_absolute() {
            PathBuf::from(&normalized)
        } else {
            self.root.join(&normalized)
        };

        // Canonicalize the deepest existing ancestor so symlinks cannot
        // smuggle the path out of the root.
        let resolved = if candidate.exists() {
            candidate
                .canonicalize()
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "path".into(),
                    reason: e.to_string(),
                })?
        } else if let Some(parent) = candidate.parent()
            && parent.exists()
        {
            let canonical_parent =
                parent
                    .canonicalize()
                    .map_err(|e| ToolError::ExecutionFailed {
                        tool_name: "path".into(),
                        reason: e.to_string(),
                    })?;
            canonical_parent.join(candidate.file_name().unwrap_or_default())
        } else {
            candidate
        };

        if !resolved.starts_with(&self.root) {
            return Err(ToolError::OutsideWorkspace(path.into()));
        }

        Ok(resolved)
    }

    /// A path relative to the root, for display in tool output.
    pub fn display_path<'a>(&self, absolute: &'a Path) -> &'a Path {
        absolute.strip_prefix(&self.root).unwrap_or(absolute)
    }
}
