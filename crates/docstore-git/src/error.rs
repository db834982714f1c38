//! Error types for docstore-git

use std::path::PathBuf;

use docstore_fs::WorkspaceKey;

/// Result type for docstore-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docstore-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No handle is registered for the workspace
    #[error("Git sync is not configured for workspace {key}")]
    NotConfigured { key: WorkspaceKey },

    /// Clone, fetch or push against the remote failed
    #[error("Git {operation} failed for {url}: {message}")]
    Transport {
        operation: &'static str,
        url: String,
        message: String,
    },

    #[error("Repository at {work_dir} is not initialized")]
    NotInitialized { work_dir: PathBuf },

    #[error("HEAD is detached in {work_dir}")]
    DetachedHead { work_dir: PathBuf },

    #[error("Pulling '{branch}' produced conflicts. Manual merge required.")]
    MergeConflict { branch: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl Error {
    /// Whether the error came from talking to the remote.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
