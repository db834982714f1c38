//! Error types for docstore-fs

use std::path::PathBuf;

/// Result type for docstore-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docstore-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested path normalizes outside its workspace root
    #[error("Path '{path}' escapes workspace root {root}")]
    PathEscape { root: PathBuf, path: String },

    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// A name search walked the whole workspace without a hit
    #[error("No file named '{name}' under {root}")]
    NoMatches { name: String, root: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error, classifying "not found" separately.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoMatches { .. })
    }
}
