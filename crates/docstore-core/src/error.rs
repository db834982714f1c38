//! Error types for docstore-core

use std::path::PathBuf;

/// Result type for docstore-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docstore-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file has an extension no loader handles
    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// Configuration file could not be read
    #[error("Failed to read config at {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from docstore-fs
    #[error(transparent)]
    Fs(#[from] docstore_fs::Error),

    /// Git error from docstore-git
    #[error(transparent)]
    Git(#[from] docstore_git::Error),
}

/// Coarse error categories the HTTP layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path resolved outside its workspace
    PathEscape,
    NotFound,
    /// No remote sync handle exists for the workspace
    GitNotConfigured,
    /// Clone, fetch or push against the remote failed
    GitTransport,
    /// Local repository failure: not initialized, merge conflict, corrupt index
    Git,
    Io,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } | Self::ConfigParse { .. } | Self::ConfigRead { .. } => {
                ErrorKind::Config
            }
            Self::Fs(err) => match err {
                docstore_fs::Error::PathEscape { .. } => ErrorKind::PathEscape,
                docstore_fs::Error::NotFound { .. } | docstore_fs::Error::NoMatches { .. } => {
                    ErrorKind::NotFound
                }
                docstore_fs::Error::Io { .. } => ErrorKind::Io,
            },
            Self::Git(err) => match err {
                docstore_git::Error::NotConfigured { .. } => ErrorKind::GitNotConfigured,
                docstore_git::Error::Transport { .. } => ErrorKind::GitTransport,
                _ => ErrorKind::Git,
            },
        }
    }
}
