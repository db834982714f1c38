//! Workspace storage and git sync engine for the document store
//!
//! [`DocumentStore`] ties the sandboxed file layer ([`docstore_fs`]) to the
//! per-workspace repository registry ([`docstore_git`]) and is what the
//! workspace lifecycle manager and the HTTP layer talk to.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::StorageConfig;
pub use error::{Error, ErrorKind, Result};
pub use storage::DocumentStore;

pub use docstore_fs::{FileNode, FileStats, WorkspaceKey};
pub use docstore_git::{
    Author, CommitId, Credentials, EnsureOutcome, PullOutcome, RemoteConfig, SyncOptions,
};
