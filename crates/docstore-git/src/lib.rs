//! Per-workspace git synchronization for the document store
//!
//! A [`RepoHandle`] binds one workspace directory to its remote repository and
//! serializes clone, pull, commit and push against it. The [`RepoRegistry`]
//! owns every live handle, keyed by workspace.

pub mod commits;
pub mod error;
pub mod handle;
pub mod registry;
pub mod remote;

pub use commits::CommitInfo;
pub use error::{Error, Result};
pub use handle::{CommitId, EnsureOutcome, PullOutcome, RepoHandle, SyncState};
pub use registry::RepoRegistry;
pub use remote::{Author, Credentials, RemoteConfig, SyncOptions};
