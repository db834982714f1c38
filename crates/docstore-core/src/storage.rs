//! The storage engine entry point

use std::path::PathBuf;

use docstore_fs::{FileStore, WorkspaceKey};
use docstore_git::{CommitId, EnsureOutcome, PullOutcome, RemoteConfig, RepoRegistry};

use crate::{Result, StorageConfig};

/// Workspace files plus their remote sync handles under one storage root.
///
/// Shared by reference across request threads; every method takes `&self`.
#[derive(Debug)]
pub struct DocumentStore {
    files: FileStore,
    repos: RepoRegistry,
}

impl DocumentStore {
    /// Open the store, creating the storage root if it does not exist.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let files = FileStore::open(&config.root_dir)?;
        let repos = RepoRegistry::new(files.resolver().clone(), config.sync_options());
        tracing::info!(
            root = %files.resolver().root().display(),
            remote_timeout_secs = config.remote_timeout_secs,
            "Opened document store"
        );
        Ok(Self { files, repos })
    }

    /// Sandboxed file operations.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Live remote sync handles.
    pub fn repos(&self) -> &RepoRegistry {
        &self.repos
    }

    /// Create the workspace's root directory. Idempotent.
    pub fn provision_workspace(&self, key: WorkspaceKey) -> Result<PathBuf> {
        Ok(self.files.initialize_workspace(key)?)
    }

    /// Stop syncing the workspace, then delete everything it stores.
    pub fn remove_workspace(&self, key: WorkspaceKey) -> Result<()> {
        self.repos.disable(key);
        self.files.delete_workspace(key)?;
        Ok(())
    }

    /// Bind the workspace to a remote, cloning or refreshing its content.
    pub fn enable_sync(&self, key: WorkspaceKey, remote: RemoteConfig) -> Result<EnsureOutcome> {
        self.files.initialize_workspace(key)?;
        Ok(self.repos.enable(key, remote)?)
    }

    /// Stop syncing the workspace. The local clone stays on disk.
    pub fn disable_sync(&self, key: WorkspaceKey) -> bool {
        self.repos.disable(key)
    }

    pub fn pull(&self, key: WorkspaceKey) -> Result<PullOutcome> {
        Ok(self.repos.pull(key)?)
    }

    pub fn commit_and_push(&self, key: WorkspaceKey, message: &str) -> Result<CommitId> {
        Ok(self.repos.commit_and_push(key, message)?)
    }
}
