//! Registry of live repository handles, one per workspace

use std::sync::Arc;

use dashmap::DashMap;
use docstore_fs::{PathResolver, WorkspaceKey};

use crate::handle::{self, CommitId, EnsureOutcome, PullOutcome, RepoHandle, StateSlot};
use crate::remote::{RemoteConfig, SyncOptions};
use crate::{Error, Result};

/// Concurrency-safe map from workspace to its repository handle.
///
/// Map guards live only for a single insert, remove or lookup. Clone, pull,
/// commit and push run on a handle obtained from the map, never while a
/// shard is locked, so unrelated workspaces never wait on each other.
///
/// Each workspace also owns a state slot that outlives individual handles.
/// A handle created by re-enabling sync shares the slot of the one it
/// replaces, which keeps every sync operation on one working tree
/// serialized even while an old handle is still in use.
pub struct RepoRegistry {
    resolver: PathResolver,
    options: SyncOptions,
    handles: DashMap<WorkspaceKey, Arc<RepoHandle>>,
    slots: DashMap<WorkspaceKey, StateSlot>,
}

impl RepoRegistry {
    pub fn new(resolver: PathResolver, options: SyncOptions) -> Self {
        Self {
            resolver,
            options,
            handles: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Bind a workspace to a remote and bring its clone up to date.
    ///
    /// The handle is registered only once [`RepoHandle::ensure_repo`]
    /// succeeds; on failure nothing is registered and any previous handle
    /// for the workspace stays in place.
    pub fn enable(&self, key: WorkspaceKey, remote: RemoteConfig) -> Result<EnsureOutcome> {
        let slot = Arc::clone(
            self.slots
                .entry(key)
                .or_insert_with(handle::new_slot)
                .value(),
        );
        let work_dir = self.resolver.workspace_root(key);
        let url = remote.url.clone();
        let handle = RepoHandle::with_slot(key, work_dir, remote, self.options, slot);

        let outcome = match handle.ensure_repo() {
            Ok(outcome) => outcome,
            Err(err) => {
                drop(handle);
                self.release_slot(key);
                return Err(err);
            }
        };
        let replaced = self.handles.insert(key, Arc::new(handle)).is_some();

        tracing::info!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            url = %url,
            replaced,
            outcome = ?outcome,
            "Enabled git sync"
        );
        Ok(outcome)
    }

    /// Unregister the workspace's handle. Returns whether one was present.
    ///
    /// Idempotent. The clone on disk is left alone.
    pub fn disable(&self, key: WorkspaceKey) -> bool {
        let removed = self.handles.remove(&key).is_some();
        self.release_slot(key);

        if removed {
            tracing::info!(
                tenant = key.tenant_id,
                workspace = key.workspace_id,
                "Disabled git sync"
            );
        }
        removed
    }

    /// Drop the workspace's state slot unless a handle still holds it.
    fn release_slot(&self, key: WorkspaceKey) {
        self.slots
            .remove_if(&key, |_, slot| Arc::strong_count(slot) == 1);
    }

    pub fn get(&self, key: WorkspaceKey) -> Option<Arc<RepoHandle>> {
        self.handles.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Like [`get`](Self::get), reporting absence as [`Error::NotConfigured`].
    pub fn handle(&self, key: WorkspaceKey) -> Result<Arc<RepoHandle>> {
        self.get(key).ok_or(Error::NotConfigured { key })
    }

    pub fn contains(&self, key: WorkspaceKey) -> bool {
        self.handles.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn pull(&self, key: WorkspaceKey) -> Result<PullOutcome> {
        self.handle(key)?.pull()
    }

    pub fn commit(&self, key: WorkspaceKey, message: &str) -> Result<CommitId> {
        self.handle(key)?.commit(message)
    }

    pub fn push(&self, key: WorkspaceKey) -> Result<()> {
        self.handle(key)?.push()
    }

    pub fn commit_and_push(&self, key: WorkspaceKey, message: &str) -> Result<CommitId> {
        self.handle(key)?.commit_and_push(message)
    }
}

impl std::fmt::Debug for RepoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoRegistry")
            .field("root", &self.resolver.root())
            .field("options", &self.options)
            .field("handles", &self.handles.len())
            .finish()
    }
}
