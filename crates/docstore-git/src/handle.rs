//! Sync operations bound to one workspace repository

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docstore_fs::WorkspaceKey;
use docstore_fs::constants::StorePath;
use docstore_fs::io;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Commit, ErrorCode, FetchOptions, IndexAddOption, IndexMatchedPath, Oid, PushOptions,
    Repository, Signature,
};

use crate::commits::{self, CommitInfo};
use crate::remote::{self, Deadline, REMOTE_NAME, RemoteConfig, SyncOptions};
use crate::{Error, Result};

/// Identifier of a commit created by [`RepoHandle::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(Oid);

impl CommitId {
    pub fn oid(&self) -> Oid {
        self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Ready,
}

/// What [`RepoHandle::ensure_repo`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// No local clone existed; the remote was cloned
    Cloned,
    /// An existing clone was opened and pulled
    Opened(PullOutcome),
}

/// Result of a successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForward,
    Merged,
}

pub(crate) enum RepoState {
    Uninitialized,
    Ready(Repository),
}

/// Slot holding the open repository of one workspace.
///
/// Shared by successive handles of the same workspace so that replacing a
/// handle never lets two of them mutate the working tree at once.
pub(crate) type StateSlot = Arc<Mutex<RepoState>>;

pub(crate) fn new_slot() -> StateSlot {
    Arc::new(Mutex::new(RepoState::Uninitialized))
}

/// Live binding between a workspace directory and its remote repository.
///
/// Every sync operation holds the handle's lock for its whole duration, so
/// a pull never races a commit and two commits never interleave. Handles
/// of different workspaces never share a lock.
pub struct RepoHandle {
    key: WorkspaceKey,
    work_dir: PathBuf,
    remote: RemoteConfig,
    options: SyncOptions,
    state: StateSlot,
    cancelled: Arc<AtomicBool>,
}

impl RepoHandle {
    /// Create an uninitialized handle. Call [`ensure_repo`](Self::ensure_repo)
    /// before any other operation.
    pub fn new(
        key: WorkspaceKey,
        work_dir: impl Into<PathBuf>,
        remote: RemoteConfig,
        options: SyncOptions,
    ) -> Self {
        Self::with_slot(key, work_dir.into(), remote, options, new_slot())
    }

    pub(crate) fn with_slot(
        key: WorkspaceKey,
        work_dir: PathBuf,
        remote: RemoteConfig,
        options: SyncOptions,
        state: StateSlot,
    ) -> Self {
        Self {
            key,
            work_dir,
            remote,
            options,
            state,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> WorkspaceKey {
        self.key
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn url(&self) -> &str {
        &self.remote.url
    }

    /// Current lifecycle state. Waits for any in-flight operation.
    pub fn state(&self) -> SyncState {
        match *self.lock() {
            RepoState::Uninitialized => SyncState::Uninitialized,
            RepoState::Ready(_) => SyncState::Ready,
        }
    }

    /// Abort the in-flight remote call at its next transport checkpoint.
    ///
    /// Has no effect on local steps (staging, committing) or on calls that
    /// start after the current one finishes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clone the remote if no local clone exists, otherwise open the
    /// existing clone and pull. Safe to call on every activation.
    pub fn ensure_repo(&self) -> Result<EnsureOutcome> {
        self.run(|state| {
            tracing::debug!(
                tenant = self.key.tenant_id,
                workspace = self.key.workspace_id,
                work_dir = %self.work_dir.display(),
                "Ensuring repository exists and is up to date"
            );

            if !self.work_dir.join(StorePath::GitDir).exists() {
                tracing::info!(
                    tenant = self.key.tenant_id,
                    workspace = self.key.workspace_id,
                    url = %self.remote.url,
                    "Repository not found, cloning"
                );
                let repo = self.clone_repo()?;
                *state = RepoState::Ready(repo);
                return Ok(EnsureOutcome::Cloned);
            }

            let repo = Repository::open(&self.work_dir)?;
            self.sync_origin_url(&repo)?;
            *state = RepoState::Ready(repo);
            let repo = ready(state, &self.work_dir)?;
            self.pull_repo(repo).map(EnsureOutcome::Opened)
        })
    }

    /// Fetch from the remote and fast-forward or merge the current branch.
    pub fn pull(&self) -> Result<PullOutcome> {
        self.run(|state| {
            let repo = ready(state, &self.work_dir)?;
            self.pull_repo(repo)
        })
    }

    /// Stage every working-tree change and commit it with the handle's
    /// author identity.
    pub fn commit(&self, message: &str) -> Result<CommitId> {
        self.run(|state| {
            let repo = ready(state, &self.work_dir)?;
            self.commit_repo(repo, message)
        })
    }

    /// Push the current branch to the remote.
    pub fn push(&self) -> Result<()> {
        self.run(|state| {
            let repo = ready(state, &self.work_dir)?;
            self.push_repo(repo)
        })
    }

    /// Commit, then push, under one lock acquisition.
    ///
    /// A failed commit skips the push. A failed push keeps the commit, so
    /// the local branch stays one push ahead until [`push`](Self::push)
    /// succeeds.
    pub fn commit_and_push(&self, message: &str) -> Result<CommitId> {
        self.run(|state| {
            let repo = ready(state, &self.work_dir)?;
            let id = self.commit_repo(repo, message)?;
            if let Err(e) = self.push_repo(repo) {
                tracing::warn!(
                    tenant = self.key.tenant_id,
                    workspace = self.key.workspace_id,
                    commit = %id,
                    error = %e,
                    "Push failed after commit; commit kept locally"
                );
                return Err(e);
            }
            Ok(id)
        })
    }

    /// The most recent commits on the current branch, newest first.
    pub fn recent_commits(&self, max_count: usize) -> Result<Vec<CommitInfo>> {
        self.run(|state| {
            let repo = ready(state, &self.work_dir)?;
            commits::list_recent_commits(repo, max_count)
        })
    }

    fn lock(&self) -> MutexGuard<'_, RepoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<T>(&self, op: impl FnOnce(&mut RepoState) -> Result<T>) -> Result<T> {
        let mut state = self.lock();
        // A cancel aimed at an earlier call must not abort this one
        self.cancelled.store(false, Ordering::Release);
        op(&mut state)
    }

    fn deadline(&self) -> Deadline {
        Deadline::new(self.options.remote_timeout, Arc::clone(&self.cancelled))
    }

    fn transport_error(
        &self,
        operation: &'static str,
        deadline: &Deadline,
        err: git2::Error,
    ) -> Error {
        let message = match deadline.interrupted() {
            Some(reason) => reason.to_string(),
            None => err.message().to_string(),
        };
        tracing::warn!(
            tenant = self.key.tenant_id,
            workspace = self.key.workspace_id,
            url = %self.remote.url,
            operation,
            error = %message,
            "Remote operation failed"
        );
        Error::Transport {
            operation,
            url: self.remote.url.clone(),
            message,
        }
    }

    fn signature(&self) -> Result<Signature<'static>> {
        Ok(Signature::now(&self.remote.author.name, &self.remote.author.email)?)
    }

    fn clone_repo(&self) -> Result<Repository> {
        let deadline = self.deadline();
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(remote::fetch_callbacks(&self.remote.credentials, &deadline));

        RepoBuilder::new()
            .fetch_options(fetch)
            .clone(&self.remote.url, &self.work_dir)
            .map_err(|e| match e.code() {
                // Local precondition, not a transport failure
                ErrorCode::Exists => Error::Git(e),
                _ => self.transport_error("clone", &deadline, e),
            })
    }

    /// Point `origin` of an existing clone at the configured URL.
    fn sync_origin_url(&self, repo: &Repository) -> Result<()> {
        let current = match repo.find_remote(REMOTE_NAME) {
            Ok(origin) => origin.url().map(str::to_string),
            Err(e) if e.code() == ErrorCode::NotFound => {
                repo.remote(REMOTE_NAME, &self.remote.url)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if current.as_deref() != Some(self.remote.url.as_str()) {
            repo.remote_set_url(REMOTE_NAME, &self.remote.url)?;
            tracing::info!(
                tenant = self.key.tenant_id,
                workspace = self.key.workspace_id,
                url = %self.remote.url,
                previous = current.as_deref().unwrap_or(""),
                "Updated origin URL of existing clone"
            );
        }
        Ok(())
    }

    fn pull_repo(&self, repo: &Repository) -> Result<PullOutcome> {
        let branch = head_branch(repo, &self.work_dir)?;
        let deadline = self.deadline();

        let mut origin = repo
            .find_remote(REMOTE_NAME)
            .map_err(|e| self.transport_error("pull", &deadline, e))?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(remote::fetch_callbacks(&self.remote.credentials, &deadline));
        origin
            .fetch::<&str>(&[], Some(&mut fetch), None)
            .map_err(|e| self.transport_error("pull", &deadline, e))?;

        let tracking_ref = format!("refs/remotes/{REMOTE_NAME}/{branch}");
        let upstream = match repo.find_reference(&tracking_ref) {
            Ok(reference) => reference.peel_to_commit()?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                tracing::debug!(branch = %branch, "Remote has no such branch, nothing to update");
                return Ok(PullOutcome::UpToDate);
            }
            Err(e) => return Err(e.into()),
        };

        let annotated = repo.find_annotated_commit(upstream.id())?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;
        let local_ref = format!("refs/heads/{branch}");

        if analysis.is_up_to_date() {
            tracing::debug!(work_dir = %self.work_dir.display(), "Repository already up to date");
            return Ok(PullOutcome::UpToDate);
        }

        if analysis.is_unborn() {
            repo.checkout_tree(upstream.as_object(), Some(CheckoutBuilder::new().safe()))?;
            repo.reference(&local_ref, upstream.id(), true, "pull: adopt remote branch")?;
            repo.set_head(&local_ref)?;
            tracing::debug!(branch = %branch, "Adopted remote branch");
            return Ok(PullOutcome::FastForward);
        }

        if analysis.is_fast_forward() {
            // Update files first so a dirty tree aborts before HEAD moves
            repo.checkout_tree(upstream.as_object(), Some(CheckoutBuilder::new().safe()))?;
            repo.find_reference(&local_ref)?.set_target(
                upstream.id(),
                &format!("pull: fast-forward to {}", upstream.id()),
            )?;
            tracing::debug!(branch = %branch, "Fast-forwarded to remote");
            return Ok(PullOutcome::FastForward);
        }

        let head_commit = repo.head()?.peel_to_commit()?;
        let mut merged = repo.merge_commits(&head_commit, &upstream, None)?;
        if merged.has_conflicts() {
            return Err(Error::MergeConflict { branch });
        }

        let tree = repo.find_tree(merged.write_tree_to(repo)?)?;
        repo.checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))?;

        let signature = self.signature()?;
        let message = format!("Merge remote-tracking branch '{REMOTE_NAME}/{branch}'");
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&head_commit, &upstream],
        )?;
        tracing::debug!(branch = %branch, "Merged remote changes");
        Ok(PullOutcome::Merged)
    }

    fn commit_repo(&self, repo: &Repository, message: &str) -> Result<CommitId> {
        let mut skip_in_flight = |path: &Path, _: &[u8]| -> i32 {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            i32::from(io::is_temp_name(name))
        };

        let mut index = repo.index()?;
        index.add_all(
            ["*"],
            IndexAddOption::DEFAULT,
            Some(&mut skip_in_flight as &mut IndexMatchedPath<'_>),
        )?;
        // Picks up deletions, which add_all leaves in the index
        index.update_all(["*"], None)?;
        index.write()?;

        let tree = repo.find_tree(index.write_tree()?)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let signature = self.signature()?;
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        tracing::debug!(
            tenant = self.key.tenant_id,
            workspace = self.key.workspace_id,
            commit = %oid,
            "Changes committed"
        );
        Ok(CommitId(oid))
    }

    fn push_repo(&self, repo: &Repository) -> Result<()> {
        let branch = head_branch(repo, &self.work_dir)?;
        let local_ref = format!("refs/heads/{branch}");

        if let Err(e) = repo.find_reference(&local_ref) {
            if e.code() == ErrorCode::NotFound {
                tracing::debug!(branch = %branch, "Nothing committed yet, nothing to push");
                return Ok(());
            }
            return Err(e.into());
        }

        let deadline = self.deadline();
        let mut origin = repo
            .find_remote(REMOTE_NAME)
            .map_err(|e| self.transport_error("push", &deadline, e))?;
        let mut push = PushOptions::new();
        push.remote_callbacks(remote::push_callbacks(&self.remote.credentials, &deadline));

        let refspec = format!("{local_ref}:{local_ref}");
        origin
            .push(&[refspec.as_str()], Some(&mut push))
            .map_err(|e| self.transport_error("push", &deadline, e))?;

        tracing::debug!(
            tenant = self.key.tenant_id,
            workspace = self.key.workspace_id,
            branch = %branch,
            "Pushed repository changes"
        );
        Ok(())
    }
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHandle")
            .field("key", &self.key)
            .field("work_dir", &self.work_dir)
            .field("url", &self.remote.url)
            .finish_non_exhaustive()
    }
}

fn ready<'a>(state: &'a RepoState, work_dir: &Path) -> Result<&'a Repository> {
    match state {
        RepoState::Ready(repo) => Ok(repo),
        RepoState::Uninitialized => Err(Error::NotInitialized {
            work_dir: work_dir.to_path_buf(),
        }),
    }
}

/// Branch HEAD points at, whether or not it has commits yet.
fn head_branch(repo: &Repository, work_dir: &Path) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    let target = head.symbolic_target().ok_or_else(|| Error::DetachedHead {
        work_dir: work_dir.to_path_buf(),
    })?;
    Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
}
