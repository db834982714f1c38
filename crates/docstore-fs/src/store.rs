//! File CRUD and aggregate statistics on workspace content

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::constants::StorePath;
use crate::tree::{FileNode, TreeWalker};
use crate::{Error, PathResolver, Result, WorkspaceKey, io};

/// Aggregate file count and size, recomputed on every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Content operations on workspaces under one storage root.
///
/// Every path argument is workspace-relative and goes through
/// [`PathResolver::resolve`] before the filesystem is touched.
#[derive(Debug, Clone)]
pub struct FileStore {
    resolver: PathResolver,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        let root = dunce::canonicalize(root).map_err(|e| Error::io(root, e))?;
        tracing::debug!(root = %root.display(), "Opened file store");
        Ok(Self {
            resolver: PathResolver::new(root),
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn workspace_root(&self, key: WorkspaceKey) -> PathBuf {
        self.resolver.workspace_root(key)
    }

    pub fn workspace_exists(&self, key: WorkspaceKey) -> bool {
        self.workspace_root(key).is_dir()
    }

    /// Create the workspace root directory. Idempotent.
    pub fn initialize_workspace(&self, key: WorkspaceKey) -> Result<PathBuf> {
        let root = self.workspace_root(key);
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        tracing::info!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            "Initialized workspace directory"
        );
        Ok(root)
    }

    /// Remove the workspace root and everything below it.
    ///
    /// Removing a workspace that does not exist is a no-op.
    pub fn delete_workspace(&self, key: WorkspaceKey) -> Result<()> {
        let root = self.workspace_root(key);
        match fs::remove_dir_all(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(&root, e)),
        }
        tracing::info!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            "Deleted workspace directory"
        );
        Ok(())
    }

    /// Sandbox a workspace-relative path. See [`PathResolver::resolve`].
    pub fn resolve(&self, key: WorkspaceKey, path: &str) -> Result<PathBuf> {
        self.resolver.resolve(key, path)
    }

    /// Directories-first, case-insensitively sorted tree of the workspace.
    pub fn list(&self, key: WorkspaceKey) -> Result<Vec<FileNode>> {
        TreeWalker::new(self.resolver.clone()).list(key)
    }

    pub fn read(&self, key: WorkspaceKey, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(key, path)?;
        fs::read(&full_path).map_err(|e| Error::io(&full_path, e))
    }

    /// Write the full content of a file, creating missing parents and
    /// replacing any existing file. Last writer wins.
    pub fn write(&self, key: WorkspaceKey, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.resolve(key, path)?;
        io::write_atomic(&full_path, content)?;
        tracing::debug!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            path = %path,
            bytes = content.len(),
            "Saved file"
        );
        Ok(())
    }

    /// Delete a file, or an empty directory.
    pub fn delete(&self, key: WorkspaceKey, path: &str) -> Result<()> {
        let full_path = self.resolve(key, path)?;
        let metadata = fs::symlink_metadata(&full_path).map_err(|e| Error::io(&full_path, e))?;

        if metadata.is_dir() {
            fs::remove_dir(&full_path)
        } else {
            fs::remove_file(&full_path)
        }
        .map_err(|e| Error::io(&full_path, e))?;

        tracing::debug!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            path = %path,
            "Deleted file"
        );
        Ok(())
    }

    /// Find every file in the workspace whose name equals `name`, ignoring
    /// case.
    ///
    /// Paths come back in filesystem traversal order, not sorted. Fails with
    /// [`Error::NoMatches`] when nothing matches.
    pub fn find_by_name(&self, key: WorkspaceKey, name: &str) -> Result<Vec<String>> {
        let root = self.workspace_root(key);
        let wanted = name.to_lowercase();
        let mut found = Vec::new();

        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = entry.map_err(|e| walk_error(&root, e))?;
            if entry.file_type().is_dir() {
                continue;
            }
            if entry.file_name().to_string_lossy().to_lowercase() == wanted {
                found.extend(self.resolver.relative_to_workspace(key, entry.path()));
            }
        }

        if found.is_empty() {
            return Err(Error::NoMatches {
                name: name.to_string(),
                root,
            });
        }
        Ok(found)
    }

    /// File count and total size of a workspace, excluding `.git`.
    pub fn stats(&self, key: WorkspaceKey) -> Result<FileStats> {
        let root = self.workspace_root(key);
        if !root.is_dir() {
            return Err(Error::NotFound { path: root });
        }
        count_files(&root)
    }

    /// File count and total size across every workspace in the store.
    pub fn total_stats(&self) -> Result<FileStats> {
        count_files(self.resolver.root())
    }
}

fn count_files(dir: &Path) -> Result<FileStats> {
    let mut stats = FileStats::default();

    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| !is_git_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| walk_error(dir, e))?;
        stats.file_count += 1;
        stats.total_bytes += metadata.len();
    }

    Ok(stats)
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && StorePath::GitDir.matches(entry.file_name())
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    match err.into_io_error() {
        Some(source) => Error::io(path, source),
        None => Error::Io {
            path,
            source: std::io::Error::other("filesystem loop detected"),
        },
    }
}
