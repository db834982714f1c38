//! Workspace directory tree listing

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, PathResolver, Result, WorkspaceKey};

/// A file or directory inside a workspace.
///
/// `id` and `path` are both the `/`-separated path relative to the
/// workspace root. `children` is `None` for plain files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    fn file(name: String, path: String) -> Self {
        Self {
            id: path.clone(),
            name,
            path,
            children: None,
        }
    }

    fn directory(name: String, path: String, children: Vec<FileNode>) -> Self {
        Self {
            id: path.clone(),
            name,
            path,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }
}

/// Recursively lists a workspace into an ordered tree.
///
/// At every level all subdirectories come before any file, and each group
/// is sorted by case-insensitive name. Names equal under case folding are
/// ordered by their exact bytes so the result is deterministic.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    resolver: PathResolver,
}

impl TreeWalker {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// List the whole workspace. Produces a fresh snapshot on every call.
    pub fn list(&self, key: WorkspaceKey) -> Result<Vec<FileNode>> {
        let root = self.resolver.workspace_root(key);
        tracing::debug!(
            tenant = key.tenant_id,
            workspace = key.workspace_id,
            "Listing workspace tree"
        );
        walk(&root, "")
    }
}

fn walk(dir: &Path, prefix: &str) -> Result<Vec<FileNode>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        // Display name may be lossy, recursion uses the real path
        let name = entry.file_name().to_string_lossy().into_owned();

        // Symlinks are listed as files and never followed
        if file_type.is_dir() {
            dirs.push((name, entry.path()));
        } else {
            files.push(name);
        }
    }

    dirs.sort_by_cached_key(|(name, _)| sort_key(name));
    sort_names(&mut files);

    let mut nodes = Vec::with_capacity(dirs.len() + files.len());

    for (name, real_path) in dirs {
        let path = child_path(prefix, &name);
        let children = walk(&real_path, &path)?;
        nodes.push(FileNode::directory(name, path, children));
    }

    for name in files {
        let path = child_path(prefix, &name);
        nodes.push(FileNode::file(name, path));
    }

    Ok(nodes)
}

fn sort_key(name: &str) -> (String, String) {
    (name.to_lowercase(), name.to_string())
}

fn sort_names(names: &mut [String]) {
    names.sort_by_cached_key(|name| sort_key(name));
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
