//! Workspace path sandboxing
//!
//! Every user-supplied path is joined onto its workspace root and lexically
//! normalized before use. The result must stay strictly below the root.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result, WorkspaceKey};

/// Resolves workspace-relative paths to absolute paths under a storage root.
///
/// Resolution is purely lexical: `.` and `..` segments are folded without
/// consulting the filesystem, so resolving never touches the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given storage root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    /// The storage root every workspace lives under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a workspace: `<root>/<tenant>/<workspace>`.
    pub fn workspace_root(&self, key: WorkspaceKey) -> PathBuf {
        self.root
            .join(key.tenant_id.to_string())
            .join(key.workspace_id.to_string())
    }

    /// Resolve `relative` inside the workspace identified by `key`.
    ///
    /// Fails with [`Error::PathEscape`] unless the normalized result is a
    /// strict descendant of the workspace root. The check compares whole
    /// path components, so root `/d/7/12` never accepts `/d/7/123/x`.
    pub fn resolve(&self, key: WorkspaceKey, relative: &str) -> Result<PathBuf> {
        let workspace_root = self.workspace_root(key);
        let candidate = normalize(&workspace_root.join(relative));

        match candidate.strip_prefix(&workspace_root) {
            Ok(rest) if rest.components().next().is_some() => Ok(candidate),
            _ => {
                tracing::warn!(
                    tenant = key.tenant_id,
                    workspace = key.workspace_id,
                    path = %relative,
                    "Rejected path outside workspace"
                );
                Err(Error::PathEscape {
                    root: workspace_root,
                    path: relative.to_string(),
                })
            }
        }
    }

    /// Render an absolute path below a workspace root as a `/`-separated
    /// workspace-relative path. Returns `None` for paths outside it.
    pub fn relative_to_workspace(&self, key: WorkspaceKey, path: &Path) -> Option<String> {
        let workspace_root = self.workspace_root(key);
        path.strip_prefix(&workspace_root).ok().map(to_slash)
    }
}

/// Lexically normalize a path.
///
/// Drops `.` segments and folds `..` into the preceding normal segment.
/// `..` directly under a filesystem root stays at the root; leading `..`
/// segments of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::ParentDir) | None => out.push(".."),
                Some(Component::RootDir | Component::Prefix(_) | Component::CurDir) => {}
            },
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// Join the components of a relative path with `/`.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
