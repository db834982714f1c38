//! [`Sandbox`]: a temporary storage root next to a set of fixture remotes.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git;

/// A temporary directory holding a storage root (`storage/`) and any number
/// of bare remotes (`remotes/<name>.git`).
///
/// # Example
///
/// ```rust,no_run
/// use docstore_test_utils::Sandbox;
///
/// let sandbox = Sandbox::new();
/// let url = sandbox.remote("team");
/// assert!(sandbox.storage_root().is_dir());
/// # let _ = url;
/// ```
pub struct Sandbox {
    temp_dir: TempDir,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// Create the temporary directory with an empty `storage/` root.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("storage")).unwrap();
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage_root(&self) -> PathBuf {
        self.path().join("storage")
    }

    /// Location of the named remote, whether or not it exists yet.
    pub fn remote_path(&self, name: &str) -> PathBuf {
        self.path().join("remotes").join(format!("{name}.git"))
    }

    /// Create a remote with one initial commit on `main` and return its URL.
    pub fn remote(&self, name: &str) -> String {
        let path = self.remote_path(name);
        git::bare_remote(&path);
        path.to_string_lossy().into_owned()
    }

    /// Create a remote with no commits and return its URL.
    pub fn empty_remote(&self, name: &str) -> String {
        let path = self.remote_path(name);
        git::empty_bare_remote(&path);
        path.to_string_lossy().into_owned()
    }
}
