//! On-disk names shared by the storage and sync layers.

use std::ffi::OsStr;
use std::path::Path;

/// Well-known entries inside a workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePath {
    /// The `.git` directory, present only when remote sync is enabled
    GitDir,
}

impl StorePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitDir => ".git",
        }
    }

    /// Whether a directory entry name matches this path.
    pub fn matches(&self, name: &OsStr) -> bool {
        name == self.as_str()
    }
}

impl AsRef<Path> for StorePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
