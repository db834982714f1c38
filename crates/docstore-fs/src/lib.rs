//! Sandboxed workspace storage for the document store
//!
//! Maps every (tenant, workspace) pair onto its own directory subtree of a
//! shared storage root and provides path-checked file operations inside it.

pub mod constants;
pub mod error;
pub mod io;
pub mod key;
pub mod path;
pub mod store;
pub mod tree;

pub use error::{Error, Result};
pub use key::WorkspaceKey;
pub use path::PathResolver;
pub use store::{FileStats, FileStore};
pub use tree::{FileNode, TreeWalker};
