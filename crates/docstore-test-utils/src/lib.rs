//! Shared test fixtures for the docstore workspace.
//!
//! Remotes are local bare repositories built with `git2`, so tests never
//! touch the network or need a `git` binary.

pub mod git;
pub mod sandbox;

pub use git::{
    DEFAULT_BRANCH, bare_remote, empty_bare_remote, head_of, remote_branches, remote_file,
    remote_history, seed_commit,
};
pub use sandbox::Sandbox;
