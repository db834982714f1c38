//! Bare remote repositories and read-only inspection helpers.
//!
//! Every remote uses `main` as its default branch. Helpers panic on failure
//! since they only ever run inside tests.

use std::path::Path;

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Sort};

/// Branch every fixture remote starts on.
pub const DEFAULT_BRANCH: &str = "main";

fn signature() -> Signature<'static> {
    Signature::now("Fixture", "fixture@example.com")
        .unwrap_or_else(|e| panic!("signature: {e}"))
}

fn open(remote: &Path) -> Repository {
    Repository::open_bare(remote)
        .unwrap_or_else(|e| panic!("failed to open bare remote {}: {e}", remote.display()))
}

/// Initialises a bare repository with no commits.
///
/// Realism level: **REAL**: valid object store, unborn `main`.
///
/// # Panics
/// Panics if initialisation fails.
pub fn empty_bare_remote(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head(DEFAULT_BRANCH);
    Repository::init_opts(path, &opts).unwrap_or_else(|e| {
        panic!(
            "empty_bare_remote: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Initialises a bare repository whose `main` holds one commit with a
/// `README.md`.
///
/// Realism level: **REAL WITH HISTORY**.
///
/// # Panics
/// Panics if any git operation fails.
pub fn bare_remote(path: &Path) -> Repository {
    let repo = empty_bare_remote(path);
    seed_commit(path, &[("README.md", "# Workspace\n")], "Initial commit");
    repo
}

/// Commits top-level files straight into a bare remote's `main`, as another
/// client pushing would. Existing files not named are kept.
///
/// # Panics
/// Panics if any git operation fails.
pub fn seed_commit(remote: &Path, files: &[(&str, &str)], message: &str) -> Oid {
    let repo = open(remote);
    let refname = format!("refs/heads/{DEFAULT_BRANCH}");

    let parent = repo
        .find_reference(&refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let base_tree = parent.as_ref().map(|c| c.tree().unwrap());

    let mut builder = repo
        .treebuilder(base_tree.as_ref())
        .unwrap_or_else(|e| panic!("seed_commit: treebuilder: {e}"));
    for (name, content) in files {
        let blob = repo
            .blob(content.as_bytes())
            .unwrap_or_else(|e| panic!("seed_commit: blob {name}: {e}"));
        builder
            .insert(*name, blob, 0o100644)
            .unwrap_or_else(|e| panic!("seed_commit: insert {name}: {e}"));
    }
    let tree_id = builder
        .write()
        .unwrap_or_else(|e| panic!("seed_commit: write tree: {e}"));
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = signature();
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some(&refname), &sig, &sig, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("seed_commit: commit: {e}"))
}

/// Tip of a branch on the remote, `None` if the branch does not exist.
pub fn head_of(remote: &Path, branch: &str) -> Option<Oid> {
    let repo = open(remote);
    let reference = repo.find_reference(&format!("refs/heads/{branch}")).ok()?;
    reference.target()
}

/// Local branch names present on the remote.
pub fn remote_branches(remote: &Path) -> Vec<String> {
    let repo = open(remote);
    let branches = repo.branches(Some(git2::BranchType::Local)).unwrap();
    branches
        .filter_map(|b| b.ok())
        .filter_map(|(branch, _)| branch.name().ok().flatten().map(str::to_string))
        .collect()
}

/// Commit summaries reachable from a remote branch, newest first, with the
/// parent count of each.
pub fn remote_history(remote: &Path, branch: &str) -> Vec<(String, usize)> {
    let repo = open(remote);
    let Some(tip) = head_of(remote, branch) else {
        return Vec::new();
    };

    let mut walk = repo.revwalk().unwrap();
    walk.push(tip).unwrap();
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME).unwrap();

    walk.map(|oid| {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        (
            commit.summary().unwrap_or("").to_string(),
            commit.parent_count(),
        )
    })
    .collect()
}

/// Content of a file at the tip of a remote branch, `None` if absent.
pub fn remote_file(remote: &Path, branch: &str, path: &str) -> Option<String> {
    let repo = open(remote);
    let tip = head_of(remote, branch)?;
    let tree = repo.find_commit(tip).ok()?.tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}
