//! Recent commit history of a workspace repository.

use chrono::{DateTime, TimeZone, Utc};
use git2::{ErrorCode, Repository, Sort};

use crate::Result;

/// Information about a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash
    pub id: String,

    /// Short commit hash (7 characters)
    pub short_id: String,

    /// First line of the commit message
    pub summary: String,

    /// Commit author name
    pub author: String,

    pub timestamp: DateTime<Utc>,

    /// Two or more for merge commits
    pub parent_count: usize,
}

impl CommitInfo {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Extract the last `max_count` commits reachable from HEAD.
///
/// Returns commits newest first. A repository with no commits yields an
/// empty list.
pub fn list_recent_commits(repo: &Repository, max_count: usize) -> Result<Vec<CommitInfo>> {
    let head = match repo.head() {
        Ok(head) => head.peel_to_commit()?,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.push(head.id())?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut commits = Vec::with_capacity(max_count);

    for oid in revwalk.take(max_count) {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;

        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default();

        commits.push(CommitInfo {
            id: oid.to_string(),
            short_id: format!("{oid:.7}"),
            summary: commit.summary().unwrap_or("").to_string(),
            author: commit.author().name().unwrap_or("Unknown").to_string(),
            timestamp,
            parent_count: commit.parent_count(),
        });
    }

    Ok(commits)
}
