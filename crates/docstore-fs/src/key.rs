//! Workspace identity

use serde::{Deserialize, Serialize};

/// Identifies one workspace of one tenant.
///
/// The pair maps deterministically onto `<root>/<tenant_id>/<workspace_id>/`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorkspaceKey {
    pub tenant_id: u64,
    pub workspace_id: u64,
}

impl WorkspaceKey {
    pub const fn new(tenant_id: u64, workspace_id: u64) -> Self {
        Self {
            tenant_id,
            workspace_id,
        }
    }
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.workspace_id)
    }
}

impl From<(u64, u64)> for WorkspaceKey {
    fn from((tenant_id, workspace_id): (u64, u64)) -> Self {
        Self::new(tenant_id, workspace_id)
    }
}
