use crate::transport::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named permission checked against the authorization collaborator before
/// a gated executor or approval action runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// May approve or reject a pending issue-creation prompt.
    ApproveIssueCreation,
    /// May run channel-management commands.
    ManageChannels,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ApproveIssueCreation => "approve-issue-creation",
            Capability::ManageChannels => "manage-channels",
        };
        f.write_str(name)
    }
}

/// External role/capability store. The gate itself is stateless; caching, if
/// any, belongs to the implementation.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn has_capability(&self, user: UserId, capability: Capability) -> bool;
}
