//! Collaborator interfaces for the connection/session layer.
//!
//! The engine never talks to the platform directly. Everything it needs
//! from the session layer (which nodes exist, who is banned where, and the
//! ban/unban calls themselves) goes through these traits so a gateway
//! client, the in-memory fleet or a test double can stand behind them.

use async_trait::async_trait;
use bansync_core::{NodeId, PeerNode, Result, UserId, UserProfile};
use std::collections::HashSet;

/// Node directory and node-scoped moderation operations.
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Every node the operator controls, the origin included.
    async fn list_nodes(&self) -> Result<Vec<PeerNode>>;

    /// Users currently banned on a node.
    async fn fetch_ban_membership(&self, node: NodeId) -> Result<HashSet<UserId>>;

    /// Ban a user on a node.
    async fn ban(&self, node: NodeId, user: UserId, reason: &str) -> Result<()>;

    /// Lift a user's ban on a node.
    async fn unban(&self, node: NodeId, user: UserId, reason: &str) -> Result<()>;
}

/// Resolves user ids to display names. May fail per id.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Look up a user.
    async fn fetch_user(&self, user: UserId) -> Result<UserProfile>;
}
