//! In-memory fleet of nodes.
//!
//! Implements [`NodeDirectory`] and [`UserResolver`] over plain maps, with
//! injectable per-node failures and a log of every node-scoped call. Used
//! by the replay command and by tests.

use crate::directory::{NodeDirectory, UserResolver};
use async_trait::async_trait;
use bansync_core::{Action, ActionEvent, NodeId, PeerNode, Result, SyncError, UserId, UserProfile};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Node-scoped operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Reading the ban list
    FetchBans,
    /// Banning a user
    Ban,
    /// Unbanning a user
    Unban,
}

/// Failure injected for an operation on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing moderation permission
    PermissionDenied,
    /// Remote rate limit
    RateLimited,
    /// Unknown node or ban
    NotFound,
    /// Transport failure
    Network,
}

impl FailureKind {
    fn to_error(self, node: NodeId) -> SyncError {
        match self {
            Self::PermissionDenied => {
                SyncError::PermissionDenied(format!("missing permissions on node {node}"))
            }
            Self::RateLimited => SyncError::RateLimited { retry_after: Some(1) },
            Self::NotFound => SyncError::NotFound {
                resource: format!("node {node}"),
            },
            Self::Network => SyncError::Connection(format!("node {node} unreachable")),
        }
    }
}

/// A logged node-scoped call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetCall {
    /// What was called
    pub op: Operation,
    /// Target node
    pub node: NodeId,
    /// Target user, for ban/unban
    pub user: Option<UserId>,
}

/// In-memory nodes, ban lists and users.
#[derive(Default)]
pub struct MemoryFleet {
    nodes: Vec<PeerNode>,
    bans: DashMap<NodeId, HashSet<UserId>>,
    users: DashMap<UserId, String>,
    failures: DashMap<(NodeId, Operation), FailureKind>,
    calls: Mutex<Vec<FleetCall>>,
    emitted: Mutex<Vec<ActionEvent>>,
    emit_events: bool,
}

impl MemoryFleet {
    /// Create a fleet with the given nodes and empty ban lists.
    pub fn new(nodes: impl IntoIterator<Item = PeerNode>) -> Self {
        let nodes: Vec<PeerNode> = nodes.into_iter().collect();
        let bans = nodes.iter().map(|n| (n.id, HashSet::new())).collect();
        Self {
            nodes,
            bans,
            ..Self::default()
        }
    }

    /// Queue a notification for every applied ban/unban, the way a gateway
    /// would. Drain them with [`take_emitted`](Self::take_emitted).
    #[must_use]
    pub const fn with_event_emission(mut self) -> Self {
        self.emit_events = true;
        self
    }

    /// Mark a user as banned on a node.
    pub fn add_ban(&self, node: NodeId, user: UserId) {
        self.bans.entry(node).or_default().insert(user);
    }

    /// Lift a user's ban on a node. Returns whether a ban was removed.
    pub fn remove_ban(&self, node: NodeId, user: UserId) -> bool {
        self.bans.get_mut(&node).is_some_and(|mut b| b.remove(&user))
    }

    /// Register a resolvable user.
    pub fn add_user(&self, user: UserId, name: impl Into<String>) {
        self.users.insert(user, name.into());
    }

    /// Make an operation on a node fail until cleared.
    pub fn fail(&self, node: NodeId, op: Operation, kind: FailureKind) {
        self.failures.insert((node, op), kind);
    }

    /// Clear an injected failure.
    pub fn clear_failure(&self, node: NodeId, op: Operation) {
        self.failures.remove(&(node, op));
    }

    /// Whether a user is banned on a node
    pub fn is_banned(&self, node: NodeId, user: UserId) -> bool {
        self.bans.get(&node).is_some_and(|b| b.contains(&user))
    }

    /// Sorted ban list of a node
    pub fn bans_of(&self, node: NodeId) -> Vec<UserId> {
        self.bans
            .get(&node)
            .map(|b| b.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
            .unwrap_or_default()
    }

    /// Nodes in directory order
    pub fn nodes(&self) -> &[PeerNode] {
        &self.nodes
    }

    /// Every node-scoped call so far
    pub fn calls(&self) -> Vec<FleetCall> {
        self.calls.lock().clone()
    }

    /// Ban/unban calls so far (ban-list reads excluded)
    pub fn mutations(&self) -> Vec<FleetCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op != Operation::FetchBans)
            .copied()
            .collect()
    }

    /// Drain notifications queued by applied actions.
    pub fn take_emitted(&self) -> Vec<ActionEvent> {
        std::mem::take(&mut *self.emitted.lock())
    }

    fn log(&self, op: Operation, node: NodeId, user: Option<UserId>) {
        self.calls.lock().push(FleetCall { op, node, user });
    }

    fn check(&self, node: NodeId, op: Operation) -> Result<()> {
        if let Some(kind) = self.failures.get(&(node, op)) {
            return Err(kind.to_error(node));
        }
        if !self.bans.contains_key(&node) {
            return Err(SyncError::NotFound {
                resource: format!("node {node}"),
            });
        }
        Ok(())
    }

    fn emit(&self, action: Action, node: NodeId, user: UserId) {
        if !self.emit_events {
            return;
        }
        let name = self
            .nodes
            .iter()
            .find(|n| n.id == node)
            .map_or_else(|| node.to_string(), |n| n.name.clone());
        let mut event = ActionEvent::new(action, user, node, name);
        if let Some(user_name) = self.users.get(&user) {
            event = event.with_user_name(user_name.value().clone());
        }
        self.emitted.lock().push(event);
    }
}

#[async_trait]
impl NodeDirectory for MemoryFleet {
    async fn list_nodes(&self) -> Result<Vec<PeerNode>> {
        Ok(self.nodes.clone())
    }

    async fn fetch_ban_membership(&self, node: NodeId) -> Result<HashSet<UserId>> {
        self.log(Operation::FetchBans, node, None);
        self.check(node, Operation::FetchBans)?;
        Ok(self.bans.get(&node).map(|b| b.value().clone()).unwrap_or_default())
    }

    async fn ban(&self, node: NodeId, user: UserId, _reason: &str) -> Result<()> {
        self.log(Operation::Ban, node, Some(user));
        self.check(node, Operation::Ban)?;
        self.add_ban(node, user);
        self.emit(Action::Ban, node, user);
        Ok(())
    }

    async fn unban(&self, node: NodeId, user: UserId, _reason: &str) -> Result<()> {
        self.log(Operation::Unban, node, Some(user));
        self.check(node, Operation::Unban)?;
        if !self.remove_ban(node, user) {
            return Err(SyncError::NotFound {
                resource: format!("ban of {user} on node {node}"),
            });
        }
        self.emit(Action::Unban, node, user);
        Ok(())
    }
}

#[async_trait]
impl UserResolver for MemoryFleet {
    async fn fetch_user(&self, user: UserId) -> Result<UserProfile> {
        self.users
            .get(&user)
            .map(|name| UserProfile::new(user, name.value().clone()))
            .ok_or_else(|| SyncError::UserLookup {
                user: user.0,
                reason: "unknown user".into(),
            })
    }
}
