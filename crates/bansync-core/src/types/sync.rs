use serde::{Deserialize, Serialize};

use super::event::{Action, NodeId, PeerNode, UserId};

/// Outcome of propagating an action to one peer node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum PeerOutcome {
    /// The action was applied on the peer
    Success,
    /// The peer was already in the desired state
    Skipped,
    /// The attempt raised an error
    Failed(String),
}

impl PeerOutcome {
    /// Returns true for [`PeerOutcome::Success`]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for [`PeerOutcome::Failed`]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One peer's entry in a [`SyncResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAttempt {
    /// Target peer
    pub node: PeerNode,

    /// What happened there
    pub outcome: PeerOutcome,
}

/// Per-peer outcomes of a single-event sync, in attempt order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Attempts in the order peers were visited
    pub attempts: Vec<PeerAttempt>,
}

impl SyncResult {
    /// Record an attempt
    pub fn record(&mut self, node: PeerNode, outcome: PeerOutcome) {
        self.attempts.push(PeerAttempt { node, outcome });
    }

    /// Names of peers where the action was applied
    #[must_use]
    pub fn success_node_names(&self) -> Vec<&str> {
        self.names_where(PeerOutcome::is_success)
    }

    /// Names of peers where the attempt failed
    #[must_use]
    pub fn failed_node_names(&self) -> Vec<&str> {
        self.names_where(PeerOutcome::is_failure)
    }

    /// Names of peers skipped because they were already in the desired state
    #[must_use]
    pub fn skipped_node_names(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, PeerOutcome::Skipped))
    }

    /// Outcome recorded for a given node
    #[must_use]
    pub fn outcome_for(&self, node: NodeId) -> Option<&PeerOutcome> {
        self.attempts
            .iter()
            .find(|a| a.node.id == node)
            .map(|a| &a.outcome)
    }

    fn names_where(&self, pred: impl Fn(&PeerOutcome) -> bool) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| pred(&a.outcome))
            .map(|a| a.node.name.as_str())
            .collect()
    }
}

/// A burst of same-action events on one node, collapsed into one fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassBatch {
    /// Users in the order their events arrived; duplicates are kept
    pub user_ids: Vec<UserId>,

    /// Node the burst was observed on
    pub origin_node_id: NodeId,

    /// Name of the origin node
    pub origin_node_name: String,

    /// Ban or unban
    pub action: Action,
}

impl MassBatch {
    /// The origin node as a [`PeerNode`]
    #[must_use]
    pub fn origin(&self) -> PeerNode {
        PeerNode::new(self.origin_node_id, self.origin_node_name.clone())
    }
}
