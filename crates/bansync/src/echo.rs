//! Echo suppression.
//!
//! Banning a user on a peer makes that peer emit its own ban notification.
//! Because dedup keys include the origin node, that echo would look like a
//! fresh event from the peer and fan out again. Before each peer call the
//! executor registers the echo it expects; the router drops a matching
//! notification before it reaches the burst detector or the dedup store.

use crate::dedup::ExpiringSet;
use bansync_core::{Action, ActionEvent, NodeId, UserId};
use std::time::Duration;
use tracing::debug;

/// Identity of an expected echo: (action, user, node the call targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchoKey {
    /// Ban or unban
    pub action: Action,
    /// Affected user
    pub user: UserId,
    /// Peer the action was applied to
    pub node: NodeId,
}

/// Outstanding echo markers.
pub struct EchoGuard {
    markers: ExpiringSet<EchoKey>,
    ttl: Duration,
}

impl EchoGuard {
    /// Create a guard whose markers live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            markers: ExpiringSet::new(),
            ttl,
        }
    }

    /// Register the echo of a call about to be made.
    pub fn expect(&self, action: Action, user: UserId, node: NodeId) -> EchoKey {
        let key = EchoKey { action, user, node };
        self.markers.insert_with_expiry(key, self.ttl);
        key
    }

    /// Withdraw a marker whose call failed; no echo will come.
    pub fn withdraw(&self, key: &EchoKey) {
        self.markers.remove(key);
    }

    /// Consume the marker matching this event, if any.
    ///
    /// Returns true when the event is an echo of our own propagation.
    pub fn take_echo(&self, event: &ActionEvent) -> bool {
        let key = EchoKey {
            action: event.action,
            user: event.user_id,
            node: event.origin_node_id,
        };
        let echoed = self.markers.remove(&key);
        if echoed {
            debug!(
                user = %event.user_id,
                node = %event.origin_node_name,
                action = %event.action,
                "dropping echo of propagated action"
            );
        }
        echoed
    }

    /// Markers currently outstanding
    pub fn outstanding(&self) -> usize {
        self.markers.len()
    }
}
