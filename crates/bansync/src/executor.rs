//! Fan-out of an action to every peer node.
//!
//! Peers are visited strictly one after another. Each attempt is
//! independent: an error on one peer is recorded against that peer and the
//! loop moves on.

use crate::directory::NodeDirectory;
use crate::echo::EchoGuard;
use bansync_core::{Action, PeerNode, PeerOutcome, Result, SyncResult, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies an action on peer nodes and records per-peer outcomes.
pub struct SyncExecutor {
    directory: Arc<dyn NodeDirectory>,
    echo: Option<Arc<EchoGuard>>,
}

impl SyncExecutor {
    /// Create an executor over a node directory.
    pub fn new(directory: Arc<dyn NodeDirectory>) -> Self {
        Self {
            directory,
            echo: None,
        }
    }

    /// Register expected echoes with `guard` before each peer call.
    #[must_use]
    pub fn with_echo_guard(mut self, guard: Arc<EchoGuard>) -> Self {
        self.echo = Some(guard);
        self
    }

    /// Current node set from the directory
    pub async fn list_nodes(&self) -> Result<Vec<PeerNode>> {
        self.directory.list_nodes().await
    }

    /// Sync one user's action to every peer except the origin.
    pub async fn sync_one(
        &self,
        action: Action,
        user: UserId,
        origin: &PeerNode,
        peers: &[PeerNode],
    ) -> SyncResult {
        let reason = match action {
            Action::Ban => format!("Ban sync from {}", origin.name),
            Action::Unban => format!("Unban sync from {}", origin.name),
        };

        let mut result = SyncResult::default();
        for peer in peers.iter().filter(|p| p.id != origin.id) {
            let outcome = self.attempt(action, user, peer, &reason).await;
            result.record(peer.clone(), outcome);
        }

        info!(
            user = %user,
            origin = %origin.name,
            action = %action,
            succeeded = result.success_node_names().len(),
            failed = result.failed_node_names().len(),
            "sync finished"
        );
        result
    }

    /// Sync a batch of users to every peer except the origin, best-effort.
    ///
    /// Outcomes are not aggregated; failures are only logged.
    pub async fn sync_batch(
        &self,
        action: Action,
        users: &[UserId],
        origin: &PeerNode,
        peers: &[PeerNode],
    ) {
        let reason = match action {
            Action::Ban => format!("Mass ban synced from {}", origin.name),
            Action::Unban => format!("Mass unban synced from {}", origin.name),
        };

        for &user in users {
            for peer in peers.iter().filter(|p| p.id != origin.id) {
                self.attempt(action, user, peer, &reason).await;
            }
        }

        info!(
            origin = %origin.name,
            action = %action,
            count = users.len(),
            "mass sync attempted on all peers"
        );
    }

    /// One peer attempt: check current state, then apply.
    async fn attempt(
        &self,
        action: Action,
        user: UserId,
        peer: &PeerNode,
        reason: &str,
    ) -> PeerOutcome {
        let banned = match self.directory.fetch_ban_membership(peer.id).await {
            Ok(members) => members.contains(&user),
            Err(err) => {
                warn!(user = %user, node = %peer.name, error = %err, "failed to read ban list");
                return PeerOutcome::Failed(err.to_string());
            }
        };

        if action.is_satisfied_by(banned) {
            debug!(
                user = %user,
                node = %peer.name,
                action = %action,
                "already in desired state, skipping"
            );
            return PeerOutcome::Skipped;
        }

        let marker = self.echo.as_ref().map(|g| g.expect(action, user, peer.id));

        let applied = match action {
            Action::Ban => self.directory.ban(peer.id, user, reason).await,
            Action::Unban => self.directory.unban(peer.id, user, reason).await,
        };

        match applied {
            Ok(()) => {
                debug!(user = %user, node = %peer.name, action = %action, "applied");
                PeerOutcome::Success
            }
            Err(err) => {
                if let (Some(guard), Some(key)) = (&self.echo, marker) {
                    guard.withdraw(&key);
                }
                warn!(
                    user = %user,
                    node = %peer.name,
                    action = %action,
                    status = ?err.status_code(),
                    error = %err,
                    "peer sync failed"
                );
                PeerOutcome::Failed(err.to_string())
            }
        }
    }
}
