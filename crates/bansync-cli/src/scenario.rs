//! Replay scenarios: a starting fleet state plus a timeline of moderation
//! events, run through a [`Router`] against an in-memory fleet.

use anyhow::{Context as _, Result};
use bansync::core::{Action, ActionEvent, NodeId, PeerNode, UserId};
use bansync::{FailureKind, MemoryFleet, Operation, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Latest event offset accepted (one day).
const MAX_OFFSET_MS: u64 = 86_400_000;

/// A recorded scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Nodes in directory order
    pub nodes: Vec<ScenarioNode>,
    /// Resolvable users
    #[serde(default)]
    pub users: Vec<ScenarioUser>,
    /// Failures injected for the whole run
    #[serde(default)]
    pub failures: Vec<ScenarioFailure>,
    /// Events observed on the nodes
    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioNode {
    pub id: NodeId,
    pub name: String,
    /// Users banned before the run
    #[serde(default)]
    pub bans: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioUser {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFailure {
    pub node: NodeId,
    pub operation: Operation,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioEvent {
    pub action: Action,
    pub user: UserId,
    /// Node the action was taken on
    pub node: NodeId,
    /// Milliseconds after the start of the replay
    #[serde(default)]
    pub offset_ms: u64,
    /// Display name carried by the notification, if any
    #[serde(default)]
    pub user_name: Option<String>,
}

impl Scenario {
    /// Read and check a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parse and check a scenario document.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut scenario: Self = serde_json::from_str(content)?;
        scenario.check()?;
        scenario.events.sort_by_key(|e| e.offset_ms);
        Ok(scenario)
    }

    fn check(&self) -> Result<()> {
        anyhow::ensure!(!self.nodes.is_empty(), "scenario has no nodes");

        let mut ids = HashSet::new();
        for node in &self.nodes {
            anyhow::ensure!(ids.insert(node.id), "duplicate node id {}", node.id);
        }
        for failure in &self.failures {
            let node = failure.node;
            anyhow::ensure!(ids.contains(&node), "failure on unknown node {node}");
        }
        for event in &self.events {
            anyhow::ensure!(ids.contains(&event.node), "event on unknown node {}", event.node);
            anyhow::ensure!(
                event.offset_ms <= MAX_OFFSET_MS,
                "event offset {}ms exceeds one day",
                event.offset_ms
            );
        }
        Ok(())
    }

    /// Build the starting fleet. Applied actions emit notifications.
    pub fn fleet(&self) -> MemoryFleet {
        let nodes = self.nodes.iter().map(|n| PeerNode::new(n.id, n.name.clone()));
        let fleet = MemoryFleet::new(nodes).with_event_emission();

        for node in &self.nodes {
            for &user in &node.bans {
                fleet.add_ban(node.id, user);
            }
        }
        for user in &self.users {
            fleet.add_user(user.id, user.name.clone());
        }
        for failure in &self.failures {
            fleet.fail(failure.node, failure.operation, failure.kind);
        }
        fleet
    }

    fn node_name(&self, id: NodeId) -> String {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map_or_else(|| id.to_string(), |n| n.name.clone())
    }
}

/// Final state of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Scenario events routed
    pub events: usize,
    /// Fleet notifications fed back after propagation
    pub echoes: usize,
    /// Ban/unban calls made on peers
    pub peer_calls: usize,
    /// Ban list of every node
    pub nodes: Vec<NodeBans>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeBans {
    pub id: NodeId,
    pub name: String,
    pub bans: Vec<UserId>,
}

/// Route every scenario event, and the notifications propagation caused.
///
/// Each event gets its own handling task. Whenever a task finishes, the
/// notifications the fleet emitted meanwhile are routed too, while their
/// echo markers are still live. With `realtime` the replay sleeps until
/// each event's offset; otherwise only the event timestamps are spaced out.
pub async fn replay(
    scenario: &Scenario,
    router: Arc<Router>,
    fleet: &MemoryFleet,
    realtime: bool,
) -> Result<ReplayReport> {
    let start = Utc::now();
    let clock = tokio::time::Instant::now();
    let mut tasks = JoinSet::new();
    let mut echoes = 0;

    for event in &scenario.events {
        if realtime {
            let due = tokio::time::sleep_until(clock + Duration::from_millis(event.offset_ms));
            tokio::pin!(due);
            loop {
                tokio::select! {
                    () = &mut due => break,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        log_join(joined);
                        echoes += feed_back(&router, fleet, &mut tasks);
                    }
                }
            }
        }

        // The action already happened on its own node.
        match event.action {
            Action::Ban => fleet.add_ban(event.node, event.user),
            Action::Unban => {
                fleet.remove_ban(event.node, event.user);
            }
        }

        let offset_ms = i64::try_from(event.offset_ms).unwrap_or_default();
        let name = scenario.node_name(event.node);
        let mut observed = ActionEvent::new(event.action, event.user, event.node, name)
            .at(start + chrono::Duration::milliseconds(offset_ms));
        if let Some(name) = &event.user_name {
            observed = observed.with_user_name(name.clone());
        }

        debug!(user = %event.user, node = %event.node, action = %event.action, "replaying event");
        spawn_handler(&router, &mut tasks, observed);
    }

    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
        echoes += feed_back(&router, fleet, &mut tasks);
    }

    let nodes = scenario
        .nodes
        .iter()
        .map(|n| NodeBans {
            id: n.id,
            name: n.name.clone(),
            bans: fleet.bans_of(n.id),
        })
        .collect();

    Ok(ReplayReport {
        events: scenario.events.len(),
        echoes,
        peer_calls: fleet.mutations().len(),
        nodes,
    })
}

fn spawn_handler(router: &Arc<Router>, tasks: &mut JoinSet<()>, event: ActionEvent) {
    let router = Arc::clone(router);
    tasks.spawn(async move { router.handle(event).await });
}

/// Route the notifications the fleet emitted for applied peer actions.
fn feed_back(router: &Arc<Router>, fleet: &MemoryFleet, tasks: &mut JoinSet<()>) -> usize {
    let emitted = fleet.take_emitted();
    if !emitted.is_empty() {
        debug!(count = emitted.len(), "feeding back fleet notifications");
    }
    let count = emitted.len();
    for event in emitted {
        spawn_handler(router, tasks, event);
    }
    count
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "replayed event task aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bansync::core::WebhookPayload;
    use bansync::{NotificationSink, SyncConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink(AtomicUsize);

    #[async_trait::async_trait]
    impl NotificationSink for CountingSink {
        async fn deliver(&self, _payload: &WebhookPayload) -> bansync::core::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const BURST: &str = r#"{
        "nodes": [
            { "id": 1, "name": "A" },
            { "id": 2, "name": "B" },
            { "id": 3, "name": "C", "bans": [9] }
        ],
        "users": [{ "id": 1, "name": "one" }],
        "failures": [{ "node": 3, "operation": "ban", "kind": "permission_denied" }],
        "events": [
            { "action": "ban", "user": 2, "node": 1, "offset_ms": 1000 },
            { "action": "ban", "user": 1, "node": 1 },
            { "action": "ban", "user": 3, "node": 1, "offset_ms": 2000 }
        ]
    }"#;

    fn immediate_router(fleet: &Arc<MemoryFleet>) -> Arc<Router> {
        let mut config = SyncConfig::default();
        config.mass.hold_singles = false;
        Arc::new(Router::builder(fleet.clone(), fleet.clone()).config(config).build().unwrap())
    }

    #[test]
    fn test_parse_sorts_events() {
        let scenario = Scenario::from_json(BURST).unwrap();
        let offsets: Vec<u64> = scenario.events.iter().map(|e| e.offset_ms).collect();
        assert_eq!(offsets, vec![0, 1000, 2000]);
        assert_eq!(scenario.events[0].user, UserId(1));
    }

    #[test]
    fn test_rejects_unknown_node() {
        let doc = r#"{ "nodes": [{ "id": 1, "name": "A" }],
                       "events": [{ "action": "ban", "user": 1, "node": 7 }] }"#;
        assert!(Scenario::from_json(doc).is_err());
    }

    #[test]
    fn test_rejects_duplicate_node() {
        let doc = r#"{ "nodes": [{ "id": 1, "name": "A" }, { "id": 1, "name": "B" }],
                       "events": [] }"#;
        assert!(Scenario::from_json(doc).is_err());
    }

    #[test]
    fn test_fleet_starts_from_scenario_state() {
        let scenario = Scenario::from_json(BURST).unwrap();
        let fleet = scenario.fleet();
        assert_eq!(fleet.bans_of(NodeId(3)), vec![UserId(9)]);
        assert_eq!(fleet.nodes().len(), 3);
    }

    #[tokio::test]
    async fn test_replay_reports_final_bans() {
        let scenario = Scenario::from_json(BURST).unwrap();
        let fleet = Arc::new(scenario.fleet());
        let router = immediate_router(&fleet);

        let report = replay(&scenario, router, &fleet, false).await.unwrap();

        assert_eq!(report.events, 3);
        let a = &report.nodes[0];
        assert_eq!(a.bans, vec![UserId(1), UserId(2), UserId(3)]);
        let b = &report.nodes[1];
        assert_eq!(b.bans, vec![UserId(1), UserId(2), UserId(3)]);
        // C denies bans throughout.
        assert_eq!(report.nodes[2].bans, vec![UserId(9)]);
        // Echoes from B are dropped, so A is never called.
        assert!(fleet.mutations().iter().all(|c| c.node != NodeId(1)));
    }

    #[tokio::test]
    async fn test_replay_unban() {
        let doc = r#"{
            "nodes": [
                { "id": 1, "name": "A", "bans": [5] },
                { "id": 2, "name": "B", "bans": [5] }
            ],
            "events": [{ "action": "unban", "user": 5, "node": 1 }]
        }"#;
        let scenario = Scenario::from_json(doc).unwrap();
        let fleet = Arc::new(scenario.fleet());
        let router = immediate_router(&fleet);

        let report = replay(&scenario, router, &fleet, false).await.unwrap();
        assert!(report.nodes.iter().all(|n| n.bans.is_empty()));
        assert_eq!(report.peer_calls, 1);
        assert_eq!(report.echoes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_echoes_are_dropped_while_markers_live() {
        let doc = r#"{
            "nodes": [
                { "id": 1, "name": "A" },
                { "id": 2, "name": "B" },
                { "id": 3, "name": "C" }
            ],
            "events": [
                { "action": "ban", "user": 1, "node": 1, "offset_ms": 0 },
                { "action": "ban", "user": 2, "node": 1, "offset_ms": 30000 }
            ]
        }"#;
        let scenario = Scenario::from_json(doc).unwrap();
        let fleet = Arc::new(scenario.fleet());
        let sink = Arc::new(CountingSink::default());
        let router = Router::builder(fleet.clone(), fleet.clone())
            .config(SyncConfig::default())
            .sync_sink(sink.clone())
            .build()
            .unwrap();

        let report = replay(&scenario, Arc::new(router), &fleet, true).await.unwrap();

        // Two peers per event; every echo is recognised, none re-synced.
        assert_eq!(report.echoes, 4);
        assert_eq!(report.peer_calls, 4);
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
        assert!(report.nodes.iter().all(|n| n.bans == vec![UserId(1), UserId(2)]));
    }
}
