use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation action mirrored across nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// User was banned
    Ban,
    /// User was unbanned
    Unban,
}

impl Action {
    /// Imperative form used in labels ("Ban", "Unban")
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Ban => "Ban",
            Self::Unban => "Unban",
        }
    }

    /// Past-tense form used in labels ("Banned", "Unbanned")
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Ban => "Banned",
            Self::Unban => "Unbanned",
        }
    }

    /// Whether a peer where the user's ban state is `is_banned` already
    /// reflects this action
    #[must_use]
    pub const fn is_satisfied_by(self, is_banned: bool) -> bool {
        match self {
            Self::Ban => is_banned,
            Self::Unban => !is_banned,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ban => write!(f, "ban"),
            Self::Unban => write!(f, "unban"),
        }
    }
}

/// Platform user id (snowflake)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node (server/guild) id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A server managed by the operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerNode {
    /// Node id
    pub id: NodeId,

    /// Human-readable node name
    pub name: String,
}

impl PeerNode {
    /// Create a node reference
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Resolved user identity for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    pub id: UserId,

    /// Display name (username)
    pub display_name: String,
}

impl UserProfile {
    /// Create a profile
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// Tag used in notifications: ``name (`id`)``
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{} (`{}`)", self.display_name, self.id)
    }

    /// Tag for a user whose lookup failed
    #[must_use]
    pub fn placeholder_tag(id: UserId) -> String {
        format!("Unknown User (`{id}`)")
    }
}

/// A moderation action observed on its origin node. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Ban or unban
    pub action: Action,

    /// Affected user
    pub user_id: UserId,

    /// Display name carried by the notification, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Node the action was observed on
    pub origin_node_id: NodeId,

    /// Name of the origin node
    pub origin_node_name: String,

    /// When the action was observed
    pub timestamp: DateTime<Utc>,
}

impl ActionEvent {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn new(
        action: Action,
        user_id: UserId,
        origin_node_id: NodeId,
        origin_node_name: impl Into<String>,
    ) -> Self {
        Self {
            action,
            user_id,
            user_name: None,
            origin_node_id,
            origin_node_name: origin_node_name.into(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the user's display name
    #[must_use]
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// Override the observation timestamp
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The origin node as a [`PeerNode`]
    #[must_use]
    pub fn origin(&self) -> PeerNode {
        PeerNode::new(self.origin_node_id, self.origin_node_name.clone())
    }

    /// Identity used to suppress reprocessing
    #[must_use]
    pub const fn dedup_key(&self) -> DedupKey {
        DedupKey {
            action: self.action,
            user: self.user_id,
            origin: self.origin_node_id,
        }
    }
}

/// Composite identity of an event: (action, user, origin node)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Ban or unban
    pub action: Action,
    /// Affected user
    pub user: UserId,
    /// Origin node
    pub origin: NodeId,
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.action, self.user, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Unban).unwrap(), "\"unban\"");
        let parsed: Action = serde_json::from_str("\"ban\"").unwrap();
        assert_eq!(parsed, Action::Ban);
    }

    #[test]
    fn test_action_satisfied() {
        assert!(Action::Ban.is_satisfied_by(true));
        assert!(!Action::Ban.is_satisfied_by(false));
        assert!(Action::Unban.is_satisfied_by(false));
        assert!(!Action::Unban.is_satisfied_by(true));
    }

    #[test]
    fn test_dedup_key_distinguishes_action_and_origin() {
        let ban = ActionEvent::new(Action::Ban, UserId(42), NodeId(1), "A");
        let unban = ActionEvent::new(Action::Unban, UserId(42), NodeId(1), "A");
        let other_node = ActionEvent::new(Action::Ban, UserId(42), NodeId(2), "B");

        assert_ne!(ban.dedup_key(), unban.dedup_key());
        assert_ne!(ban.dedup_key(), other_node.dedup_key());
        assert_eq!(ban.dedup_key().to_string(), "ban-42-1");
    }

    #[test]
    fn test_user_tags() {
        let profile = UserProfile::new(UserId(7), "raider");
        assert_eq!(profile.tag(), "raider (`7`)");
        assert_eq!(UserProfile::placeholder_tag(UserId(7)), "Unknown User (`7`)");
    }

    #[test]
    fn test_event_deserializes_without_user_name() {
        let json = r#"{
            "action": "ban",
            "user_id": 42,
            "origin_node_id": 1,
            "origin_node_name": "Site A",
            "timestamp": "2024-05-01T12:00:00Z"
        }"#;
        let event: ActionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.user_id, UserId(42));
        assert!(event.user_name.is_none());
        assert_eq!(event.origin().name, "Site A");
    }
}
