use serde::{Deserialize, Serialize};

use super::event::Action;

/// JSON body delivered to a notification sink (Discord webhook format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Name the message is posted under
    pub username: String,

    /// Rich embeds
    pub embeds: Vec<Embed>,
}

/// A single rich embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Embed title
    pub title: String,

    /// Sidebar color (RGB)
    pub color: u32,

    /// Body text
    pub description: String,

    /// Labeled sections
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,

    /// Footer identity
    pub footer: EmbedFooter,

    /// ISO-8601 timestamp
    pub timestamp: String,
}

/// A labeled section in an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Section label
    pub name: String,

    /// Section content
    pub value: String,
}

impl EmbedField {
    /// Create a field
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Embed footer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    /// Footer text
    pub text: String,
}

/// Embed colors per action
pub mod colors {
    use super::Action;

    /// Red, for bans
    pub const BAN: u32 = 0x00ff_0000;
    /// Teal, for unbans
    pub const UNBAN: u32 = 0x0000_cc99;

    /// Color for an action
    #[must_use]
    pub const fn for_action(action: Action) -> u32 {
        match action {
            Action::Ban => BAN,
            Action::Unban => UNBAN,
        }
    }
}
