//! Result reporting.
//!
//! Two payload shapes: a per-event sync result and a mass-event alert.
//! Each goes to its own sink; a missing sink turns delivery into a no-op.

use crate::directory::UserResolver;
use crate::sink::NotificationSink;
use bansync_core::{
    colors, Action, Embed, EmbedField, EmbedFooter, PeerNode, Result, SyncResult, UserId,
    UserProfile, WebhookPayload,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::debug;

/// Presentation settings shared by both payload shapes.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    /// Webhook username and footer identity
    pub bot_name: String,
    /// Users listed by tag in a mass alert
    pub max_listed_users: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            bot_name: String::from("Ban-Sync Bot"),
            max_listed_users: 5,
        }
    }
}

/// Formats and delivers sync notifications.
pub struct NotificationDispatcher {
    sync_sink: Option<Arc<dyn NotificationSink>>,
    mass_sink: Option<Arc<dyn NotificationSink>>,
    resolver: Arc<dyn UserResolver>,
    display: DisplaySettings,
}

impl NotificationDispatcher {
    /// Create a dispatcher with no sinks configured.
    pub fn new(resolver: Arc<dyn UserResolver>, display: DisplaySettings) -> Self {
        Self {
            sync_sink: None,
            mass_sink: None,
            resolver,
            display,
        }
    }

    /// Sink for single-event results
    #[must_use]
    pub fn with_sync_sink(mut self, sink: Option<Arc<dyn NotificationSink>>) -> Self {
        self.sync_sink = sink;
        self
    }

    /// Sink for mass-event alerts
    #[must_use]
    pub fn with_mass_sink(mut self, sink: Option<Arc<dyn NotificationSink>>) -> Self {
        self.mass_sink = sink;
        self
    }

    /// Resolve a user for display; failures become a placeholder name.
    pub async fn resolve_user(&self, user: UserId) -> UserProfile {
        match self.resolver.fetch_user(user).await {
            Ok(profile) => profile,
            Err(err) => {
                debug!(user = %user, error = %err, "user lookup failed, using placeholder");
                UserProfile::new(user, "Unknown User")
            }
        }
    }

    /// Report a single-event sync.
    pub async fn notify_single(
        &self,
        user: &UserProfile,
        origin: &PeerNode,
        result: &SyncResult,
        action: Action,
    ) -> Result<()> {
        let Some(sink) = &self.sync_sink else {
            return Ok(());
        };
        let payload = self.single_payload(user, origin, result, action, Utc::now());
        sink.deliver(&payload).await
    }

    /// Report a mass event.
    pub async fn notify_mass(
        &self,
        origin: &PeerNode,
        users: &[UserId],
        action: Action,
    ) -> Result<()> {
        let Some(sink) = &self.mass_sink else {
            return Ok(());
        };
        let tags = self.resolve_tags(users).await;
        let payload = self.mass_payload(origin, &tags, users.len(), action, Utc::now());
        sink.deliver(&payload).await
    }

    /// Tags for the first `max_listed_users` users, in order.
    pub async fn resolve_tags(&self, users: &[UserId]) -> Vec<String> {
        let mut tags = Vec::new();
        for &user in users.iter().take(self.display.max_listed_users) {
            let tag = match self.resolver.fetch_user(user).await {
                Ok(profile) => profile.tag(),
                Err(_) => UserProfile::placeholder_tag(user),
            };
            tags.push(tag);
        }
        tags
    }

    /// Build the single-event payload.
    pub fn single_payload(
        &self,
        user: &UserProfile,
        origin: &PeerNode,
        result: &SyncResult,
        action: Action,
        now: DateTime<Utc>,
    ) -> WebhookPayload {
        let description = [
            format!("**User:** {}", user.tag()),
            format!("**Origin Server:** {}", origin.name),
        ]
        .join("\n");

        let fields = vec![
            EmbedField::new(
                format!("Successfully {} In", action.past_tense()),
                bullet_list(&result.success_node_names()),
            ),
            EmbedField::new(
                format!("Failed To {} In", action.verb()),
                bullet_list(&result.failed_node_names()),
            ),
        ];

        self.payload(format!("{} Sync Result", action.verb()), action, description, fields, now)
    }

    /// Build the mass-alert payload from resolved tags.
    ///
    /// `total` is the number of users in the batch; anything beyond the
    /// listed tags is summarised as `+ N more`.
    pub fn mass_payload(
        &self,
        origin: &PeerNode,
        tags: &[String],
        total: usize,
        action: Action,
        now: DateTime<Utc>,
    ) -> WebhookPayload {
        let mut users = tags.join("\n");
        let extra = total.saturating_sub(tags.len());
        if extra > 0 {
            users.push_str(&format!("\n+ {extra} more"));
        }
        if users.is_empty() {
            users = String::from("N/A");
        }

        let description = [
            format!("**Origin Server:** {}", origin.name),
            String::from("**Users:**"),
            users,
        ]
        .join("\n");

        self.payload(
            format!("Mass {} Sync Triggered", action.verb()),
            action,
            description,
            Vec::new(),
            now,
        )
    }

    fn payload(
        &self,
        title: String,
        action: Action,
        description: String,
        fields: Vec<EmbedField>,
        now: DateTime<Utc>,
    ) -> WebhookPayload {
        WebhookPayload {
            username: self.display.bot_name.clone(),
            embeds: vec![Embed {
                title,
                color: colors::for_action(action),
                description,
                fields,
                footer: EmbedFooter {
                    text: self.display.bot_name.clone(),
                },
                timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            }],
        }
    }
}

fn bullet_list(names: &[&str]) -> String {
    if names.is_empty() {
        String::from("N/A")
    } else {
        names
            .iter()
            .map(|n| format!("• {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
