//! Engine configuration.

use bansync_core::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a handled event suppresses identical events (ms).
    #[serde(default = "default_dedup_ttl")]
    pub dedup_ttl_ms: u64,

    /// Burst detection.
    #[serde(default)]
    pub mass: MassConfig,

    /// Suppression of notifications caused by our own propagation.
    #[serde(default)]
    pub echo: EchoConfig,

    /// Result reporting.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Burst ("mass event") detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassConfig {
    /// Events within the window that make a burst.
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Sliding window length (ms).
    #[serde(default = "default_window")]
    pub window_ms: u64,

    /// Hold single events for one window before syncing them, so the
    /// members of a burst are only propagated by the batch.
    #[serde(default = "default_true")]
    pub hold_singles: bool,

    /// Extra hold time beyond the window (ms), for burst members that
    /// arrive later than their timestamps.
    #[serde(default = "default_hold_grace")]
    pub hold_grace_ms: u64,
}

/// Echo suppression settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Drop ban/unban notifications that our own propagation produced.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long an expected echo is remembered (ms).
    #[serde(default = "default_echo_ttl")]
    pub ttl_ms: u64,
}

/// Notification sink settings. Unset sinks make delivery a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Sink for single-event sync results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_result_webhook: Option<String>,

    /// Sink for mass-event alerts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_alert_webhook: Option<String>,

    /// Webhook username and footer identity.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Users listed by tag in a mass alert.
    #[serde(default = "default_max_listed")]
    pub max_listed_users: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_ms: default_dedup_ttl(),
            mass: MassConfig::default(),
            echo: EchoConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for MassConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_ms: default_window(),
            hold_singles: true,
            hold_grace_ms: default_hold_grace(),
        }
    }
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_echo_ttl(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sync_result_webhook: None,
            mass_alert_webhook: None,
            bot_name: default_bot_name(),
            max_listed_users: default_max_listed(),
        }
    }
}

impl SyncConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| SyncError::Config(format!("failed to read {}: {e}", path.display())))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.mass.threshold == 0 {
            return Err(SyncError::Config("mass.threshold must be at least 1".into()));
        }
        if self.mass.window_ms == 0 {
            return Err(SyncError::Config("mass.window_ms must be positive".into()));
        }
        if self.dedup_ttl_ms == 0 {
            return Err(SyncError::Config("dedup_ttl_ms must be positive".into()));
        }
        if self.echo.enabled && self.echo.ttl_ms == 0 {
            return Err(SyncError::Config("echo.ttl_ms must be positive".into()));
        }
        for url in [
            &self.notifications.sync_result_webhook,
            &self.notifications.mass_alert_webhook,
        ]
        .into_iter()
        .flatten()
        {
            bansync_webhook::parse_sink_url(url)?;
        }
        Ok(())
    }

    /// Dedup entry lifetime.
    pub const fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_ms)
    }

    /// Burst window length.
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.mass.window_ms)
    }

    /// How long a single event waits for a burst to absorb it.
    pub const fn hold(&self) -> Duration {
        Duration::from_millis(self.mass.window_ms.saturating_add(self.mass.hold_grace_ms))
    }

    /// Echo marker lifetime.
    pub const fn echo_ttl(&self) -> Duration {
        Duration::from_millis(self.echo.ttl_ms)
    }
}

// Default value functions for serde.
const fn default_dedup_ttl() -> u64 {
    10_000
}

const fn default_threshold() -> usize {
    3
}

const fn default_window() -> u64 {
    5_000
}

const fn default_hold_grace() -> u64 {
    1_000
}

const fn default_echo_ttl() -> u64 {
    10_000
}

const fn default_max_listed() -> usize {
    5
}

const fn default_true() -> bool {
    true
}

fn default_bot_name() -> String {
    String::from("Ban-Sync Bot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.dedup_ttl(), Duration::from_secs(10));
        assert_eq!(config.mass.threshold, 3);
        assert_eq!(config.window(), Duration::from_secs(5));
        assert!(config.mass.hold_singles);
        assert_eq!(config.hold(), Duration::from_secs(6));
        assert!(config.echo.enabled);
        assert!(config.notifications.sync_result_webhook.is_none());
        assert_eq!(config.notifications.max_listed_users, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SyncConfig::from_toml(
            r#"
            [mass]
            threshold = 5

            [notifications]
            mass_alert_webhook = "https://discord.com/api/webhooks/1/abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.mass.threshold, 5);
        assert_eq!(config.mass.window_ms, 5_000);
        assert_eq!(config.dedup_ttl_ms, 10_000);
        assert_eq!(
            config.notifications.mass_alert_webhook.as_deref(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(config.notifications.bot_name, "Ban-Sync Bot");
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = SyncConfig::from_toml("[mass]\nthreshold = 0\n").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_sink_url() {
        let toml = "[notifications]\nsync_result_webhook = \"nope\"\n";
        let err = SyncConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SyncConfig::default();
        config.notifications.sync_result_webhook = Some("https://example.com/hook".into());
        let parsed = SyncConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = SyncConfig::load(Path::new("/tmp/nonexistent_bansync_config.toml")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_file() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "dedup_ttl_ms = 2500\n[echo]\nenabled = false\n").unwrap();

        let config = SyncConfig::load(tmpfile.path()).unwrap();
        assert_eq!(config.dedup_ttl(), Duration::from_millis(2500));
        assert!(!config.echo.enabled);
    }
}
