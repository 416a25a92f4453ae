//! Configuration file management.

use anyhow::{Context as _, Result};
use bansync::SyncConfig;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the sync-result sink.
pub const SYNC_WEBHOOK_ENV: &str = "WEBHOOK_URL";
/// Environment variable overriding the mass-alert sink.
pub const MASS_WEBHOOK_ENV: &str = "WEBHOOK_OUTPUT";

/// Keys accepted by `bansync config set`.
pub const KEYS: &[(&str, &str)] = &[
    ("dedup_ttl_ms", "How long a handled event suppresses duplicates (ms)"),
    ("mass.threshold", "Events in one window that trigger a mass sync"),
    ("mass.window_ms", "Sliding window length (ms)"),
    ("mass.hold_singles", "Hold single events one window before syncing (true/false)"),
    ("mass.hold_grace_ms", "Extra hold for late burst members (ms)"),
    ("echo.enabled", "Drop notifications caused by our own propagation (true/false)"),
    ("echo.ttl_ms", "How long an echo marker lives (ms)"),
    ("notifications.sync_result_webhook", "Sync result sink URL (\"none\" to clear)"),
    ("notifications.mass_alert_webhook", "Mass alert sink URL (\"none\" to clear)"),
    ("notifications.bot_name", "Webhook username and footer"),
    ("notifications.max_listed_users", "Users listed in a mass alert"),
];

/// Default config file path.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "bansync")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

/// The explicit path, or the default one.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    explicit.map_or_else(default_path, |p| Ok(p.to_path_buf()))
}

/// Load the file at `path`, defaults when it does not exist.
pub fn load(path: &Path) -> Result<SyncConfig> {
    SyncConfig::load(path).with_context(|| format!("invalid config file {}", path.display()))
}

/// Load the file and apply environment overrides.
pub fn load_effective(path: &Path) -> Result<SyncConfig> {
    let mut config = load(path)?;
    apply_overrides(
        &mut config,
        std::env::var(SYNC_WEBHOOK_ENV).ok(),
        std::env::var(MASS_WEBHOOK_ENV).ok(),
    );
    config.validate().context("invalid webhook override")?;
    Ok(config)
}

/// Replace the sink URLs with non-empty overrides.
pub fn apply_overrides(
    config: &mut SyncConfig,
    sync_webhook: Option<String>,
    mass_webhook: Option<String>,
) {
    if let Some(url) = sync_webhook.filter(|u| !u.trim().is_empty()) {
        config.notifications.sync_result_webhook = Some(url);
    }
    if let Some(url) = mass_webhook.filter(|u| !u.trim().is_empty()) {
        config.notifications.mass_alert_webhook = Some(url);
    }
}

/// Save configuration to `path`, creating parent directories.
pub fn save(config: &SyncConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = config.to_toml()?;
    std::fs::write(path, content)?;

    Ok(())
}

/// Set one dotted key from its string form.
pub fn set_value(config: &mut SyncConfig, key: &str, value: &str) -> Result<()> {
    let optional = |v: &str| match v {
        "" | "none" => None,
        url => Some(url.to_string()),
    };

    match key {
        "dedup_ttl_ms" => config.dedup_ttl_ms = value.parse()?,
        "mass.threshold" => config.mass.threshold = value.parse()?,
        "mass.window_ms" => config.mass.window_ms = value.parse()?,
        "mass.hold_singles" => config.mass.hold_singles = value.parse()?,
        "mass.hold_grace_ms" => config.mass.hold_grace_ms = value.parse()?,
        "echo.enabled" => config.echo.enabled = value.parse()?,
        "echo.ttl_ms" => config.echo.ttl_ms = value.parse()?,
        "notifications.sync_result_webhook" => {
            config.notifications.sync_result_webhook = optional(value);
        }
        "notifications.mass_alert_webhook" => {
            config.notifications.mass_alert_webhook = optional(value);
        }
        "notifications.bot_name" => config.notifications.bot_name = value.to_string(),
        "notifications.max_listed_users" => {
            config.notifications.max_listed_users = value.parse()?;
        }
        _ => {
            let available: Vec<String> = KEYS
                .iter()
                .map(|(k, help)| format!("  {k:<36} {help}"))
                .collect();
            anyhow::bail!(
                "Unknown config key: {}\n\nAvailable keys:\n{}",
                key,
                available.join("\n")
            );
        }
    }

    config.validate()?;
    Ok(())
}
