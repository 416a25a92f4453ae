//! Webhook client implementation.

use crate::config::{RateLimitConfig, RetryConfig};
use bansync_core::{Result, SyncError};
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts JSON payloads to one sink address
#[derive(Clone)]
pub struct WebhookClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    url: Url,
    timeout: Duration,
    retry_config: RetryConfig,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The path holds the webhook token.
        f.debug_struct("WebhookClient")
            .field("host", &self.inner.url.host_str())
            .finish_non_exhaustive()
    }
}

impl WebhookClient {
    /// Create a client for the given sink URL using default settings
    pub fn new(url: &str) -> Result<Self> {
        WebhookClientBuilder::new(url).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(url: &str) -> WebhookClientBuilder {
        WebhookClientBuilder::new(url)
    }

    /// Deliver a payload, retrying retryable failures per the retry policy
    pub async fn post<B: Serialize + Sync>(&self, body: &B) -> Result<()> {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            match self.post_once(body).await {
                Err(err) if attempt < retry.max_retries && self.should_retry(&err) => {
                    let wait = match &err {
                        SyncError::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(*secs).min(retry.max_backoff),
                        _ => retry.backoff_for(attempt),
                    };
                    warn!(
                        error = %err,
                        attempt,
                        wait_ms = wait.as_millis(),
                        "webhook delivery failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn should_retry(&self, err: &SyncError) -> bool {
        match err {
            SyncError::RateLimited { .. } => self.inner.retry_config.retry_on_rate_limit,
            _ => err.is_retryable(),
        }
    }

    async fn post_once<B: Serialize + Sync>(&self, body: &B) -> Result<()> {
        self.inner.rate_limiter.until_ready().await;
        debug!(host = ?self.inner.url.host_str(), "POST webhook");

        let response = self
            .inner
            .http
            .post(self.inner.url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Self::handle_error(status.as_u16(), response).await
        }
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.inner.timeout.as_secs())
        } else if err.is_connect() {
            SyncError::Connection(err.to_string())
        } else {
            SyncError::Http(err.to_string())
        }
    }

    /// Convert an error response to a [`SyncError`]
    async fn handle_error(status: u16, response: reqwest::Response) -> Result<()> {
        let header_retry = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = response.text().await.unwrap_or_default();
        let json = serde_json::from_str::<serde_json::Value>(&body).ok();

        let message = json
            .as_ref()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        match status {
            401 | 403 => Err(SyncError::PermissionDenied(message)),
            404 => Err(SyncError::NotFound { resource: message }),
            429 => {
                // Discord reports fractional seconds in the body.
                let body_retry = json
                    .as_ref()
                    .and_then(|v| v.get("retry_after"))
                    .and_then(serde_json::Value::as_f64)
                    .map(|secs| secs.max(0.0).ceil() as u64);
                warn!("rate limited by webhook sink");
                Err(SyncError::RateLimited {
                    retry_after: header_retry.or(body_retry),
                })
            }
            _ => Err(SyncError::Api {
                code: status,
                message,
            }),
        }
    }
}

/// Builder for configuring a [`WebhookClient`]
pub struct WebhookClientBuilder {
    url: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    rate_limit: RateLimitConfig,
}

impl WebhookClientBuilder {
    /// Create a new builder for the given sink URL
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("bansync/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub const fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the outbound throttle
    #[must_use]
    pub const fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<WebhookClient> {
        let url = parse_sink_url(&self.url)?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let quota = Quota::per_second(
            NonZeroU32::new(self.rate_limit.per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(self.rate_limit.burst).unwrap_or(NonZeroU32::MIN));

        Ok(WebhookClient {
            inner: Arc::new(ClientInner {
                http,
                url,
                timeout: self.timeout,
                retry_config: self.retry_config,
                rate_limiter: RateLimiter::direct(quota),
            }),
        })
    }
}

/// Parse and check a sink address (http or https only)
pub fn parse_sink_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| SyncError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SyncError::InvalidUrl(format!(
            "unsupported scheme '{other}' (expected http or https)"
        ))),
    }
}
