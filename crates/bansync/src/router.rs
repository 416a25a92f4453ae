//! Event intake and routing.
//!
//! Per event: echo check, burst check, then either the batch path (sync all
//! users, mass alert) or the single path (dedup claim, optional hold, sync,
//! result report). Terminal states are reported as [`RouteOutcome`].

use crate::config::SyncConfig;
use crate::dedup::{DedupStore, ExpiringSet};
use crate::detector::MassDetector;
use crate::directory::{NodeDirectory, UserResolver};
use crate::dispatcher::{DisplaySettings, NotificationDispatcher};
use crate::echo::EchoGuard;
use crate::executor::SyncExecutor;
use crate::sink::NotificationSink;
use bansync_core::{ActionEvent, DedupKey, MassBatch, Result, SyncResult, UserProfile};
use bansync_webhook::WebhookClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How routing of one event ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event was produced by our own propagation and dropped.
    Echo,
    /// The event completed a burst; the whole batch was synced.
    Batched(MassBatch),
    /// An identical event is in flight or was just handled.
    Suppressed,
    /// The event was held and a burst picked it up meanwhile.
    BatchConsumed,
    /// The event was synced on its own.
    Synced(SyncResult),
}

/// Routes moderation events through the propagation engine.
pub struct Router {
    detector: MassDetector,
    dedup: DedupStore,
    batched: ExpiringSet<DedupKey>,
    echo: Option<Arc<EchoGuard>>,
    executor: SyncExecutor,
    dispatcher: NotificationDispatcher,
    dedup_ttl: Duration,
    hold: Option<Duration>,
}

impl Router {
    /// Create a builder over the session-layer collaborators.
    pub fn builder(
        directory: Arc<dyn NodeDirectory>,
        resolver: Arc<dyn UserResolver>,
    ) -> RouterBuilder {
        RouterBuilder::new(directory, resolver)
    }

    /// Handle one event, containing any failure.
    ///
    /// This is the top-level entry point: nothing that goes wrong while
    /// routing an event escapes it.
    pub async fn handle(&self, event: ActionEvent) {
        if let Err(err) = self.route(&event).await {
            error!(
                user = %event.user_id,
                origin = %event.origin_node_name,
                action = %event.action,
                error = %err,
                "failed to route event"
            );
        }
    }

    /// Consume events until the channel closes, one task per event.
    ///
    /// Returns once the channel is closed and every spawned task finished.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ActionEvent>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Some(event) => {
                        let router = Arc::clone(&self);
                        tasks.spawn(async move { router.handle(event).await });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        debug!("event intake closed");
    }

    /// Route one event and report where it ended.
    pub async fn route(&self, event: &ActionEvent) -> Result<RouteOutcome> {
        if let Some(guard) = &self.echo {
            if guard.take_echo(event) {
                return Ok(RouteOutcome::Echo);
            }
        }

        if let Some(batch) = self.detector.observe(event) {
            self.run_batch(&batch).await?;
            return Ok(RouteOutcome::Batched(batch));
        }

        let key = event.dedup_key();
        if !self.dedup.try_insert_with_expiry(key, self.dedup_ttl) {
            debug!(key = %key, "duplicate event suppressed");
            return Ok(RouteOutcome::Suppressed);
        }

        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
            if self.batched.has(&key) {
                debug!(key = %key, "event handled by mass sync");
                return Ok(RouteOutcome::BatchConsumed);
            }
        }

        let origin = event.origin();
        info!(user = %event.user_id, origin = %origin.name, action = %event.action, "syncing");

        let peers = self.executor.list_nodes().await?;
        let result = self
            .executor
            .sync_one(event.action, event.user_id, &origin, &peers)
            .await;

        let user = match &event.user_name {
            Some(name) => UserProfile::new(event.user_id, name.clone()),
            None => self.dispatcher.resolve_user(event.user_id).await,
        };
        if let Err(err) = self
            .dispatcher
            .notify_single(&user, &origin, &result, event.action)
            .await
        {
            warn!(user = %event.user_id, error = %err, "failed to deliver sync result");
        }

        Ok(RouteOutcome::Synced(result))
    }

    async fn run_batch(&self, batch: &MassBatch) -> Result<()> {
        let origin = batch.origin();
        info!(
            origin = %origin.name,
            action = %batch.action,
            count = batch.user_ids.len(),
            "mass event detected"
        );

        if self.hold.is_some() {
            for &user in &batch.user_ids {
                let key = DedupKey {
                    action: batch.action,
                    user,
                    origin: batch.origin_node_id,
                };
                self.batched.insert_with_expiry(key, self.batched_ttl());
            }
        }

        let peers = self.executor.list_nodes().await?;
        self.executor
            .sync_batch(batch.action, &batch.user_ids, &origin, &peers)
            .await;

        if let Err(err) = self
            .dispatcher
            .notify_mass(&origin, &batch.user_ids, batch.action)
            .await
        {
            warn!(origin = %origin.name, error = %err, "failed to deliver mass alert");
        }
        Ok(())
    }

    /// Batch markers must outlive the hold of every member.
    fn batched_ttl(&self) -> Duration {
        self.hold.unwrap_or_default() * 2
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "event task aborted");
    }
}

/// Builder for a [`Router`]
pub struct RouterBuilder {
    directory: Arc<dyn NodeDirectory>,
    resolver: Arc<dyn UserResolver>,
    config: SyncConfig,
    sync_sink: Option<Arc<dyn NotificationSink>>,
    mass_sink: Option<Arc<dyn NotificationSink>>,
}

impl RouterBuilder {
    fn new(directory: Arc<dyn NodeDirectory>, resolver: Arc<dyn UserResolver>) -> Self {
        Self {
            directory,
            resolver,
            config: SyncConfig::default(),
            sync_sink: None,
            mass_sink: None,
        }
    }

    /// Engine configuration
    #[must_use]
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this sink for sync results instead of the configured webhook
    #[must_use]
    pub fn sync_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sync_sink = Some(sink);
        self
    }

    /// Use this sink for mass alerts instead of the configured webhook
    #[must_use]
    pub fn mass_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.mass_sink = Some(sink);
        self
    }

    /// Build the router. Fails on invalid configuration.
    pub fn build(self) -> Result<Router> {
        let config = self.config;
        config.validate()?;

        let notifications = &config.notifications;
        let sync_sink = match self.sync_sink {
            Some(sink) => Some(sink),
            None => webhook_sink(notifications.sync_result_webhook.as_deref())?,
        };
        let mass_sink = match self.mass_sink {
            Some(sink) => Some(sink),
            None => webhook_sink(notifications.mass_alert_webhook.as_deref())?,
        };

        let display = DisplaySettings {
            bot_name: notifications.bot_name.clone(),
            max_listed_users: notifications.max_listed_users,
        };
        let dispatcher = NotificationDispatcher::new(self.resolver, display)
            .with_sync_sink(sync_sink)
            .with_mass_sink(mass_sink);

        let echo = config
            .echo
            .enabled
            .then(|| Arc::new(EchoGuard::new(config.echo_ttl())));
        let mut executor = SyncExecutor::new(self.directory);
        if let Some(guard) = &echo {
            executor = executor.with_echo_guard(Arc::clone(guard));
        }

        Ok(Router {
            detector: MassDetector::new(config.mass.threshold, config.window()),
            dedup: DedupStore::new(),
            batched: ExpiringSet::new(),
            echo,
            executor,
            dispatcher,
            dedup_ttl: config.dedup_ttl(),
            hold: config.mass.hold_singles.then_some(config.hold()),
        })
    }
}

fn webhook_sink(url: Option<&str>) -> Result<Option<Arc<dyn NotificationSink>>> {
    url.map(|u| WebhookClient::new(u).map(|c| Arc::new(c) as Arc<dyn NotificationSink>))
        .transpose()
}
