//! Propagates ban/unban actions observed on one server to every other
//! server the operator controls.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bansync::{MemoryFleet, Router, SyncConfig};
//! use bansync::core::{Action, ActionEvent, NodeId, PeerNode, UserId};
//!
//! #[tokio::main]
//! async fn main() -> bansync::core::Result<()> {
//!     let fleet = Arc::new(MemoryFleet::new([
//!         PeerNode::new(NodeId(1), "Site A"),
//!         PeerNode::new(NodeId(2), "Site B"),
//!     ]));
//!
//!     let router = Router::builder(fleet.clone(), fleet.clone())
//!         .config(SyncConfig::default())
//!         .build()?;
//!
//!     router
//!         .handle(ActionEvent::new(Action::Ban, UserId(42), NodeId(1), "Site A"))
//!         .await;
//!     assert!(fleet.is_banned(NodeId(2), UserId(42)));
//!     Ok(())
//! }
//! ```
//!
//! # Components
//!
//! - [`Router`] - event intake: echo check, burst check, dedup, sync, report
//! - [`DedupStore`] - self-expiring (action, user, origin) keys
//! - [`MassDetector`] - per-(node, action) sliding window burst detection
//! - [`SyncExecutor`] - sequential, partial-failure tolerant fan-out
//! - [`NotificationDispatcher`] - single-event and mass-alert payloads
//! - [`EchoGuard`] - drops notifications caused by our own propagation
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for webhook delivery (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/bansync/1.0.0")]

mod config;
mod dedup;
mod detector;
mod directory;
mod dispatcher;
mod echo;
mod executor;
mod memory;
mod router;
mod sink;

pub use config::{EchoConfig, MassConfig, NotificationConfig, SyncConfig};
pub use dedup::{DedupStore, ExpiringSet};
pub use detector::MassDetector;
pub use directory::{NodeDirectory, UserResolver};
pub use dispatcher::{DisplaySettings, NotificationDispatcher};
pub use echo::{EchoGuard, EchoKey};
pub use executor::SyncExecutor;
pub use memory::{FailureKind, FleetCall, MemoryFleet, Operation};
pub use router::{RouteOutcome, Router, RouterBuilder};
pub use sink::NotificationSink;

// Re-export the shared types and the webhook client
pub use bansync_core as core;
pub use bansync_webhook::{RateLimitConfig, RetryConfig, WebhookClient, WebhookClientBuilder};

// Re-export runtime for convenience
pub use async_trait::async_trait;
pub use tokio;
