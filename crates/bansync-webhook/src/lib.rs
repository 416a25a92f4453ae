//! HTTP delivery of ban-sync notifications.
//!
//! This crate provides [`WebhookClient`], which posts JSON payloads to a
//! single sink address with retry and client-side rate limiting.

#![doc(html_root_url = "https://docs.rs/bansync-webhook/1.0.0")]

mod client;
mod config;

pub use bansync_core::{Result, SyncError};
pub use client::{parse_sink_url, WebhookClient, WebhookClientBuilder};
pub use config::*;
