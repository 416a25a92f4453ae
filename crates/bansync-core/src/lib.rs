//! Core types and errors for the ban-sync propagation engine.
//!
//! This crate provides the foundational types shared by the engine, the
//! webhook client and the CLI:
//!
//! - **Types**: moderation events, peer nodes, per-peer sync outcomes and
//!   the webhook payload model
//! - **Errors**: the remote-call error taxonomy in [`SyncError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use bansync_core::{Action, ActionEvent, NodeId, UserId};
//!
//! let event = ActionEvent::new(Action::Ban, UserId(42), NodeId(1), "Site A");
//! assert_eq!(event.dedup_key().user, UserId(42));
//! ```

#![doc(html_root_url = "https://docs.rs/bansync-core/1.0.0")]

mod error;
pub mod types;

pub use error::{Result, SyncError};
pub use types::*;
