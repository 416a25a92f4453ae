//! bansync - ban/unban propagation tools
//!
//! Manages the engine configuration and replays recorded moderation events.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bansync_cli::run().await
}
