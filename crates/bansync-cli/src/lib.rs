//! # bansync-cli
//!
//! Command-line front end for the ban/unban propagation engine.
//!
//! ## Features
//!
//! - **Configuration**: show, edit and initialise the engine's TOML config
//! - **Replay**: run a recorded scenario against an in-memory fleet and
//!   print where every user ended up banned
//! - **Output formats**: pretty text or JSON

pub mod cli;
pub mod config;
pub mod output;
pub mod scenario;

pub use cli::run;
