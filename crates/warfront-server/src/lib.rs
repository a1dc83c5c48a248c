//! WARFRONT headless server.
//!
//! Runs the simulation engine on a fixed-rate thread, feeds it remote
//! requests through a channel and keeps the latest snapshot for polling.

pub mod game_loop;
pub mod orders;
pub mod state;

pub use warfront_core as core;
