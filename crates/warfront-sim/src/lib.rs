//! Authoritative simulation engine for WARFRONT.
//!
//! Owns the hecs ECS world, validates remote requests, runs every system in
//! a fixed order each tick, and produces `GameStateSnapshot`s for the
//! replication layer.

pub mod engine;
pub mod ledger;
pub mod net_ids;
pub mod physics;
pub mod spatial;
pub mod systems;
pub mod world_setup;

pub use engine::{EngineError, SimConfig, SimulationEngine};
pub use warfront_core as core;
