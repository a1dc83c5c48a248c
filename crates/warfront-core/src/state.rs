//! Game state snapshot: the authoritative view handed to the replication
//! layer after each tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::{ClientNotification, SimEvent};
use crate::types::{ClientId, NetId, SimTime, Team};

/// Complete state produced after each tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub time: SimTime,
    pub wave: WaveView,
    /// Every networked object, sorted by `NetId`.
    pub objects: Vec<ObjectView>,
    pub ledgers: Vec<LedgerView>,
    pub notifications: Vec<ClientNotification>,
    pub events: Vec<SimEvent>,
}

/// Replicated attributes of one networked object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectView {
    pub net_id: NetId,
    pub kind: ObjectKind,
    /// Catalog index within the catalog matching `kind`, absent for resource nodes.
    pub template: Option<usize>,
    pub team: Option<Team>,
    pub owner: Option<ClientId>,
    pub position: Vec3,
    pub health: Option<f32>,
    pub max_health: Option<f32>,
    pub move_phase: Option<MovePhase>,
    /// Target of the current attack, if any.
    pub target: Option<NetId>,
    /// Production progress 0..1 while a facility is busy.
    pub production: Option<f32>,
    /// Construction progress 0..1 while a structure is being built.
    pub construction: Option<f32>,
    /// Amount carried by a gathering worker or left in a resource node.
    pub resources: Option<u32>,
    pub fuse_remaining: Option<f32>,
}

/// Economy state of one client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerView {
    pub client: ClientId,
    pub currency: u32,
    pub population: u32,
    pub population_cap: u32,
}

/// Wave orchestrator status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveView {
    pub phase: usize,
    pub phase_name: String,
    pub kills: u32,
    pub spawned: u32,
}
