//! ECS components for hecs entities.
//!
//! Components are plain data. Game logic lives in systems, not components.
//! Handles (`hecs::Entity`) stored here are local to the authoritative
//! process and never leave it; snapshots translate them to `NetId`s.

use glam::{Vec2, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::ClientId;

// Position, Team and NetId are defined in types.rs and used directly as components.

/// Hit points. An object with `current <= 0` is removed by the death pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }
}

/// The client allowed to issue requests through this object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner(pub ClientId);

/// Marks a player-controlled mobile unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Unit {
    /// Catalog index the unit was produced from.
    pub template: usize,
    /// Population held by this unit, released on death.
    pub population: u32,
}

/// Marks a player structure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Structure {
    pub template: usize,
    /// Population cap granted once construction completes.
    pub housing: u32,
}

/// Marks a wave-spawned enemy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hostile {
    pub template: usize,
}

/// Excludes an object from the targeting grid (walls and similar blockers).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NonTargetable;

/// Axis-aligned footprint on the ground plane, centred on the object's position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Footprint {
    pub half_extents: Vec2,
}

/// A moving agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Agent {
    /// Ground speed in units per second.
    pub speed: f32,
    /// Collision radius on the ground plane.
    pub obstacle_radius: f32,
    pub agent_type: AgentType,
}

/// What the object was last told (or decided) to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Intent {
    #[default]
    None,
    Move,
    Attack(Entity),
    Gather(Entity),
    Build(Entity),
}

/// Requested destination and progress along the straightened path.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MovementGoal {
    pub destination: Vec3,
    /// Set when a new destination is requested; cleared by the pathing stage.
    pub dirty: bool,
    pub phase: MovePhase,
    pub current_waypoint: usize,
    pub total_waypoints: usize,
}

impl MovementGoal {
    /// Request a new destination. The pathing stage picks it up this tick.
    pub fn request(&mut self, destination: Vec3) {
        self.destination = destination;
        self.dirty = true;
        self.phase = MovePhase::PathPending;
    }
}

/// The waypoint currently being walked. Disabled once the agent arrives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WaypointState {
    pub current: Vec3,
    pub next: Vec3,
    pub has_next: bool,
    pub arrival_radius: f32,
    pub enabled: bool,
}

/// Straightened waypoint list backing `WaypointState`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathBuffer {
    pub points: Vec<Vec3>,
}

/// Combat target and where it was last seen.
#[derive(Debug, Clone, Copy)]
pub struct AggroTarget {
    pub target: Entity,
    pub last_known: Vec3,
}

/// Auto-firing weapon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weapon {
    pub range: f32,
    pub damage: f32,
    pub cooldown_secs: f32,
    /// Seconds until the weapon can fire again.
    pub timer: f32,
    /// Radius within which idle holders pick their own targets.
    pub acquire_radius: f32,
}

/// Single-slot production queue of a facility.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    /// Unit catalog index being produced.
    pub producing: usize,
    pub progress: f32,
    pub duration: f32,
    /// Population reserved for the unit in production. Handed back if the
    /// facility dies first.
    pub population: u32,
    pub active: bool,
}

/// Structure still being built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Construction {
    pub progress: f32,
    pub duration: f32,
}

/// Accepts deposited resources from workers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceCenter;

/// Harvestable stock. At most one worker may occupy a node.
#[derive(Debug, Clone, Copy)]
pub struct ResourceNode {
    pub remaining: u32,
    pub occupant: Option<Entity>,
}

/// Gathering capability of a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Worker {
    pub capacity: u32,
    /// Seconds needed to fill the capacity.
    pub harvest_secs: f32,
}

/// Active harvest loop of a worker.
#[derive(Debug, Clone, Copy)]
pub struct GatheringState {
    pub node: Entity,
    pub return_point: Entity,
    pub carried: u32,
    pub phase: GatherPhase,
    pub timer: f32,
}

/// Radius damage released when the object self-destructs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplosionData {
    pub radius: f32,
    pub damage: f32,
    /// Seconds between the request and the blast. Zero detonates immediately.
    pub fuse_delay: f32,
}

/// Armed fuse. Negative `remaining` means not armed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelfDestructCountdown {
    pub remaining: f32,
}

impl Default for SelfDestructCountdown {
    fn default() -> Self {
        Self { remaining: -1.0 }
    }
}

impl SelfDestructCountdown {
    pub fn is_armed(&self) -> bool {
        self.remaining >= 0.0
    }
}
