//! Simulation constants that are not meant to be tuned per match.
//!
//! Tunables (cell sizes, costs, wave phases) live in `settings`.

use crate::types::Team;

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick.
pub const DT: f32 = 1.0 / TICK_RATE as f32;

// --- Teams ---

/// Team of the wave faction. Client ids start at 1 so they never collide with it.
pub const HOSTILE_TEAM: Team = Team(0);

// --- Movement ---

/// Minimum slack between an agent's obstacle radius and its arrival radius.
/// Without it an agent can orbit a waypoint it is physically unable to reach.
pub const ARRIVAL_EPSILON: f32 = 0.05;

/// Maximum number of points in a straightened path.
pub const MAX_PATH_POINTS: usize = 32;

/// Squared distance below which two path points are treated as the same point.
pub const POINT_MERGE_EPSILON_SQ: f32 = 1e-6;

/// Gap left between a facility footprint and a freshly produced unit.
pub const SPAWN_CLEARANCE: f32 = 0.5;

/// Fraction of overlap resolved per tick by agent separation.
pub const SEPARATION_STRENGTH: f32 = 0.5;

// --- Construction ---

/// Fraction of max health a structure starts with when placed.
pub const CONSTRUCTION_START_HEALTH: f32 = 0.1;

// --- Waves ---

/// Candidate slots tried per ring when placing a spawn batch.
pub const SPAWN_SLOTS_PER_RING: usize = 8;

/// Rings tried before a spawn is dropped for lack of room.
pub const SPAWN_MAX_RINGS: usize = 6;

// --- Combat ---

/// Auto-acquired targets are dropped once they get this many acquire radii away.
pub const LEASH_FACTOR: f32 = 1.5;

/// Weaponless explosives look for targets within this many blast radii.
pub const KAMIKAZE_ACQUIRE_FACTOR: f32 = 3.0;

/// Weaponless explosives light their fuse once the target is inside this
/// fraction of the blast radius.
pub const KAMIKAZE_TRIGGER_FRACTION: f32 = 0.5;
