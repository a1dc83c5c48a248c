//! Fundamental geometric, identity, and time types.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// World position. The ground plane is XZ; Y is height and ignored by
/// everything except the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    /// Position on the ground plane at height zero.
    pub fn on_ground(x: f32, z: f32) -> Self {
        Self(Vec3::new(x, 0.0, z))
    }

    /// Projection onto the ground plane.
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.0.x, self.0.z)
    }

    /// Horizontal distance to another position.
    pub fn ground_distance(&self, other: &Position) -> f32 {
        self.ground().distance(other.ground())
    }
}

/// Stable identity of a connected player. Doubles as their team id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn team(self) -> Team {
        Team(self.0)
    }
}

/// Team tag used for hostility checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Team(pub u32);

/// Replication id of a networked object. Requests reference objects by
/// this id because local handles differ between server and observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId(pub u32);

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Seconds per tick at the default tick rate.
    pub fn dt(&self) -> f64 {
        1.0 / crate::constants::TICK_RATE as f64
    }

    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.elapsed_secs += self.dt();
    }
}
