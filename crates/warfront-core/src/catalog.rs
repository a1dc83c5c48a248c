//! Spawnable templates addressed by catalog index.
//!
//! Requests refer to templates by index, so catalogs are append-only and
//! indices stay stable for the whole match.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::enums::AgentType;

/// Ordered, append-only list of templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog<T> {
    entries: Vec<T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a template and return its index.
    pub fn push(&mut self, template: T) -> usize {
        self.entries.push(template);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().enumerate()
    }
}

impl<T> FromIterator<T> for Catalog<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Weapon parameters shared by units, towers and enemies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub range: f32,
    pub damage: f32,
    pub cooldown_secs: f32,
    pub acquire_radius: f32,
}

/// Self-destruct parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplosionSpec {
    pub radius: f32,
    pub damage: f32,
    pub fuse_delay: f32,
}

/// Harvesting parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub capacity: u32,
    pub harvest_secs: f32,
}

/// A producible player unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub name: String,
    pub cost: u32,
    pub population: u32,
    pub production_secs: f32,
    pub health: f32,
    pub speed: f32,
    pub obstacle_radius: f32,
    #[serde(default)]
    pub arrival_radius: f32,
    #[serde(default)]
    pub agent_type: AgentType,
    #[serde(default)]
    pub worker: Option<WorkerSpec>,
    #[serde(default)]
    pub weapon: Option<WeaponSpec>,
    #[serde(default)]
    pub explosion: Option<ExplosionSpec>,
}

/// A placeable player structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureTemplate {
    pub name: String,
    pub cost: u32,
    pub build_secs: f32,
    pub health: f32,
    /// Footprint half extents on the ground plane (x, z).
    pub half_extents: Vec2,
    #[serde(default)]
    pub housing: u32,
    #[serde(default)]
    pub resource_center: bool,
    #[serde(default)]
    pub produces_units: bool,
    /// Walls block movement but are never auto-targeted.
    #[serde(default = "default_true")]
    pub targetable: bool,
    #[serde(default)]
    pub weapon: Option<WeaponSpec>,
}

/// A wave-spawned enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub health: f32,
    pub speed: f32,
    pub obstacle_radius: f32,
    #[serde(default)]
    pub agent_type: AgentType,
    #[serde(default)]
    pub weapon: Option<WeaponSpec>,
    #[serde(default)]
    pub explosion: Option<ExplosionSpec>,
}

fn default_true() -> bool {
    true
}
