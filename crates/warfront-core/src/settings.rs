//! Match settings: tunables and content catalogs loaded once at world load.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, EnemyTemplate, StructureTemplate, UnitTemplate};

pub const BUILTIN_SIM_SETTINGS: &str = include_str!("data/default_settings.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub grid: GridSettings,
    pub map: MapSettings,
    pub economy: EconomySettings,
    pub combat: CombatSettings,
    pub start: StartSettings,
    pub units: Catalog<UnitTemplate>,
    pub structures: Catalog<StructureTemplate>,
    pub enemies: Catalog<EnemyTemplate>,
    pub resource_nodes: Vec<ResourceNodeSpec>,
    pub waves: WaveSettings,
}

impl SimSettings {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SIM_SETTINGS).expect("builtin sim settings should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: SimSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        SimSettings::from_json_str(&contents)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.grid.targeting_cell <= 0.0 || self.grid.movement_cell <= 0.0 {
            return Err(SettingsError::Invalid("grid cell sizes must be positive".into()));
        }
        if self.grid.capacity_factor < 1.0 {
            return Err(SettingsError::Invalid("grid capacity factor must be at least 1".into()));
        }
        if self.map.nav_tile <= 0.0 || self.map.build_cell <= 0.0 {
            return Err(SettingsError::Invalid("map tile sizes must be positive".into()));
        }
        if self.map.min.x >= self.map.max.x || self.map.min.y >= self.map.max.y {
            return Err(SettingsError::Invalid("map bounds are empty".into()));
        }
        if self.structures.get(self.start.headquarters).is_none() {
            return Err(SettingsError::Invalid(format!(
                "headquarters index {} is not in the structure catalog",
                self.start.headquarters
            )));
        }
        if self.start.worker_count > 0 && self.units.get(self.start.worker).is_none() {
            return Err(SettingsError::Invalid(format!(
                "starting worker index {} is not in the unit catalog",
                self.start.worker
            )));
        }
        if self.waves.phases.is_empty() {
            return Err(SettingsError::Invalid("at least one wave phase is required".into()));
        }
        for phase in &self.waves.phases {
            if matches!(phase.spawn, SpawnPolicy::Idle) {
                continue;
            }
            if self.waves.spawn_points.is_empty() {
                return Err(SettingsError::Invalid(format!(
                    "phase '{}' spawns enemies but no spawn points are defined",
                    phase.name
                )));
            }
            if phase.weights.iter().map(|w| w.weight).sum::<u32>() == 0 {
                return Err(SettingsError::Invalid(format!(
                    "phase '{}' has no positive enemy weights",
                    phase.name
                )));
            }
            if let Some(bad) = phase
                .weights
                .iter()
                .find(|w| self.enemies.get(w.enemy).is_none())
            {
                return Err(SettingsError::Invalid(format!(
                    "phase '{}' references unknown enemy {}",
                    phase.name, bad.enemy
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse sim settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read sim settings from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid sim settings: {0}")]
    Invalid(String),
}

/// Spatial hash grid sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Cell size of the targeting grid.
    pub targeting_cell: f32,
    /// Cell size of the movement grid.
    pub movement_cell: f32,
    /// Initial map capacity as a multiple of the object count.
    pub capacity_factor: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            targeting_cell: 10.0,
            movement_cell: 3.0,
            capacity_factor: 1.5,
        }
    }
}

/// Playable area on the ground plane (x, z).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub min: Vec2,
    pub max: Vec2,
    /// Tile size of the navigation mesh.
    pub nav_tile: f32,
    /// Cell size of the structure placement grid.
    pub build_cell: f32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            min: Vec2::splat(-100.0),
            max: Vec2::splat(100.0),
            nav_tile: 2.0,
            build_cell: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomySettings {
    pub start_currency: u32,
    /// Population cap before any housing is built.
    pub base_population_cap: u32,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            start_currency: 500,
            base_population_cap: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    /// A chased target must drift this far from its last known position
    /// before the chaser asks for a new path.
    pub chase_repath_distance: f32,
    /// Extra reach beyond footprints and radii for gathering, depositing and building.
    pub interact_reach: f32,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            chase_repath_distance: 2.0,
            interact_reach: 1.0,
        }
    }
}

/// What every player starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartSettings {
    /// Structure catalog index of the headquarters.
    pub headquarters: usize,
    /// Unit catalog index of the starting workers.
    pub worker: usize,
    pub worker_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNodeSpec {
    pub position: Vec2,
    pub amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSettings {
    pub phases: Vec<PhaseSettings>,
    pub spawn_points: Vec<Vec2>,
    /// Distance between placement rings around a spawn point.
    pub ring_spacing: f32,
    /// Maximum random offset applied to each placement slot.
    pub jitter: f32,
    /// Where hostiles march when they have nothing to fight.
    pub objective: Vec2,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            phases: Vec::new(),
            spawn_points: Vec::new(),
            ring_spacing: 2.0,
            jitter: 0.4,
            objective: Vec2::ZERO,
        }
    }
}

/// One step of the wave progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSettings {
    pub name: String,
    /// Leave after this much total match time.
    #[serde(default)]
    pub time_threshold_secs: Option<f64>,
    /// Or after this many cumulative hostile kills, whichever comes first.
    #[serde(default)]
    pub kill_threshold: Option<u32>,
    pub spawn: SpawnPolicy,
    #[serde(default)]
    pub weights: Vec<EnemyWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpawnPolicy {
    /// No spawns.
    Idle,
    /// One batch on entering the phase.
    Burst { count: u32 },
    /// A batch every `interval_secs` while the phase lasts.
    Trickle { interval_secs: f32, batch: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnemyWeight {
    pub enemy: usize,
    pub weight: u32,
}
