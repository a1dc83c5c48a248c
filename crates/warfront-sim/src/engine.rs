//! Simulation engine.
//!
//! `SimulationEngine` owns the hecs ECS world, validates remote requests,
//! runs all systems in a fixed order, and produces `GameStateSnapshot`s.
//! Completely headless, so whole matches can be replayed in tests.

use std::collections::VecDeque;

use glam::Vec2;
use hecs::{CommandBuffer, Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{info, warn};

use warfront_core::commands::RemoteRequest;
use warfront_core::components::{Footprint, Health, Owner};
use warfront_core::constants::HOSTILE_TEAM;
use warfront_core::events::{ClientNotification, SimEvent};
use warfront_core::settings::SimSettings;
use warfront_core::state::GameStateSnapshot;
use warfront_core::types::{ClientId, NetId, Position, SimTime};
use warfront_nav::{NavQuery, TileNavMesh};

use crate::ledger::Ledger;
use crate::net_ids::{NetIdAllocator, NetIdMap};
use crate::physics::FootprintColliders;
use crate::systems;
use crate::systems::commands::CommandContext;
use crate::systems::waves::{WaveContext, WaveState};
use crate::world_setup;

/// Configuration for starting a new match.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed and same requests = same match.
    pub seed: u64,
    pub settings: SimSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            settings: SimSettings::builtin(),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("client id {0:?} is reserved for the hostile team")]
    ReservedClientId(ClientId),
    #[error("client {0:?} already joined")]
    DuplicateClient(ClientId),
    #[error("client {0:?} is not in the match")]
    UnknownClient(ClientId),
    #[error("starting headquarters or worker template is missing from the catalog")]
    MissingStartTemplate,
}

/// The simulation engine. Owns the ECS world and all match state.
pub struct SimulationEngine {
    world: World,
    settings: SimSettings,
    time: SimTime,
    rng: ChaCha8Rng,
    nav: Box<dyn NavQuery>,
    ledger: Ledger,
    net_ids: NetIdAllocator,
    net_map: NetIdMap,
    colliders: FootprintColliders,
    waves: WaveState,
    request_queue: VecDeque<RemoteRequest>,
    notifications: Vec<ClientNotification>,
    events: Vec<SimEvent>,
    despawn_buffer: Vec<Entity>,
}

impl SimulationEngine {
    /// Create an engine navigating on a tile mesh covering the map.
    pub fn new(config: SimConfig) -> Self {
        let map = &config.settings.map;
        let nav = TileNavMesh::new(map.min, map.max, map.nav_tile);
        Self::with_navigation(config, Box::new(nav))
    }

    /// Create an engine with a caller-supplied navigation backend.
    pub fn with_navigation(config: SimConfig, nav: Box<dyn NavQuery>) -> Self {
        let mut engine = Self {
            world: World::new(),
            settings: config.settings,
            time: SimTime::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            nav,
            ledger: Ledger::new(),
            net_ids: NetIdAllocator::default(),
            net_map: NetIdMap::default(),
            colliders: FootprintColliders::new(),
            waves: WaveState::default(),
            request_queue: VecDeque::new(),
            notifications: Vec::new(),
            events: Vec::new(),
            despawn_buffer: Vec::new(),
        };
        let nodes = world_setup::spawn_resource_nodes(&mut engine.world, &mut engine.net_ids, &engine.settings);
        info!(seed = config.seed, resource_nodes = nodes.len(), "match created");
        engine
    }

    /// Add a player with a headquarters at `base`. Returns the
    /// headquarters' id.
    pub fn add_player(&mut self, client: ClientId, base: Vec2) -> Result<NetId, EngineError> {
        if client.team() == HOSTILE_TEAM {
            return Err(EngineError::ReservedClientId(client));
        }
        let economy = &self.settings.economy;
        if !self
            .ledger
            .open(client, economy.start_currency, economy.base_population_cap)
        {
            return Err(EngineError::DuplicateClient(client));
        }
        let Some(start) =
            world_setup::setup_player(&mut self.world, &mut self.net_ids, &self.settings, client, base)
        else {
            self.ledger.close(client);
            return Err(EngineError::MissingStartTemplate);
        };

        let housing = self
            .settings
            .structures
            .get(self.settings.start.headquarters)
            .map_or(0, |t| t.housing);
        self.ledger.add_population_cap(client, housing);
        let population = self
            .settings
            .units
            .get(self.settings.start.worker)
            .map_or(0, |t| t.population);
        for _ in &start.workers {
            if let Err(err) = self.ledger.try_reserve(client, 0, population) {
                warn!(client = client.0, %err, "starting workers exceed the population cap");
            }
        }

        if let Ok((pos, footprint)) = self
            .world
            .query_one_mut::<(&Position, &Footprint)>(start.headquarters)
        {
            let center = pos.ground();
            self.nav
                .carve(center - footprint.half_extents, center + footprint.half_extents, true);
        }
        let hq = *self
            .world
            .get::<&NetId>(start.headquarters)
            .map_err(|_| EngineError::MissingStartTemplate)?;
        self.net_map.rebuild(&self.world);
        info!(client = client.0, headquarters = hq.0, workers = start.workers.len(), "player joined");
        Ok(hq)
    }

    /// Remove a player and everything they own. Population and housing go
    /// back through the death pass before the account is closed.
    pub fn remove_player(&mut self, client: ClientId) -> Result<usize, EngineError> {
        if self.ledger.account(client).is_none() {
            return Err(EngineError::UnknownClient(client));
        }
        let mut removed = 0;
        for (_entity, (owner, health)) in self.world.query_mut::<(&Owner, &mut Health)>() {
            if owner.0 == client {
                health.current = 0.0;
                removed += 1;
            }
        }
        systems::cleanup::run(
            &mut self.world,
            &mut self.ledger,
            self.nav.as_mut(),
            &mut self.despawn_buffer,
            &mut self.events,
        );
        self.ledger.close(client);
        self.request_queue.retain(|r| r.client != client);
        self.net_map.rebuild(&self.world);
        info!(client = client.0, removed, "player left");
        Ok(removed)
    }

    /// Queue a remote request for the next tick.
    pub fn queue_request(&mut self, request: RemoteRequest) {
        self.request_queue.push_back(request);
    }

    pub fn queue_requests(&mut self, requests: impl IntoIterator<Item = RemoteRequest>) {
        self.request_queue.extend(requests);
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> GameStateSnapshot {
        self.run_systems();
        self.time.advance();

        let notifications = std::mem::take(&mut self.notifications);
        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(
            &self.world,
            self.time,
            self.waves.view(&self.settings.waves),
            &self.ledger,
            notifications,
            events,
        )
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn waves(&self) -> &WaveState {
        &self.waves
    }

    /// Look up an entity by replication id. Scans the world, so it sees
    /// objects spawned since the last tick.
    pub fn entity(&self, id: NetId) -> Option<Entity> {
        self.world
            .query::<&NetId>()
            .iter()
            .find(|(_, net_id)| **net_id == id)
            .map(|(entity, _)| entity)
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[cfg(test)]
    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    #[cfg(test)]
    pub(crate) fn spawn_unit(&mut self, template: usize, owner: ClientId, at: glam::Vec3) -> NetId {
        let entity =
            world_setup::spawn_unit(&mut self.world, &mut self.net_ids, &self.settings, template, owner, at)
                .unwrap();
        let id = *self.world.get::<&NetId>(entity).unwrap();
        id
    }

    #[cfg(test)]
    pub(crate) fn spawn_enemy(&mut self, template: usize, at: Vec2) -> NetId {
        let entity =
            world_setup::spawn_enemy(&mut self.world, &mut self.net_ids, &self.settings, template, at).unwrap();
        let id = *self.world.get::<&NetId>(entity).unwrap();
        id
    }

    fn run_systems(&mut self) {
        let elapsed = self.time.elapsed_secs;

        // 1. Stable ids, colliders and spatial grids
        self.net_map.rebuild(&self.world);
        self.colliders.rebuild(&self.world);
        let index = systems::spatial_index::build(&self.world, &self.settings.grid);

        // 2. Remote requests, in arrival order
        let mut placed = Vec::new();
        systems::commands::run(
            &mut CommandContext {
                world: &mut self.world,
                net_map: &self.net_map,
                net_ids: &mut self.net_ids,
                ledger: &mut self.ledger,
                settings: &self.settings,
                colliders: &mut self.colliders,
                nav: self.nav.as_mut(),
                placed: &mut placed,
                notifications: &mut self.notifications,
                events: &mut self.events,
            },
            &mut self.request_queue,
        );

        // 3. Construction and production timers
        let mut cmd = CommandBuffer::new();
        systems::construction::run(&mut self.world, &self.settings, &mut self.ledger, &mut cmd, &mut self.events);
        systems::production::run(&mut self.world, &self.settings, &mut self.net_ids, &mut cmd, &mut self.events);
        cmd.run_on(&mut self.world);

        // 4. Harvest loops
        systems::gathering::run(&mut self.world, &self.settings, &mut self.ledger);

        // 5. Acquisition, chasing and weapon fire
        systems::targeting::run(&mut self.world, &index, &self.settings);

        // 6. Paths for new or invalidated goals
        systems::pathing::run(&mut self.world, self.nav.as_ref(), &self.colliders, &placed);

        // 7. Waypoint following, then separation and push-out
        systems::movement::run(&mut self.world);
        systems::avoidance::run(&mut self.world, &index, &self.colliders);

        // 8. Fuses
        systems::combat::run(&mut self.world, &mut self.events);

        // 9. Waves: count this tick's kills, then transition and spawn
        systems::waves::count_kills(&self.world, &mut self.waves);
        systems::waves::run(
            &mut self.world,
            &mut self.waves,
            &mut WaveContext {
                settings: &self.settings,
                rng: &mut self.rng,
                net_ids: &mut self.net_ids,
                colliders: &self.colliders,
                events: &mut self.events,
            },
            elapsed,
        );

        // 10. Death pass
        systems::cleanup::run(
            &mut self.world,
            &mut self.ledger,
            self.nav.as_mut(),
            &mut self.despawn_buffer,
            &mut self.events,
        );
    }
}
