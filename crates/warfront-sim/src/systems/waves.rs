//! Wave orchestration: phase transitions and enemy spawning.
//!
//! A phase ends when either its time threshold or its kill threshold is
//! met, whichever comes first. Both are measured from the start of the
//! match. The last phase never ends. Spawn positions are drawn from rings
//! of candidate slots around a spawn point, jittered by the seeded RNG, and
//! rejected if they overlap a footprint or another agent.

use glam::Vec2;
use hecs::World;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use warfront_core::components::{Agent, Health, Hostile};
use warfront_core::constants::{SPAWN_MAX_RINGS, SPAWN_SLOTS_PER_RING};
use warfront_core::events::SimEvent;
use warfront_core::settings::{PhaseSettings, SimSettings, SpawnPolicy, WaveSettings};
use warfront_core::state::WaveView;
use warfront_core::types::Position;

use crate::net_ids::NetIdAllocator;
use crate::physics::{any_collider, FootprintColliders, PhysicsQuery};
use crate::world_setup;

/// Orchestrator progress.
#[derive(Debug, Clone, Default)]
pub struct WaveState {
    pub phase: usize,
    pub kills: u32,
    pub spawned: u32,
    burst_done: bool,
    next_batch_secs: Option<f64>,
}

impl WaveState {
    pub fn view(&self, settings: &WaveSettings) -> WaveView {
        WaveView {
            phase: self.phase,
            phase_name: settings
                .phases
                .get(self.phase)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            kills: self.kills,
            spawned: self.spawned,
        }
    }
}

/// Whether `phase` is over given the match clock and kill count.
pub fn should_advance(phase: &PhaseSettings, elapsed_secs: f64, kills: u32) -> bool {
    phase.time_threshold_secs.map_or(false, |t| elapsed_secs >= t)
        || phase.kill_threshold.map_or(false, |k| kills >= k)
}

/// Count hostiles that died this tick. Runs before the death pass removes
/// them, so each death is seen exactly once.
pub fn count_kills(world: &World, state: &mut WaveState) {
    let dead = world
        .query::<(&Hostile, &Health)>()
        .iter()
        .filter(|(_, (_, health))| !health.is_alive())
        .count();
    state.kills += dead as u32;
}

/// Everything the orchestrator needs besides the world.
pub struct WaveContext<'a> {
    pub settings: &'a SimSettings,
    pub rng: &'a mut ChaCha8Rng,
    pub net_ids: &'a mut NetIdAllocator,
    pub colliders: &'a FootprintColliders,
    pub events: &'a mut Vec<SimEvent>,
}

pub fn run(world: &mut World, state: &mut WaveState, ctx: &mut WaveContext<'_>, elapsed_secs: f64) {
    let settings = ctx.settings;
    let phases = &settings.waves.phases;
    if phases.is_empty() {
        return;
    }

    if state.phase + 1 < phases.len() && should_advance(&phases[state.phase], elapsed_secs, state.kills) {
        state.phase += 1;
        state.burst_done = false;
        state.next_batch_secs = None;
        let name = phases[state.phase].name.clone();
        info!(phase = state.phase, %name, kills = state.kills, elapsed_secs, "wave phase changed");
        ctx.events.push(SimEvent::PhaseChanged {
            phase: state.phase,
            name,
        });
    }

    let phase = &phases[state.phase];
    let count = match phase.spawn {
        SpawnPolicy::Idle => 0,
        SpawnPolicy::Burst { count } => {
            if state.burst_done {
                0
            } else {
                state.burst_done = true;
                count
            }
        }
        SpawnPolicy::Trickle {
            interval_secs,
            batch,
        } => {
            let next = *state
                .next_batch_secs
                .get_or_insert(elapsed_secs + interval_secs as f64);
            if elapsed_secs >= next {
                state.next_batch_secs = Some(next + interval_secs as f64);
                batch
            } else {
                0
            }
        }
    };
    if count > 0 {
        state.spawned += spawn_batch(world, phase, count, ctx);
    }
}

/// Spawn up to `count` enemies around one spawn point. Returns how many
/// found room.
fn spawn_batch(world: &mut World, phase: &PhaseSettings, count: u32, ctx: &mut WaveContext<'_>) -> u32 {
    let settings = ctx.settings;
    let waves = &settings.waves;
    if waves.spawn_points.is_empty() {
        return 0;
    }
    let picker = match WeightedIndex::new(phase.weights.iter().map(|w| w.weight)) {
        Ok(picker) => picker,
        Err(err) => {
            warn!(phase = %phase.name, %err, "phase has no usable enemy weights");
            return 0;
        }
    };
    let center = waves.spawn_points[ctx.rng.gen_range(0..waves.spawn_points.len())];

    // Agents already near the spawn point, plus everything placed below.
    let area = waves.ring_spacing * SPAWN_MAX_RINGS as f32 + waves.jitter + 4.0;
    let mut taken: Vec<(Vec2, f32)> = world
        .query::<(&Position, &Agent)>()
        .iter()
        .map(|(_, (pos, agent))| (pos.ground(), agent.obstacle_radius))
        .filter(|(p, _)| p.distance(center) <= area)
        .collect();

    let mut placed = 0;
    for _ in 0..count {
        let enemy = phase.weights[picker.sample(&mut *ctx.rng)].enemy;
        let Some(radius) = settings.enemies.get(enemy).map(|e| e.obstacle_radius) else {
            continue;
        };
        let Some(spot) = find_slot(center, radius, &taken, ctx) else {
            debug!(enemy, "no room to spawn");
            continue;
        };
        if world_setup::spawn_enemy(world, ctx.net_ids, settings, enemy, spot).is_some() {
            taken.push((spot, radius));
            placed += 1;
        }
    }
    debug!(placed, requested = count, "spawned wave batch");
    placed
}

fn find_slot(center: Vec2, radius: f32, taken: &[(Vec2, f32)], ctx: &mut WaveContext<'_>) -> Option<Vec2> {
    let settings = ctx.settings;
    let waves = &settings.waves;
    let map = &settings.map;
    let lo = map.min + Vec2::splat(radius);
    let hi = (map.max - Vec2::splat(radius)).max(lo);
    for ring in 0..=SPAWN_MAX_RINGS {
        let slots = if ring == 0 { 1 } else { SPAWN_SLOTS_PER_RING * ring };
        for slot in 0..slots {
            let angle = std::f32::consts::TAU * slot as f32 / slots as f32;
            let base = center + Vec2::new(angle.cos(), angle.sin()) * ring as f32 * waves.ring_spacing;
            let jitter = if waves.jitter > 0.0 {
                Vec2::new(
                    ctx.rng.gen_range(-waves.jitter..=waves.jitter),
                    ctx.rng.gen_range(-waves.jitter..=waves.jitter),
                )
            } else {
                Vec2::ZERO
            };
            let candidate = (base + jitter).clamp(lo, hi);
            let blocked = ctx.colliders.check_box(candidate, Vec2::splat(radius), &any_collider).is_some()
                || taken
                    .iter()
                    .any(|(p, r)| p.distance(candidate) < r + radius);
            if !blocked {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use warfront_core::settings::EnemyWeight;

    fn phase(time: Option<f64>, kills: Option<u32>) -> PhaseSettings {
        PhaseSettings {
            name: "test".into(),
            time_threshold_secs: time,
            kill_threshold: kills,
            spawn: SpawnPolicy::Idle,
            weights: vec![EnemyWeight { enemy: 0, weight: 1 }],
        }
    }

    #[test]
    fn test_time_threshold_alone_advances() {
        let p = phase(Some(60.0), Some(20));
        assert!(!should_advance(&p, 59.9, 0));
        assert!(should_advance(&p, 60.0, 0));
    }

    #[test]
    fn test_kill_threshold_alone_advances() {
        let p = phase(Some(60.0), Some(20));
        assert!(!should_advance(&p, 10.0, 19));
        assert!(should_advance(&p, 10.0, 20));
    }

    #[test]
    fn test_phase_without_thresholds_never_advances() {
        let p = phase(None, None);
        assert!(!should_advance(&p, 1e9, u32::MAX));
    }

    const SPAWN_POINT: Vec2 = Vec2::new(-90.0, 0.0);

    fn spawning(spawn: SpawnPolicy, weights: Vec<EnemyWeight>) -> SimSettings {
        let mut settings = SimSettings::builtin();
        settings.waves.spawn_points = vec![SPAWN_POINT];
        settings.waves.phases = vec![PhaseSettings {
            name: "spawning".into(),
            time_threshold_secs: None,
            kill_threshold: None,
            spawn,
            weights,
        }];
        settings
    }

    fn hostiles(world: &World) -> Vec<(Vec2, f32)> {
        world
            .query::<(&Hostile, &Position, &Agent)>()
            .iter()
            .map(|(_, (_, pos, agent))| (pos.ground(), agent.obstacle_radius))
            .collect()
    }

    struct Harness {
        world: World,
        state: WaveState,
        rng: ChaCha8Rng,
        net_ids: NetIdAllocator,
        colliders: FootprintColliders,
        events: Vec<SimEvent>,
    }

    impl Harness {
        fn new(seed: u64) -> Self {
            Self {
                world: World::new(),
                state: WaveState::default(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                net_ids: NetIdAllocator::default(),
                colliders: FootprintColliders::new(),
                events: Vec::new(),
            }
        }

        fn step(&mut self, settings: &SimSettings, elapsed_secs: f64) {
            let mut ctx = WaveContext {
                settings,
                rng: &mut self.rng,
                net_ids: &mut self.net_ids,
                colliders: &self.colliders,
                events: &mut self.events,
            };
            run(&mut self.world, &mut self.state, &mut ctx, elapsed_secs);
        }
    }

    #[test]
    fn test_burst_spawns_clear_of_each_other_and_footprints() {
        let settings = spawning(
            SpawnPolicy::Burst { count: 24 },
            vec![
                EnemyWeight { enemy: 0, weight: 1 },
                EnemyWeight { enemy: 1, weight: 1 },
            ],
        );
        let mut h = Harness::new(3);
        let blocker = h.world.spawn(());
        let half = Vec2::splat(3.0);
        h.colliders.insert(blocker, SPAWN_POINT, half);

        h.step(&settings, 0.0);

        let placed = hostiles(&h.world);
        assert!(!placed.is_empty());
        assert_eq!(h.state.spawned as usize, placed.len());
        for (i, (a, ra)) in placed.iter().enumerate() {
            let gap = (*a - SPAWN_POINT).abs();
            assert!(
                gap.x >= half.x + ra - 1e-4 || gap.y >= half.y + ra - 1e-4,
                "{a:?} overlaps the footprint"
            );
            for (b, rb) in &placed[i + 1..] {
                assert!(a.distance(*b) >= ra + rb - 1e-4, "{a:?} overlaps {b:?}");
            }
        }

        // A burst fires once per phase.
        h.step(&settings, 1.0);
        assert_eq!(hostiles(&h.world).len(), placed.len());
    }

    #[test]
    fn test_enemies_without_room_are_not_spawned_or_counted() {
        let settings = spawning(
            SpawnPolicy::Burst { count: 5 },
            vec![EnemyWeight { enemy: 0, weight: 1 }],
        );
        let mut h = Harness::new(3);
        let blocker = h.world.spawn(());
        // Covers every ring around the spawn point.
        h.colliders.insert(blocker, SPAWN_POINT, Vec2::splat(40.0));

        h.step(&settings, 0.0);

        assert_eq!(h.state.spawned, 0);
        assert!(hostiles(&h.world).is_empty());
    }

    #[test]
    fn test_trickle_spawns_a_batch_every_interval() {
        let settings = spawning(
            SpawnPolicy::Trickle {
                interval_secs: 2.0,
                batch: 3,
            },
            vec![EnemyWeight { enemy: 0, weight: 1 }],
        );
        let mut h = Harness::new(9);

        h.step(&settings, 0.0);
        h.step(&settings, 1.9);
        assert_eq!(h.state.spawned, 0);

        h.step(&settings, 2.0);
        assert_eq!(h.state.spawned, 3);
        h.step(&settings, 3.0);
        assert_eq!(h.state.spawned, 3);

        h.step(&settings, 4.0);
        assert_eq!(h.state.spawned, 6);
        assert_eq!(hostiles(&h.world).len(), 6);
    }
}
