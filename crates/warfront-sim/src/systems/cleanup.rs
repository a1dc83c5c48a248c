//! Death pass: removes dead objects and depleted resource nodes.
//!
//! Runs last in the tick. Before an entity is despawned everything it holds
//! is handed back: population to its owner's ledger (a unit's own, or the
//! reservation of a unit still in production), housing from a finished
//! structure, carved navigation tiles, and any resource node claim.
//! Entities already gone are skipped, so queuing the same entity twice is
//! harmless.

use glam::Vec2;
use hecs::{Entity, World};

use warfront_core::components::*;
use warfront_core::events::SimEvent;
use warfront_core::types::{NetId, Position};
use warfront_nav::NavQuery;

use crate::ledger::Ledger;

/// What an entity gives back when it is removed.
#[derive(Debug, Default)]
struct Release {
    net_id: Option<NetId>,
    population: Option<(Owner, u32)>,
    housing: Option<(Owner, u32)>,
    carved: Option<(Vec2, Vec2)>,
    claim: Option<Entity>,
}

pub fn run(
    world: &mut World,
    ledger: &mut Ledger,
    nav: &mut dyn NavQuery,
    despawn_buffer: &mut Vec<Entity>,
    events: &mut Vec<SimEvent>,
) {
    despawn_buffer.clear();

    for (entity, health) in world.query_mut::<&Health>() {
        if !health.is_alive() {
            despawn_buffer.push(entity);
        }
    }
    for (entity, node) in world.query_mut::<&ResourceNode>() {
        if node.remaining == 0 && node.occupant.is_none() {
            despawn_buffer.push(entity);
        }
    }

    despawn_buffer.sort_unstable_by_key(|e| e.to_bits());
    despawn_buffer.dedup();

    for entity in despawn_buffer.drain(..) {
        let Some(release) = collect_release(world, entity) else {
            continue;
        };
        if let Some((owner, population)) = release.population {
            ledger.release_population(owner.0, population);
        }
        if let Some((owner, housing)) = release.housing {
            ledger.remove_population_cap(owner.0, housing);
        }
        if let Some((min, max)) = release.carved {
            nav.carve(min, max, false);
        }
        if let Some(node) = release.claim {
            if let Ok(mut node) = world.get::<&mut ResourceNode>(node) {
                if node.occupant == Some(entity) {
                    node.occupant = None;
                }
            }
        }
        if let Some(net_id) = release.net_id {
            events.push(SimEvent::Destroyed { object: net_id });
        }
        let _ = world.despawn(entity);
    }
}

fn collect_release(world: &World, entity: Entity) -> Option<Release> {
    let e = world.entity(entity).ok()?;
    let owner = e.get::<&Owner>().map(|o| *o);
    let mut release = Release {
        net_id: e.get::<&NetId>().map(|n| *n),
        ..Default::default()
    };
    if let (Some(unit), Some(owner)) = (e.get::<&Unit>(), owner) {
        release.population = Some((owner, unit.population));
    }
    if let (Some(queue), Some(owner)) = (e.get::<&ProductionQueue>(), owner) {
        if queue.active {
            release.population = Some((owner, queue.population));
        }
    }
    if let (Some(structure), Some(owner)) = (e.get::<&Structure>(), owner) {
        if !e.has::<Construction>() {
            release.housing = Some((owner, structure.housing));
        }
    }
    if let (Some(pos), Some(footprint)) = (e.get::<&Position>(), e.get::<&Footprint>()) {
        let center = pos.ground();
        release.carved = Some((center - footprint.half_extents, center + footprint.half_extents));
    }
    release.claim = e.get::<&GatheringState>().map(|g| g.node);
    Some(release)
}
