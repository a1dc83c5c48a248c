//! Worker harvest loop: walk to the node, harvest, carry to the resource
//! center, deposit, repeat until the node runs dry.

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use tracing::debug;

use warfront_core::components::*;
use warfront_core::constants::DT;
use warfront_core::enums::{GatherPhase, MovePhase};
use warfront_core::settings::SimSettings;
use warfront_core::types::{ClientId, Position};

use crate::ledger::Ledger;

use super::commands::cancel_gathering;
use super::{gap_to, halt, interaction_point};

struct Gatherer {
    entity: Entity,
    position: Vec2,
    radius: f32,
    slack: f32,
    worker: Worker,
    owner: ClientId,
}

enum Outcome {
    Continue(GatheringState),
    Stop,
}

pub fn run(world: &mut World, settings: &SimSettings, ledger: &mut Ledger) {
    let rows: Vec<(Gatherer, GatheringState)> = world
        .query::<(&Position, &Agent, &WaypointState, &Worker, &GatheringState, &Owner)>()
        .iter()
        .map(|(entity, (pos, agent, waypoint, worker, state, owner))| {
            (
                Gatherer {
                    entity,
                    position: pos.ground(),
                    radius: agent.obstacle_radius,
                    slack: waypoint.arrival_radius,
                    worker: *worker,
                    owner: owner.0,
                },
                *state,
            )
        })
        .collect();

    let reach = settings.combat.interact_reach;
    for (gatherer, state) in rows {
        match step(world, &gatherer, state, reach, ledger) {
            Outcome::Continue(next) => {
                if let Ok(mut current) = world.get::<&mut GatheringState>(gatherer.entity) {
                    *current = next;
                }
            }
            Outcome::Stop => {
                cancel_gathering(world, gatherer.entity);
                if let Ok(mut intent) = world.get::<&mut Intent>(gatherer.entity) {
                    if matches!(*intent, Intent::Gather(_)) {
                        *intent = Intent::None;
                    }
                }
            }
        }
    }
}

fn in_reach(world: &World, g: &Gatherer, target: Entity, reach: f32) -> bool {
    gap_to(world, g.position, g.radius, target).map_or(false, |gap| gap <= reach + g.slack)
}

fn node_stock(world: &World, node: Entity) -> u32 {
    world.get::<&ResourceNode>(node).map_or(0, |n| n.remaining)
}

fn step(
    world: &mut World,
    g: &Gatherer,
    mut state: GatheringState,
    reach: f32,
    ledger: &mut Ledger,
) -> Outcome {
    match state.phase {
        GatherPhase::ToNode => {
            if node_stock(world, state.node) == 0 {
                return head_home_or_stop(world, g, state, reach);
            }
            if in_reach(world, g, state.node, reach) {
                state.phase = GatherPhase::Harvesting;
                state.timer = 0.0;
                stop(world, g.entity);
            } else {
                walk_if_parked(world, g, state.node, reach);
            }
        }
        GatherPhase::Harvesting => {
            if node_stock(world, state.node) == 0 {
                return head_home_or_stop(world, g, state, reach);
            }
            state.timer += DT;
            if state.timer < g.worker.harvest_secs {
                return Outcome::Continue(state);
            }
            if let Ok(mut node) = world.get::<&mut ResourceNode>(state.node) {
                let take = g.worker.capacity.saturating_sub(state.carried).min(node.remaining);
                node.remaining -= take;
                state.carried += take;
                if node.remaining == 0 && node.occupant == Some(g.entity) {
                    node.occupant = None;
                }
            }
            state.timer = 0.0;
            state.phase = GatherPhase::ToCenter;
            walk(world, g, state.return_point, reach);
        }
        GatherPhase::ToCenter => {
            if !world.contains(state.return_point) {
                return Outcome::Stop;
            }
            if !in_reach(world, g, state.return_point, reach) {
                walk_if_parked(world, g, state.return_point, reach);
                return Outcome::Continue(state);
            }
            ledger.deposit(g.owner, state.carried);
            debug!(worker = ?g.entity, amount = state.carried, "deposited");
            state.carried = 0;
            let claimed = world
                .get::<&ResourceNode>(state.node)
                .map_or(false, |n| n.remaining > 0 && n.occupant == Some(g.entity));
            if !claimed {
                stop(world, g.entity);
                return Outcome::Stop;
            }
            state.phase = GatherPhase::ToNode;
            walk(world, g, state.node, reach);
        }
    }
    Outcome::Continue(state)
}

/// The node ran out: deliver what is carried, otherwise give up.
fn head_home_or_stop(world: &mut World, g: &Gatherer, mut state: GatheringState, reach: f32) -> Outcome {
    if state.carried == 0 || !world.contains(state.return_point) {
        stop(world, g.entity);
        return Outcome::Stop;
    }
    state.phase = GatherPhase::ToCenter;
    walk(world, g, state.return_point, reach);
    Outcome::Continue(state)
}

fn walk(world: &mut World, g: &Gatherer, target: Entity, reach: f32) {
    let from = Vec3::new(g.position.x, 0.0, g.position.y);
    let Some(point) = interaction_point(world, from, target, g.radius, reach) else {
        return;
    };
    if let Ok(mut goal) = world.get::<&mut MovementGoal>(g.entity) {
        goal.request(point);
    }
}

/// Re-issue the walk when the worker has stopped short, e.g. after being
/// shoved by neighbours.
fn walk_if_parked(world: &mut World, g: &Gatherer, target: Entity, reach: f32) {
    let parked = world
        .get::<&MovementGoal>(g.entity)
        .map_or(false, |goal| !goal.dirty && goal.phase != MovePhase::Following);
    if parked {
        walk(world, g, target, reach);
    }
}

fn stop(world: &mut World, entity: Entity) {
    if let Ok((goal, waypoint)) = world.query_one_mut::<(&mut MovementGoal, &mut WaypointState)>(entity) {
        halt(goal, waypoint);
    }
}
