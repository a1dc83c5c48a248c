//! Remote request validation.
//!
//! Requests are drained in arrival order and applied one at a time against
//! the live world, so two requests racing for the same resource node or the
//! same production slot resolve deterministically: the first one wins and
//! the second sees the updated state. Every rule is checked before any
//! state changes. Protocol violations (unknown ids, foreign objects, wrong
//! capabilities) are dropped with a debug log. Business-rule failures are
//! reported back to the requesting client as a `Notification`.

use std::collections::VecDeque;

use glam::{IVec2, Vec2, Vec3};
use hecs::{Component, Entity, World};
use thiserror::Error;
use tracing::debug;

use warfront_core::commands::{RemoteRequest, RequestCommand};
use warfront_core::components::*;
use warfront_core::enums::GatherPhase;
use warfront_core::events::{ClientNotification, Notification, SimEvent};
use warfront_core::settings::SimSettings;
use warfront_core::types::{ClientId, NetId, Position};
use warfront_nav::NavQuery;

use crate::ledger::Ledger;
use crate::net_ids::{NetIdAllocator, NetIdMap};
use crate::physics::{any_collider, FootprintColliders, PhysicsQuery};
use crate::world_setup;

use super::{combat, interaction_point};

/// State the validator reads and writes while applying requests.
pub struct CommandContext<'a> {
    pub world: &'a mut World,
    pub net_map: &'a NetIdMap,
    pub net_ids: &'a mut NetIdAllocator,
    pub ledger: &'a mut Ledger,
    pub settings: &'a SimSettings,
    pub colliders: &'a mut FootprintColliders,
    pub nav: &'a mut dyn NavQuery,
    /// Structures placed this tick, for path invalidation.
    pub placed: &'a mut Vec<Entity>,
    pub notifications: &'a mut Vec<ClientNotification>,
    pub events: &'a mut Vec<SimEvent>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Malformed or unauthorized. Dropped without telling the client.
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    /// Well-formed but refused by a game rule.
    #[error("refused: {0:?}")]
    Refused(Notification),
}

/// Apply every queued request in arrival order.
pub fn run(ctx: &mut CommandContext<'_>, queue: &mut VecDeque<RemoteRequest>) {
    while let Some(request) = queue.pop_front() {
        match apply(ctx, &request) {
            Ok(()) => {}
            Err(Rejection::Invalid(reason)) => {
                debug!(client = request.client.0, command = ?request.command, reason, "dropped request");
            }
            Err(Rejection::Refused(notification)) => {
                debug!(client = request.client.0, command = ?request.command, ?notification, "refused request");
                ctx.notifications.push(ClientNotification {
                    client: request.client,
                    notification,
                });
            }
        }
    }
}

/// Validate and apply a single request. On error the world is untouched.
pub fn apply(ctx: &mut CommandContext<'_>, request: &RemoteRequest) -> Result<(), Rejection> {
    let client = request.client;
    match request.command {
        RequestCommand::Move { unit, target } => {
            let unit = ctx.owned(unit, client)?;
            require::<Unit>(ctx.world, unit, "not a unit")?;
            let destination = ctx.clamp_to_map(target);
            cancel_gathering(ctx.world, unit);
            let _ = ctx.world.remove_one::<AggroTarget>(unit);
            set_intent(ctx.world, unit, Intent::Move);
            request_move(ctx.world, unit, destination);
            Ok(())
        }
        RequestCommand::Attack {
            unit,
            target,
            target_position,
        } => {
            let unit = ctx.owned(unit, client)?;
            require::<Unit>(ctx.world, unit, "not a unit")?;
            require::<Weapon>(ctx.world, unit, "unit has no weapon")?;
            let target = ctx.resolve(target)?;
            require::<Hostile>(ctx.world, target, "target is not an enemy")?;
            let last_known = ctx
                .world
                .get::<&Position>(target)
                .map(|p| p.0)
                .unwrap_or(target_position);
            cancel_gathering(ctx.world, unit);
            set_intent(ctx.world, unit, Intent::Attack(target));
            let _ = ctx.world.insert_one(unit, AggroTarget { target, last_known });
            request_move(ctx.world, unit, last_known);
            Ok(())
        }
        RequestCommand::Gather {
            worker,
            node,
            return_point,
        } => {
            let worker = ctx.owned(worker, client)?;
            require::<Worker>(ctx.world, worker, "not a worker")?;
            let node = ctx.resolve(node)?;
            let center = ctx.owned(return_point, client)?;
            require::<ResourceCenter>(ctx.world, center, "return point is not a resource center")?;
            {
                let stock = ctx
                    .world
                    .get::<&ResourceNode>(node)
                    .map_err(|_| Rejection::Invalid("not a resource node"))?;
                if stock.remaining == 0 {
                    return Err(Rejection::Invalid("resource node is depleted"));
                }
                if let Some(occupant) = stock.occupant {
                    if occupant != worker && ctx.world.contains(occupant) {
                        return Err(Rejection::Invalid("resource node is occupied"));
                    }
                }
            }

            let carried = cancel_gathering(ctx.world, worker);
            if let Ok(mut stock) = ctx.world.get::<&mut ResourceNode>(node) {
                stock.occupant = Some(worker);
            }
            let capacity = ctx.world.get::<&Worker>(worker).map_or(0, |w| w.capacity);
            let (phase, destination) = if carried >= capacity {
                (GatherPhase::ToCenter, center)
            } else {
                (GatherPhase::ToNode, node)
            };
            let _ = ctx.world.insert_one(
                worker,
                GatheringState {
                    node,
                    return_point: center,
                    carried,
                    phase,
                    timer: 0.0,
                },
            );
            let _ = ctx.world.remove_one::<AggroTarget>(worker);
            set_intent(ctx.world, worker, Intent::Gather(node));
            ctx.walk_to(worker, destination);
            Ok(())
        }
        RequestCommand::ReturnResource { worker, center } => {
            let worker = ctx.owned(worker, client)?;
            require::<Worker>(ctx.world, worker, "not a worker")?;
            let center = ctx.owned(center, client)?;
            require::<ResourceCenter>(ctx.world, center, "not a resource center")?;
            {
                let mut state = ctx
                    .world
                    .get::<&mut GatheringState>(worker)
                    .map_err(|_| Rejection::Invalid("worker is not carrying anything"))?;
                if state.carried == 0 {
                    return Err(Rejection::Invalid("worker is not carrying anything"));
                }
                state.return_point = center;
                state.phase = GatherPhase::ToCenter;
            }
            ctx.walk_to(worker, center);
            Ok(())
        }
        RequestCommand::ProduceUnit {
            facility,
            catalog_index,
        } => {
            let facility = ctx.owned(facility, client)?;
            if has::<Construction>(ctx.world, facility) {
                return Err(Rejection::Invalid("facility is under construction"));
            }
            let active = ctx
                .world
                .get::<&ProductionQueue>(facility)
                .map_err(|_| Rejection::Invalid("not a production facility"))?
                .active;
            if active {
                return Err(Rejection::Refused(Notification::ProductionQueueFull));
            }
            let (cost, population, duration) = ctx
                .settings
                .units
                .get(catalog_index)
                .map(|t| (t.cost, t.population, t.production_secs))
                .ok_or(Rejection::Invalid("unknown unit catalog index"))?;
            ctx.reserve(client, cost, population)?;
            if let Ok(mut queue) = ctx.world.get::<&mut ProductionQueue>(facility) {
                *queue = ProductionQueue {
                    producing: catalog_index,
                    progress: 0.0,
                    duration,
                    population,
                    active: true,
                };
            }
            Ok(())
        }
        RequestCommand::SelfDestruct { target } => {
            let target = ctx.owned(target, client)?;
            let fuse_delay = ctx
                .world
                .get::<&ExplosionData>(target)
                .map_err(|_| Rejection::Invalid("object cannot self-destruct"))?
                .fuse_delay;
            let armed = ctx
                .world
                .get::<&SelfDestructCountdown>(target)
                .map_or(false, |c| c.is_armed());
            if armed {
                return Err(Rejection::Invalid("countdown already running"));
            }
            if fuse_delay <= 0.0 {
                combat::detonate(ctx.world, target, ctx.events);
            } else {
                let _ = ctx.world.insert_one(
                    target,
                    SelfDestructCountdown {
                        remaining: fuse_delay,
                    },
                );
            }
            Ok(())
        }
        RequestCommand::Build {
            structure_index,
            grid_position,
            builder,
        } => {
            let builder = ctx.owned(builder, client)?;
            require::<Worker>(ctx.world, builder, "builder is not a worker")?;
            let (cost, half) = ctx
                .settings
                .structures
                .get(structure_index)
                .map(|t| (t.cost, t.half_extents))
                .ok_or(Rejection::Invalid("unknown structure catalog index"))?;
            let center = ctx.grid_center(grid_position);
            let (map_min, map_max) = (ctx.settings.map.min, ctx.settings.map.max);
            let inside = (center - half).cmpge(map_min).all() && (center + half).cmple(map_max).all();
            if !inside || ctx.colliders.check_box(center, half, &any_collider).is_some() {
                return Err(Rejection::Refused(Notification::InvalidPlacement));
            }
            ctx.reserve(client, cost, 0)?;

            let structure = world_setup::spawn_structure(
                ctx.world,
                ctx.net_ids,
                ctx.settings,
                structure_index,
                client,
                center,
                true,
            )
            .ok_or(Rejection::Invalid("unknown structure catalog index"))?;
            ctx.colliders.insert(structure, center, half);
            ctx.nav.carve(center - half, center + half, true);
            ctx.placed.push(structure);

            cancel_gathering(ctx.world, builder);
            let _ = ctx.world.remove_one::<AggroTarget>(builder);
            set_intent(ctx.world, builder, Intent::Build(structure));
            ctx.walk_to(builder, structure);
            Ok(())
        }
    }
}

impl CommandContext<'_> {
    fn resolve(&self, id: NetId) -> Result<Entity, Rejection> {
        self.net_map
            .resolve(id)
            .filter(|e| self.world.contains(*e))
            .ok_or(Rejection::Invalid("unknown net id"))
    }

    /// Resolve an id and check the requester owns it.
    fn owned(&self, id: NetId, client: ClientId) -> Result<Entity, Rejection> {
        let entity = self.resolve(id)?;
        match self.world.get::<&Owner>(entity) {
            Ok(owner) if owner.0 == client => Ok(entity),
            _ => Err(Rejection::Invalid("object not owned by requester")),
        }
    }

    fn reserve(&mut self, client: ClientId, currency: u32, population: u32) -> Result<(), Rejection> {
        self.ledger
            .try_reserve(client, currency, population)
            .map_err(|err| match err.notification() {
                Some(notification) => Rejection::Refused(notification),
                None => Rejection::Invalid("requester has no ledger"),
            })
    }

    /// Footprint centre of a build grid cell.
    fn grid_center(&self, cell: IVec2) -> Vec2 {
        cell.as_vec2() * self.settings.map.build_cell
    }

    fn clamp_to_map(&self, target: Vec3) -> Vec3 {
        let map = &self.settings.map;
        Vec3::new(
            target.x.clamp(map.min.x, map.max.x),
            target.y,
            target.z.clamp(map.min.y, map.max.y),
        )
    }

    /// Send an agent to interact with `target`.
    fn walk_to(&mut self, agent: Entity, target: Entity) {
        let Some((from, radius)) = agent_info(self.world, agent) else {
            return;
        };
        let reach = self.settings.combat.interact_reach;
        if let Some(point) = interaction_point(self.world, from, target, radius, reach) {
            request_move(self.world, agent, point);
        }
    }
}

fn has<T: Component>(world: &World, entity: Entity) -> bool {
    world.entity(entity).map_or(false, |e| e.has::<T>())
}

fn require<T: Component>(world: &World, entity: Entity, reason: &'static str) -> Result<(), Rejection> {
    if has::<T>(world, entity) {
        Ok(())
    } else {
        Err(Rejection::Invalid(reason))
    }
}

fn agent_info(world: &World, entity: Entity) -> Option<(Vec3, f32)> {
    let pos = world.get::<&Position>(entity).ok()?.0;
    let radius = world.get::<&Agent>(entity).ok()?.obstacle_radius;
    Some((pos, radius))
}

fn set_intent(world: &mut World, entity: Entity, intent: Intent) {
    if let Ok(mut current) = world.get::<&mut Intent>(entity) {
        *current = intent;
    }
}

fn request_move(world: &mut World, entity: Entity, destination: Vec3) {
    if let Ok(mut goal) = world.get::<&mut MovementGoal>(entity) {
        goal.request(destination);
    }
}

/// Stop a worker's harvest loop and free its node. Returns what it carried.
pub fn cancel_gathering(world: &mut World, worker: Entity) -> u32 {
    let Ok(state) = world.remove_one::<GatheringState>(worker) else {
        return 0;
    };
    if let Ok(mut node) = world.get::<&mut ResourceNode>(state.node) {
        if node.occupant == Some(worker) {
            node.occupant = None;
        }
    }
    state.carried
}
