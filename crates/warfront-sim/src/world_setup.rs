//! Entity spawn factories.
//!
//! Every networked object gets its `NetId` here. Units and enemies carry
//! more components than a hecs tuple bundle holds, so they are assembled
//! with `EntityBuilder`.

use glam::{Vec2, Vec3};
use hecs::{Entity, EntityBuilder, World};

use warfront_core::catalog::{ExplosionSpec, WeaponSpec};
use warfront_core::components::*;
use warfront_core::constants::*;
use warfront_core::enums::AgentType;
use warfront_core::settings::SimSettings;
use warfront_core::types::{ClientId, NetId, Position};

use crate::net_ids::NetIdAllocator;

/// Entities created for a joining player.
#[derive(Debug, Clone)]
pub struct PlayerStart {
    pub headquarters: Entity,
    pub workers: Vec<Entity>,
}

/// Spawn the resource nodes listed in the settings.
pub fn spawn_resource_nodes(
    world: &mut World,
    net_ids: &mut NetIdAllocator,
    settings: &SimSettings,
) -> Vec<Entity> {
    settings
        .resource_nodes
        .iter()
        .map(|spec| {
            world.spawn((
                net_ids.allocate(),
                Position::on_ground(spec.position.x, spec.position.y),
                ResourceNode {
                    remaining: spec.amount,
                    occupant: None,
                },
            ))
        })
        .collect()
}

/// Spawn a completed headquarters at `base` with the starting workers
/// ringed around it.
pub fn setup_player(
    world: &mut World,
    net_ids: &mut NetIdAllocator,
    settings: &SimSettings,
    client: ClientId,
    base: Vec2,
) -> Option<PlayerStart> {
    let hq_index = settings.start.headquarters;
    let hq_template = settings.structures.get(hq_index)?;
    let worker_template = settings.units.get(settings.start.worker)?;

    let headquarters = spawn_structure(world, net_ids, settings, hq_index, client, base, false)?;

    let ring = hq_template.half_extents.max_element()
        + SPAWN_CLEARANCE
        + worker_template.obstacle_radius * 2.0;
    let count = settings.start.worker_count.max(1);
    let mut workers = Vec::with_capacity(count as usize);
    for i in 0..settings.start.worker_count {
        let angle = std::f32::consts::TAU * i as f32 / count as f32;
        let spot = base + Vec2::new(angle.cos(), angle.sin()) * ring;
        if let Some(worker) = spawn_unit(
            world,
            net_ids,
            settings,
            settings.start.worker,
            client,
            Vec3::new(spot.x, 0.0, spot.y),
        ) {
            workers.push(worker);
        }
    }

    Some(PlayerStart {
        headquarters,
        workers,
    })
}

/// Spawn a player structure from the catalog. Structures placed by a build
/// request start under construction at reduced health.
pub fn spawn_structure(
    world: &mut World,
    net_ids: &mut NetIdAllocator,
    settings: &SimSettings,
    template: usize,
    owner: ClientId,
    center: Vec2,
    under_construction: bool,
) -> Option<Entity> {
    let spec = settings.structures.get(template)?;
    let mut health = Health::full(spec.health);
    let mut builder = EntityBuilder::new();
    builder
        .add(net_ids.allocate())
        .add(Owner(owner))
        .add(owner.team())
        .add(Position::on_ground(center.x, center.y))
        .add(Structure {
            template,
            housing: spec.housing,
        })
        .add(Footprint {
            half_extents: spec.half_extents,
        });
    if under_construction {
        health.current = spec.health * CONSTRUCTION_START_HEALTH;
        builder.add(Construction {
            progress: 0.0,
            duration: spec.build_secs,
        });
    }
    builder.add(health);
    if spec.resource_center {
        builder.add(ResourceCenter);
    }
    if spec.produces_units {
        builder.add(ProductionQueue::default());
    }
    if !spec.targetable {
        builder.add(NonTargetable);
    }
    if let Some(weapon) = &spec.weapon {
        builder.add(weapon_from(weapon));
    }
    Some(world.spawn(builder.build()))
}

/// Assemble the components of a player unit. The caller decides whether to
/// spawn immediately or through a command buffer.
pub fn unit_builder(
    settings: &SimSettings,
    template: usize,
    net_id: NetId,
    owner: ClientId,
    position: Vec3,
) -> Option<EntityBuilder> {
    let spec = settings.units.get(template)?;
    let mut builder = EntityBuilder::new();
    builder
        .add(net_id)
        .add(Owner(owner))
        .add(owner.team())
        .add(Position(position))
        .add(Health::full(spec.health))
        .add(Unit {
            template,
            population: spec.population,
        });
    add_agent(
        &mut builder,
        spec.speed,
        spec.obstacle_radius,
        spec.arrival_radius,
        spec.agent_type,
        MovementGoal::default(),
    );
    if let Some(worker) = &spec.worker {
        builder.add(Worker {
            capacity: worker.capacity,
            harvest_secs: worker.harvest_secs,
        });
    }
    if let Some(weapon) = &spec.weapon {
        builder.add(weapon_from(weapon));
    }
    if let Some(explosion) = &spec.explosion {
        add_explosive(&mut builder, explosion);
    }
    Some(builder)
}

pub fn spawn_unit(
    world: &mut World,
    net_ids: &mut NetIdAllocator,
    settings: &SimSettings,
    template: usize,
    owner: ClientId,
    position: Vec3,
) -> Option<Entity> {
    let mut builder = unit_builder(settings, template, net_ids.allocate(), owner, position)?;
    Some(world.spawn(builder.build()))
}

/// Spawn a wave enemy already heading for the objective.
pub fn spawn_enemy(
    world: &mut World,
    net_ids: &mut NetIdAllocator,
    settings: &SimSettings,
    template: usize,
    position: Vec2,
) -> Option<Entity> {
    let spec = settings.enemies.get(template)?;
    let mut builder = EntityBuilder::new();
    builder
        .add(net_ids.allocate())
        .add(HOSTILE_TEAM)
        .add(Position::on_ground(position.x, position.y))
        .add(Health::full(spec.health))
        .add(Hostile { template });
    let objective = settings.waves.objective;
    let mut goal = MovementGoal::default();
    goal.request(Vec3::new(objective.x, 0.0, objective.y));
    add_agent(
        &mut builder,
        spec.speed,
        spec.obstacle_radius,
        0.0,
        spec.agent_type,
        goal,
    );
    if let Some(weapon) = &spec.weapon {
        builder.add(weapon_from(weapon));
    }
    if let Some(explosion) = &spec.explosion {
        add_explosive(&mut builder, explosion);
    }

    Some(world.spawn(builder.build()))
}

fn add_agent(
    builder: &mut EntityBuilder,
    speed: f32,
    obstacle_radius: f32,
    arrival_radius: f32,
    agent_type: AgentType,
    goal: MovementGoal,
) {
    builder
        .add(Agent {
            speed,
            obstacle_radius,
            agent_type,
        })
        .add(goal)
        .add(WaypointState {
            arrival_radius: arrival_radius.max(obstacle_radius + ARRIVAL_EPSILON),
            ..Default::default()
        })
        .add(PathBuffer::default())
        .add(Intent::None);
}

fn add_explosive(builder: &mut EntityBuilder, spec: &ExplosionSpec) {
    builder
        .add(ExplosionData {
            radius: spec.radius,
            damage: spec.damage,
            fuse_delay: spec.fuse_delay,
        })
        .add(SelfDestructCountdown::default());
}

fn weapon_from(spec: &WeaponSpec) -> Weapon {
    Weapon {
        range: spec.range,
        damage: spec.damage,
        cooldown_secs: spec.cooldown_secs,
        timer: 0.0,
        acquire_radius: spec.acquire_radius,
    }
}
