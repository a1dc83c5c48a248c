//! Post-movement pass: agent separation and push-out from structures.
//!
//! Separation reads neighbour candidates from the movement grid and moves
//! each agent away from overlapping neighbours by a fraction of the overlap.
//! Push-out then moves any agent whose circle intersects a footprint to the
//! nearest point outside it. Displacements are computed in parallel from a
//! snapshot of positions and written back serially.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;

use warfront_core::components::Agent;
use warfront_core::constants::SEPARATION_STRENGTH;
use warfront_core::types::Position;

use crate::physics::{any_collider, closest_point_outside, FootprintColliders, PhysicsQuery};
use crate::spatial::SpatialIndex;

/// Passes of push-out per tick, enough to clear two touching footprints.
const PUSH_OUT_PASSES: usize = 2;

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    radius: f32,
}

pub fn run(world: &mut World, index: &SpatialIndex, colliders: &FootprintColliders) {
    let bodies: HashMap<Entity, Body> = world
        .query::<(&Position, &Agent)>()
        .iter()
        .map(|(entity, (pos, agent))| {
            (
                entity,
                Body {
                    position: pos.0,
                    radius: agent.obstacle_radius,
                },
            )
        })
        .collect();
    if bodies.is_empty() {
        return;
    }

    let mut order: Vec<Entity> = bodies.keys().copied().collect();
    order.sort_unstable_by_key(|e| e.to_bits());

    let moved: Vec<(Entity, Vec3)> = order
        .par_iter()
        .map(|entity| {
            let body = bodies[entity];
            let separated = body.position + separation(*entity, body, &bodies, index);
            (*entity, push_out(separated, body.radius, colliders))
        })
        .collect();

    for (entity, position) in moved {
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.0 = position;
        }
    }
}

fn separation(entity: Entity, body: Body, bodies: &HashMap<Entity, Body>, index: &SpatialIndex) -> Vec3 {
    let center = Vec2::new(body.position.x, body.position.z);
    let mut seen: Vec<Entity> = Vec::new();
    let mut push = Vec2::ZERO;
    for other in index.movement.query_radius(center, body.radius) {
        if *other == entity || seen.contains(other) {
            continue;
        }
        seen.push(*other);
        let Some(neighbour) = bodies.get(other) else {
            continue;
        };
        let away = center - Vec2::new(neighbour.position.x, neighbour.position.z);
        let distance = away.length();
        let overlap = body.radius + neighbour.radius - distance;
        if overlap <= 0.0 {
            continue;
        }
        let direction = if distance > 1e-4 {
            away / distance
        } else if entity.to_bits() < other.to_bits() {
            // Coincident: split along x by id so the pair moves apart.
            Vec2::NEG_X
        } else {
            Vec2::X
        };
        push += direction * overlap * SEPARATION_STRENGTH * 0.5;
    }
    Vec3::new(push.x, 0.0, push.y)
}

fn push_out(mut position: Vec3, radius: f32, colliders: &FootprintColliders) -> Vec3 {
    for _ in 0..PUSH_OUT_PASSES {
        let ground = Vec2::new(position.x, position.z);
        let Some(hit) = colliders.check_box(ground, Vec2::splat(radius), &any_collider) else {
            break;
        };
        let out = closest_point_outside(ground, hit.center, hit.half_extents + Vec2::splat(radius));
        position.x = out.x;
        position.z = out.y;
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::spatial_index;
    use warfront_core::components::Footprint;
    use warfront_core::enums::AgentType;
    use warfront_core::settings::GridSettings;

    fn agent(radius: f32) -> Agent {
        Agent {
            speed: 1.0,
            obstacle_radius: radius,
            agent_type: AgentType::Infantry,
        }
    }

    #[test]
    fn test_overlapping_agents_move_apart() {
        let mut world = World::new();
        let a = world.spawn((Position::on_ground(1.0, 1.0), agent(0.5)));
        let b = world.spawn((Position::on_ground(1.4, 1.0), agent(0.5)));
        let index = spatial_index::build(&world, &GridSettings::default());
        run(&mut world, &index, &FootprintColliders::new());
        let pa = world.get::<&Position>(a).unwrap().0;
        let pb = world.get::<&Position>(b).unwrap().0;
        assert!(pa.x < 1.0);
        assert!(pb.x > 1.4);
        assert!(pa.distance(pb) > 0.4);
    }

    #[test]
    fn test_coincident_agents_split() {
        let mut world = World::new();
        let a = world.spawn((Position::on_ground(1.0, 1.0), agent(0.5)));
        let b = world.spawn((Position::on_ground(1.0, 1.0), agent(0.5)));
        let index = spatial_index::build(&world, &GridSettings::default());
        run(&mut world, &index, &FootprintColliders::new());
        let pa = world.get::<&Position>(a).unwrap().0;
        let pb = world.get::<&Position>(b).unwrap().0;
        assert!(pa.distance(pb) > 0.1);
    }

    #[test]
    fn test_agent_pushed_out_of_footprint() {
        let mut world = World::new();
        world.spawn((
            Position::on_ground(0.0, 0.0),
            Footprint {
                half_extents: Vec2::splat(2.0),
            },
        ));
        let a = world.spawn((Position::on_ground(1.5, 0.2), agent(0.4)));
        let mut colliders = FootprintColliders::new();
        colliders.rebuild(&world);
        let index = spatial_index::build(&world, &GridSettings::default());
        run(&mut world, &index, &colliders);
        let pos = world.get::<&Position>(a).unwrap().0;
        assert!((pos.x - 2.4).abs() < 1e-5);
        assert!((pos.z - 0.2).abs() < 1e-5);
    }
}
