//! Per-tick systems, run by the engine in a fixed order.

pub mod avoidance;
pub mod cleanup;
pub mod combat;
pub mod commands;
pub mod construction;
pub mod gathering;
pub mod movement;
pub mod pathing;
pub mod production;
pub mod snapshot;
pub mod spatial_index;
pub mod targeting;
pub mod waves;

use glam::{Vec2, Vec3};
use hecs::{Entity, World};

use warfront_core::components::{Agent, Footprint, MovementGoal, WaypointState};
use warfront_core::enums::MovePhase;
use warfront_core::types::Position;

use crate::physics::{closest_point_outside, distance_to_box};

/// Where an agent of `radius` should walk to interact with `target`: just
/// outside a footprint on the side facing the agent, or the target's
/// position when it has none.
pub fn interaction_point(world: &World, from: Vec3, target: Entity, radius: f32, reach: f32) -> Option<Vec3> {
    let pos = world.get::<&Position>(target).ok()?.0;
    let Ok(footprint) = world.get::<&Footprint>(target) else {
        return Some(pos);
    };
    let stand_off = footprint.half_extents + Vec2::splat(radius + reach * 0.5);
    let point = closest_point_outside(
        Vec2::new(from.x, from.z),
        Vec2::new(pos.x, pos.z),
        stand_off,
    );
    Some(Vec3::new(point.x, 0.0, point.y))
}

/// Gap between an agent's surface and the target's collision circle or
/// footprint.
pub fn gap_to(world: &World, from: Vec2, radius: f32, target: Entity) -> Option<f32> {
    let pos = world.get::<&Position>(target).ok()?.ground();
    let gap = match world.get::<&Footprint>(target) {
        Ok(footprint) => distance_to_box(from, pos, footprint.half_extents),
        Err(_) => {
            let target_radius = world.get::<&Agent>(target).map_or(0.0, |a| a.obstacle_radius);
            from.distance(pos) - target_radius
        }
    };
    Some((gap - radius).max(0.0))
}

/// Halt an agent where it stands.
pub fn halt(goal: &mut MovementGoal, waypoint: &mut WaypointState) {
    goal.dirty = false;
    if goal.phase != MovePhase::Idle {
        goal.phase = MovePhase::Arrived;
    }
    waypoint.enabled = false;
}
