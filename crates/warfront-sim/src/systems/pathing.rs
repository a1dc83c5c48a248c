//! Turns dirty movement goals into straightened waypoint lists.
//!
//! Corridor search and funnel straightening are read-only and run on rayon.
//! A failed search degrades to a straight line to the destination.

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;
use tracing::debug;

use warfront_core::components::{Agent, MovementGoal, PathBuffer, WaypointState};
use warfront_core::enums::{AgentType, MovePhase};
use warfront_core::types::Position;
use warfront_nav::{straighten_or_direct, NavQuery};

use crate::physics::PhysicsQuery;

struct PathJob {
    entity: Entity,
    start: Vec3,
    destination: Vec3,
    agent_type: AgentType,
}

pub fn run(world: &mut World, nav: &dyn NavQuery, colliders: &dyn PhysicsQuery, placed: &[Entity]) {
    invalidate_crossing(world, colliders, placed);

    let jobs: Vec<PathJob> = world
        .query::<(&Position, &Agent, &MovementGoal)>()
        .iter()
        .filter(|(_, (_, _, goal))| goal.dirty)
        .map(|(entity, (pos, agent, goal))| PathJob {
            entity,
            start: pos.0,
            destination: goal.destination,
            agent_type: agent.agent_type,
        })
        .collect();
    if jobs.is_empty() {
        return;
    }

    let paths: Vec<(Entity, Vec<Vec3>, bool)> = jobs
        .par_iter()
        .map(|job| {
            let (points, fallback) = plan(nav, job.start, job.destination, job.agent_type);
            (job.entity, points, fallback)
        })
        .collect();

    for (entity, points, fallback) in paths {
        if fallback {
            debug!(?entity, "no corridor, walking straight");
        }
        if let Ok((goal, waypoint, buffer)) =
            world.query_one_mut::<(&mut MovementGoal, &mut WaypointState, &mut PathBuffer)>(entity)
        {
            buffer.points = points;
            load_path(goal, waypoint, buffer);
        }
    }
}

/// Straightened path from `start` to `end`, or the direct line when either
/// the corridor search or the funnel fails. The flag reports the fallback.
pub fn plan(nav: &dyn NavQuery, start: Vec3, end: Vec3, agent: AgentType) -> (Vec<Vec3>, bool) {
    match nav.find_corridor(start, end, agent) {
        Ok(corridor) => straighten_or_direct(&corridor, start, end),
        Err(_) => (vec![start, end], true),
    }
}

/// Point the waypoint state at the first point after the start.
pub fn load_path(goal: &mut MovementGoal, waypoint: &mut WaypointState, buffer: &PathBuffer) {
    goal.dirty = false;
    goal.total_waypoints = buffer.points.len();
    if buffer.points.len() < 2 {
        goal.current_waypoint = buffer.points.len();
        goal.phase = MovePhase::Arrived;
        waypoint.enabled = false;
        return;
    }
    goal.current_waypoint = 1;
    goal.phase = MovePhase::Following;
    waypoint.current = buffer.points[1];
    waypoint.has_next = buffer.points.len() > 2;
    waypoint.next = buffer.points.get(2).copied().unwrap_or(buffer.points[1]);
    waypoint.enabled = true;
}

/// Re-path agents whose current leg now runs through a structure placed
/// this tick.
fn invalidate_crossing(world: &mut World, colliders: &dyn PhysicsQuery, placed: &[Entity]) {
    if placed.is_empty() {
        return;
    }
    let placed_this_tick = |e: Entity| placed.contains(&e);
    for (_entity, (pos, goal, waypoint)) in
        world.query_mut::<(&Position, &mut MovementGoal, &WaypointState)>()
    {
        if !waypoint.enabled || goal.dirty {
            continue;
        }
        let to = Vec2::new(waypoint.current.x, waypoint.current.z);
        if colliders.cast_ray(pos.ground(), to, &placed_this_tick).is_some() {
            let destination = goal.destination;
            goal.request(destination);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::FootprintColliders;
    use warfront_nav::OpenField;

    fn agent() -> Agent {
        Agent {
            speed: 4.0,
            obstacle_radius: 0.4,
            agent_type: AgentType::Infantry,
        }
    }

    #[test]
    fn test_dirty_goal_gets_path() {
        let mut world = World::new();
        let mut goal = MovementGoal::default();
        goal.request(Vec3::new(10.0, 0.0, 0.0));
        let e = world.spawn((
            Position::on_ground(0.0, 0.0),
            agent(),
            goal,
            WaypointState::default(),
            PathBuffer::default(),
        ));
        let nav = OpenField {
            min: Vec2::splat(-50.0),
            max: Vec2::splat(50.0),
        };
        run(&mut world, &nav, &FootprintColliders::new(), &[]);

        let goal = *world.get::<&MovementGoal>(e).unwrap();
        let waypoint = *world.get::<&WaypointState>(e).unwrap();
        assert!(!goal.dirty);
        assert_eq!(goal.phase, MovePhase::Following);
        assert_eq!(goal.total_waypoints, 2);
        assert!(waypoint.enabled);
        assert!(!waypoint.has_next);
        assert_eq!(waypoint.current, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_out_of_bounds_destination_falls_back_to_direct() {
        let mut world = World::new();
        let mut goal = MovementGoal::default();
        goal.request(Vec3::new(80.0, 0.0, 0.0));
        let e = world.spawn((
            Position::on_ground(0.0, 0.0),
            agent(),
            goal,
            WaypointState::default(),
            PathBuffer::default(),
        ));
        let nav = OpenField {
            min: Vec2::splat(-50.0),
            max: Vec2::splat(50.0),
        };
        run(&mut world, &nav, &FootprintColliders::new(), &[]);
        let buffer = world.get::<&PathBuffer>(e).unwrap();
        assert_eq!(buffer.points, vec![Vec3::ZERO, Vec3::new(80.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_placed_structure_invalidates_crossing_leg() {
        let mut world = World::new();
        let mut waypoint = WaypointState::default();
        waypoint.current = Vec3::new(10.0, 0.0, 0.0);
        waypoint.enabled = true;
        let goal = MovementGoal {
            destination: Vec3::new(10.0, 0.0, 0.0),
            phase: MovePhase::Following,
            ..Default::default()
        };
        let crossing = world.spawn((Position::on_ground(0.0, 0.0), goal, waypoint));
        let clear = world.spawn((Position::on_ground(0.0, 8.0), goal, {
            let mut w = waypoint;
            w.current = Vec3::new(10.0, 0.0, 8.0);
            w
        }));
        let structure = world.spawn(());
        let older = world.spawn(());
        let mut colliders = FootprintColliders::new();
        colliders.insert(older, Vec2::new(5.0, 8.0), Vec2::splat(1.0));
        colliders.insert(structure, Vec2::new(5.0, 0.0), Vec2::splat(1.0));

        invalidate_crossing(&mut world, &colliders, &[structure]);
        assert!(world.get::<&MovementGoal>(crossing).unwrap().dirty);
        // Only footprints placed this tick invalidate paths.
        assert!(!world.get::<&MovementGoal>(clear).unwrap().dirty);
    }
}
