//! Waypoint following.
//!
//! Each agent steps toward its current waypoint by at most `speed * dt` and
//! never past it, so it cannot overshoot and orbit. Reaching a waypoint
//! means being inside the arrival radius, which is always larger than the
//! obstacle radius.

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;

use warfront_core::components::{Agent, Intent, MovementGoal, PathBuffer, WaypointState};
use warfront_core::constants::DT;
use warfront_core::enums::MovePhase;
use warfront_core::types::Position;

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub position: Vec3,
    pub reached: bool,
}

/// Move from `position` toward `target` on the ground plane.
pub fn step(position: Vec3, target: Vec3, speed: f32, arrival_radius: f32, dt: f32) -> Step {
    let delta = Vec2::new(target.x - position.x, target.z - position.z);
    let distance = delta.length();
    if distance <= arrival_radius {
        return Step {
            position,
            reached: true,
        };
    }
    let travel = (speed * dt).min(distance);
    let offset = delta / distance * travel;
    Step {
        position: Vec3::new(position.x + offset.x, position.y, position.z + offset.y),
        reached: distance - travel <= arrival_radius,
    }
}

pub fn run(world: &mut World) {
    let movers: Vec<(Entity, Vec3, f32, WaypointState)> = world
        .query::<(&Position, &Agent, &WaypointState)>()
        .iter()
        .filter(|(_, (_, _, waypoint))| waypoint.enabled)
        .map(|(entity, (pos, agent, waypoint))| (entity, pos.0, agent.speed, *waypoint))
        .collect();

    let steps: Vec<(Entity, Step)> = movers
        .par_iter()
        .map(|(entity, pos, speed, waypoint)| {
            (
                *entity,
                step(*pos, waypoint.current, *speed, waypoint.arrival_radius, DT),
            )
        })
        .collect();

    for (entity, result) in steps {
        let Ok((pos, goal, waypoint, buffer, intent)) = world.query_one_mut::<(
            &mut Position,
            &mut MovementGoal,
            &mut WaypointState,
            &PathBuffer,
            Option<&mut Intent>,
        )>(entity) else {
            continue;
        };
        pos.0 = result.position;
        if !result.reached {
            continue;
        }
        if advance(goal, waypoint, buffer) {
            if let Some(intent) = intent {
                if *intent == Intent::Move {
                    *intent = Intent::None;
                }
            }
        }
    }
}

/// Move on to the next waypoint. Returns true when the path is finished.
pub fn advance(goal: &mut MovementGoal, waypoint: &mut WaypointState, buffer: &PathBuffer) -> bool {
    if !waypoint.has_next {
        waypoint.enabled = false;
        goal.current_waypoint = goal.total_waypoints;
        goal.phase = MovePhase::Arrived;
        return true;
    }
    goal.current_waypoint += 1;
    waypoint.current = waypoint.next;
    match buffer.points.get(goal.current_waypoint + 1) {
        Some(next) => waypoint.next = *next,
        None => waypoint.has_next = false,
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_never_overshoots() {
        let s = step(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 100.0, 0.1, 1.0);
        assert_eq!(s.position, Vec3::new(1.0, 0.0, 0.0));
        assert!(s.reached);
    }

    #[test]
    fn test_step_moves_by_speed() {
        let s = step(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 3.0, 0.5, 1.0);
        assert!((s.position.z - 3.0).abs() < 1e-5);
        assert!(!s.reached);
    }

    #[test]
    fn test_follow_multi_leg_path_to_arrival() {
        let points = vec![
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, 5.0),
        ];
        let mut goal = MovementGoal::default();
        let mut waypoint = WaypointState {
            arrival_radius: 0.45,
            ..Default::default()
        };
        let buffer = PathBuffer { points };
        super::super::pathing::load_path(&mut goal, &mut waypoint, &buffer);

        let mut world = World::new();
        let e = world.spawn((
            Position::on_ground(0.0, 0.0),
            Agent {
                speed: 4.0,
                obstacle_radius: 0.4,
                agent_type: Default::default(),
            },
            goal,
            waypoint,
            buffer,
            Intent::Move,
        ));

        let mut ticks = 0;
        while world.get::<&WaypointState>(e).unwrap().enabled {
            run(&mut world);
            ticks += 1;
            assert!(ticks < 300, "agent never arrived");
        }
        let goal = *world.get::<&MovementGoal>(e).unwrap();
        assert_eq!(goal.phase, MovePhase::Arrived);
        assert_eq!(goal.current_waypoint, 4);
        assert_eq!(*world.get::<&Intent>(e).unwrap(), Intent::None);
        let pos = world.get::<&Position>(e).unwrap().0;
        assert!(pos.distance(Vec3::new(0.0, 0.0, 5.0)) <= 0.45 + 1e-4);
    }
}
