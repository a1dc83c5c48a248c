//! Target acquisition, chasing and weapon fire.
//!
//! Idle armed objects pick the nearest hostile from the targeting grid.
//! The grid search runs on rayon; everything that mutates the world runs
//! serially afterwards in query order.

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;

use warfront_core::components::*;
use warfront_core::constants::*;
use warfront_core::enums::MovePhase;
use warfront_core::settings::SimSettings;
use warfront_core::types::{Position, Team};

use crate::spatial::{SpatialIndex, TargetEntry};

use super::{gap_to, halt, interaction_point};

/// Whether objects of team `a` fight objects of team `b`. Players are
/// allied with each other and fight only the hostile team.
pub fn hostile_to(a: Team, b: Team) -> bool {
    a != b && (a == HOSTILE_TEAM || b == HOSTILE_TEAM)
}

pub fn run(world: &mut World, index: &SpatialIndex, settings: &SimSettings) {
    cool_weapons(world);
    drop_lost_targets(world);
    acquire(world, index);
    engage(world, settings);
    march(world, settings);
}

fn cool_weapons(world: &mut World) {
    for (_entity, weapon) in world.query_mut::<&mut Weapon>() {
        weapon.timer = (weapon.timer - DT).max(0.0);
    }
}

fn is_alive(world: &World, entity: Entity) -> bool {
    world.get::<&Health>(entity).map_or(false, |h| h.is_alive())
}

/// Forget targets that died or vanished.
fn drop_lost_targets(world: &mut World) {
    let lost: Vec<Entity> = world
        .query::<&AggroTarget>()
        .iter()
        .filter(|(_, aggro)| !is_alive(world, aggro.target))
        .map(|(entity, _)| entity)
        .collect();
    for entity in lost {
        release_target(world, entity);
    }
}

fn release_target(world: &mut World, entity: Entity) {
    let _ = world.remove_one::<AggroTarget>(entity);
    if let Ok((intent, goal, waypoint)) =
        world.query_one_mut::<(&mut Intent, &mut MovementGoal, &mut WaypointState)>(entity)
    {
        if matches!(*intent, Intent::Attack(_)) {
            *intent = Intent::None;
            halt(goal, waypoint);
        }
    }
}

struct Seeker {
    entity: Entity,
    position: Vec2,
    team: Team,
    radius: f32,
}

/// Give idle armed objects the nearest enemy in range.
fn acquire(world: &mut World, index: &SpatialIndex) {
    let mut seekers = Vec::new();
    let mut query = world.query::<(
        &Position,
        &Team,
        &Health,
        Option<&Weapon>,
        Option<&ExplosionData>,
        Option<&Intent>,
        Option<&AggroTarget>,
        Option<&Construction>,
    )>();
    for (entity, (pos, team, health, weapon, explosion, intent, aggro, construction)) in query.iter() {
        if aggro.is_some() || construction.is_some() || !health.is_alive() {
            continue;
        }
        // Player units only engage on their own when idle; hostiles and
        // structures always do.
        if *team != HOSTILE_TEAM && !matches!(intent, None | Some(Intent::None)) {
            continue;
        }
        let radius = match (weapon, explosion) {
            (Some(w), _) => w.acquire_radius,
            (None, Some(e)) if *team == HOSTILE_TEAM => e.radius * KAMIKAZE_ACQUIRE_FACTOR,
            _ => continue,
        };
        seekers.push(Seeker {
            entity,
            position: pos.ground(),
            team: *team,
            radius,
        });
    }
    drop(query);

    let found: Vec<(Entity, TargetEntry)> = seekers
        .par_iter()
        .filter_map(|s| {
            index
                .targeting
                .nearest(s.position, s.radius, |e| {
                    e.entity != s.entity && hostile_to(s.team, e.team)
                })
                .map(|target| (s.entity, target))
        })
        .collect();

    for (entity, target) in found {
        let _ = world.insert_one(
            entity,
            AggroTarget {
                target: target.entity,
                last_known: target.position,
            },
        );
    }
}

struct Engagement {
    entity: Entity,
    position: Vec2,
    radius: f32,
    aggro: AggroTarget,
    weapon: Option<Weapon>,
    explosion: Option<ExplosionData>,
    mobile: bool,
    ordered: bool,
}

/// Fire at targets in range, chase the rest.
fn engage(world: &mut World, settings: &SimSettings) {
    let rows: Vec<Engagement> = world
        .query::<(
            &Position,
            &AggroTarget,
            Option<&Weapon>,
            Option<&ExplosionData>,
            Option<&Agent>,
            Option<&Intent>,
        )>()
        .iter()
        .map(|(entity, (pos, aggro, weapon, explosion, agent, intent))| Engagement {
            entity,
            position: pos.ground(),
            radius: agent.map_or(0.0, |a| a.obstacle_radius),
            aggro: *aggro,
            weapon: weapon.copied(),
            explosion: explosion.copied(),
            mobile: agent.is_some(),
            ordered: matches!(intent, Some(Intent::Attack(_))),
        })
        .collect();

    let mut damage: Vec<(Entity, f32)> = Vec::new();
    for row in rows {
        let Some(gap) = gap_to(world, row.position, row.radius, row.aggro.target) else {
            continue;
        };
        let Ok(target_pos) = world.get::<&Position>(row.aggro.target).map(|p| p.0) else {
            continue;
        };

        if let Some(weapon) = row.weapon {
            if gap <= weapon.range {
                stop(world, row.entity);
                if weapon.timer <= 0.0 {
                    damage.push((row.aggro.target, weapon.damage));
                    if let Ok(mut w) = world.get::<&mut Weapon>(row.entity) {
                        w.timer = weapon.cooldown_secs;
                    }
                }
                continue;
            }
            let leash = weapon.acquire_radius * LEASH_FACTOR;
            if !row.mobile || (!row.ordered && gap > leash) {
                release_target(world, row.entity);
                continue;
            }
        } else if let Some(explosion) = row.explosion {
            if gap <= explosion.radius * KAMIKAZE_TRIGGER_FRACTION {
                stop(world, row.entity);
                if let Ok(mut countdown) = world.get::<&mut SelfDestructCountdown>(row.entity) {
                    if !countdown.is_armed() {
                        countdown.remaining = explosion.fuse_delay.max(0.0);
                    }
                }
                continue;
            }
        } else {
            continue;
        }

        chase(world, &row, target_pos, settings.combat.chase_repath_distance);
    }

    for (target, amount) in damage {
        if let Ok(mut health) = world.get::<&mut Health>(target) {
            health.current -= amount;
        }
    }
}

fn stop(world: &mut World, entity: Entity) {
    if let Ok((goal, waypoint)) = world.query_one_mut::<(&mut MovementGoal, &mut WaypointState)>(entity) {
        halt(goal, waypoint);
    }
}

/// Re-path towards the target when the current goal points somewhere else,
/// or when the chaser is standing still.
fn chase(world: &mut World, row: &Engagement, target_pos: Vec3, repath_distance: f32) {
    let from = Vec3::new(row.position.x, 0.0, row.position.y);
    let destination =
        interaction_point(world, from, row.aggro.target, row.radius, 0.0).unwrap_or(target_pos);
    let Ok((goal, aggro)) = world.query_one_mut::<(&mut MovementGoal, &mut AggroTarget)>(row.entity) else {
        return;
    };
    let stale = goal.destination.distance(destination) > repath_distance;
    let parked = !goal.dirty && goal.phase != MovePhase::Following;
    if stale || parked {
        aggro.last_known = target_pos;
        goal.request(destination);
    }
}

/// Hostiles with nothing to fight head for the objective.
fn march(world: &mut World, settings: &SimSettings) {
    let objective = settings.waves.objective;
    let objective = Vec3::new(objective.x, 0.0, objective.y);
    for (_entity, (_hostile, goal, aggro)) in
        world.query_mut::<(&Hostile, &mut MovementGoal, Option<&AggroTarget>)>()
    {
        if aggro.is_none() && goal.destination != objective {
            goal.request(objective);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_players_only_fight_hostiles() {
        assert!(hostile_to(HOSTILE_TEAM, Team(1)));
        assert!(hostile_to(Team(2), HOSTILE_TEAM));
        assert!(!hostile_to(Team(1), Team(2)));
        assert!(!hostile_to(HOSTILE_TEAM, HOSTILE_TEAM));
    }
}
