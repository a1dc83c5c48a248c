//! Rebuilds both hash grids from the world at the start of every tick.
//!
//! Cells are filled in parallel with a rayon fold/reduce, then each cell is
//! sorted by entity id so iteration order never depends on thread timing.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;

use warfront_core::components::*;
use warfront_core::settings::GridSettings;
use warfront_core::types::{Position, Team};

use crate::spatial::{cell_key, cell_of, cells_in_radius, SpatialGrid, SpatialIndex, TargetEntry};

pub fn build(world: &World, grid: &GridSettings) -> SpatialIndex {
    SpatialIndex {
        targeting: build_targeting(world, grid),
        movement: build_movement(world, grid),
    }
}

/// Every living unit, structure and hostile that may be shot at.
fn build_targeting(world: &World, grid: &GridSettings) -> SpatialGrid<TargetEntry> {
    let mut entries = Vec::new();
    let mut query = world.query::<(
        &Position,
        &Team,
        &Health,
        Option<&Footprint>,
        Option<&Agent>,
        Option<&NonTargetable>,
    )>();
    for (entity, (pos, team, health, footprint, agent, blocked)) in query.iter() {
        if blocked.is_some() || !health.is_alive() {
            continue;
        }
        let extent = match (footprint, agent) {
            (Some(f), _) => f.half_extents.length(),
            (None, Some(a)) => a.obstacle_radius,
            (None, None) => 0.0,
        };
        entries.push(TargetEntry {
            entity,
            position: pos.0,
            team: *team,
            extent,
        });
    }

    let cell_size = grid.targeting_cell;
    let mut cells = bucket(&entries, |e| {
        let (cx, cz) = cell_of(Vec2::new(e.position.x, e.position.z), cell_size);
        vec![(cell_key(cx, cz), *e)]
    });
    for cell in cells.values_mut() {
        cell.sort_unstable_by_key(|e| e.entity.to_bits());
    }
    let reach = entries.iter().map(|e| e.extent).fold(0.0, f32::max);
    SpatialGrid::from_cells(cell_size, cells, capacity(entries.len(), grid.capacity_factor)).with_reach(reach)
}

/// Every agent, registered in each cell its collision circle overlaps so
/// large agents are found from any side.
fn build_movement(world: &World, grid: &GridSettings) -> SpatialGrid<Entity> {
    let agents: Vec<(Entity, Vec3, f32)> = world
        .query::<(&Position, &Agent)>()
        .iter()
        .map(|(entity, (pos, agent))| (entity, pos.0, agent.obstacle_radius))
        .collect();

    let cell_size = grid.movement_cell;
    let mut cells = bucket(&agents, |(entity, pos, radius)| {
        cells_in_radius(Vec2::new(pos.x, pos.z), *radius, cell_size)
            .map(|key| (key, *entity))
            .collect()
    });
    for cell in cells.values_mut() {
        cell.sort_unstable_by_key(|e| e.to_bits());
    }
    SpatialGrid::from_cells(cell_size, cells, capacity(agents.len(), grid.capacity_factor))
}

fn bucket<R, T, F>(rows: &[R], keys: F) -> HashMap<i64, Vec<T>>
where
    R: Sync,
    T: Send,
    F: Fn(&R) -> Vec<(i64, T)> + Sync,
{
    rows.par_iter()
        .fold(HashMap::new, |mut cells: HashMap<i64, Vec<T>>, row| {
            for (key, value) in keys(row) {
                cells.entry(key).or_default().push(value);
            }
            cells
        })
        .reduce(HashMap::new, |mut a, b| {
            for (key, mut values) in b {
                a.entry(key).or_default().append(&mut values);
            }
            a
        })
}

fn capacity(rows: usize, factor: f32) -> usize {
    (rows as f32 * factor).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use warfront_core::enums::AgentType;

    fn agent(radius: f32) -> Agent {
        Agent {
            speed: 1.0,
            obstacle_radius: radius,
            agent_type: AgentType::Infantry,
        }
    }

    #[test]
    fn test_large_agent_registered_in_every_overlapped_cell() {
        let mut world = World::new();
        let big = world.spawn((Position::on_ground(3.0, 3.0), agent(2.0)));
        let small = world.spawn((Position::on_ground(1.0, 1.0), agent(0.4)));
        let index = build(&world, &GridSettings::default());
        let cell = index.movement.cell_size();
        assert_eq!(cell, 3.0);
        // Big agent spans x,z in [1, 5]: cells 0..=1 on both axes.
        for (cx, cz) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!(index.movement.cell_entries(cell_key(cx, cz)).contains(&big));
        }
        assert_eq!(index.movement.cell_entries(cell_key(0, 0)).len(), 2);
        assert!(!index.movement.cell_entries(cell_key(1, 1)).contains(&small));
    }

    #[test]
    fn test_targeting_skips_dead_and_non_targetable() {
        let mut world = World::new();
        let team = Team(1);
        let live = world.spawn((Position::on_ground(1.0, 1.0), team, Health::full(10.0)));
        world.spawn((
            Position::on_ground(2.0, 2.0),
            team,
            Health { current: 0.0, max: 10.0 },
        ));
        world.spawn((Position::on_ground(3.0, 3.0), team, Health::full(10.0), NonTargetable));
        let index = build(&world, &GridSettings::default());
        assert_eq!(index.targeting.entry_count(), 1);
        assert_eq!(index.targeting.cell_entries(cell_key(0, 0))[0].entity, live);
    }

    #[test]
    fn test_cells_sorted_by_entity() {
        let mut world = World::new();
        for i in 0..200 {
            world.spawn((Position::on_ground((i % 7) as f32 * 0.3, 0.5), agent(0.1)));
        }
        let index = build(&world, &GridSettings::default());
        let cell = index.movement.cell_entries(cell_key(0, 0));
        assert_eq!(cell.len(), 200);
        assert!(cell.windows(2).all(|w| w[0].to_bits() < w[1].to_bits()));
    }
}
