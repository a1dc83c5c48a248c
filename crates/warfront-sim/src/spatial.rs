//! Uniform hash grids over the ground plane.
//!
//! Two grids are rebuilt from scratch every tick: a coarse targeting grid
//! holding everything that may be shot at, and a finer movement grid
//! holding agents for neighbour avoidance. Cell keys pack the two signed
//! cell coordinates into one `i64`.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use hecs::Entity;

use warfront_core::types::Team;

/// Packs cell coordinates `(cx, cz)` into a single key.
pub fn cell_key(cx: i32, cz: i32) -> i64 {
    ((cx as i64) << 32) | (cz as u32 as i64)
}

/// Cell coordinates containing a ground point.
pub fn cell_of(point: Vec2, cell_size: f32) -> (i32, i32) {
    (
        (point.x / cell_size).floor() as i32,
        (point.y / cell_size).floor() as i32,
    )
}

/// Keys of every cell overlapped by the square of half-size `radius`
/// around `center`.
pub fn cells_in_radius(center: Vec2, radius: f32, cell_size: f32) -> impl Iterator<Item = i64> {
    let (x0, z0) = cell_of(center - Vec2::splat(radius), cell_size);
    let (x1, z1) = cell_of(center + Vec2::splat(radius), cell_size);
    (x0..=x1).flat_map(move |cx| (z0..=z1).map(move |cz| cell_key(cx, cz)))
}

/// One entry of the targeting grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetEntry {
    pub entity: Entity,
    pub position: Vec3,
    pub team: Team,
    /// Extra reach needed to touch the object: footprint half-diagonal or
    /// obstacle radius.
    pub extent: f32,
}

/// Hash grid storing `T` per cell.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    cells: HashMap<i64, Vec<T>>,
    /// How far an entry reaches beyond its cell position. Searches that
    /// measure to an entry's surface widen by this much.
    reach: f32,
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            reach: 0.0,
        }
    }

    /// Wrap prebuilt cells, reserving room for `capacity` cells.
    pub fn from_cells(cell_size: f32, mut cells: HashMap<i64, Vec<T>>, capacity: usize) -> Self {
        cells.reserve(capacity.saturating_sub(cells.len()));
        Self {
            cell_size,
            cells,
            reach: 0.0,
        }
    }

    pub fn with_reach(mut self, reach: f32) -> Self {
        self.reach = self.reach.max(reach);
        self
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn insert(&mut self, key: i64, value: T) {
        self.cells.entry(key).or_default().push(value);
    }

    pub fn cell_entries(&self, key: i64) -> &[T] {
        self.cells.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Entries in every cell overlapped by the radius square. Callers
    /// filter by exact distance.
    pub fn query_radius(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &T> + '_ {
        cells_in_radius(center, radius, self.cell_size).flat_map(move |key| self.cell_entries(key).iter())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn entry_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

impl SpatialGrid<TargetEntry> {
    /// Insert into the cell holding the entry's position.
    pub fn insert_target(&mut self, entry: TargetEntry) {
        let (cx, cz) = cell_of(Vec2::new(entry.position.x, entry.position.z), self.cell_size);
        self.reach = self.reach.max(entry.extent);
        self.insert(cell_key(cx, cz), entry);
    }

    /// Closest entry within `radius` accepted by `filter`, measured to the
    /// entry's surface. Ties go to the lower entity id.
    pub fn nearest(
        &self,
        center: Vec2,
        radius: f32,
        mut filter: impl FnMut(&TargetEntry) -> bool,
    ) -> Option<TargetEntry> {
        let mut best: Option<(f32, TargetEntry)> = None;
        for entry in self.query_radius(center, radius + self.reach) {
            if !filter(entry) {
                continue;
            }
            let d = (Vec2::new(entry.position.x, entry.position.z).distance(center) - entry.extent).max(0.0);
            if d > radius {
                continue;
            }
            let better = match best {
                None => true,
                Some((bd, b)) => d < bd || (d == bd && entry.entity.to_bits() < b.entity.to_bits()),
            };
            if better {
                best = Some((d, *entry));
            }
        }
        best.map(|(_, e)| e)
    }
}

/// Both per-tick grids.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    pub targeting: SpatialGrid<TargetEntry>,
    pub movement: SpatialGrid<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn test_cell_key_distinguishes_negative_cells() {
        let keys = [cell_key(-1, 0), cell_key(0, -1), cell_key(-1, -1), cell_key(0, 0)];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(cell_of(Vec2::new(-0.5, 9.9), 10.0), (-1, 0));
    }

    #[test]
    fn test_cells_in_radius_covers_square() {
        let keys: Vec<i64> = cells_in_radius(Vec2::new(5.0, 5.0), 6.0, 10.0).collect();
        assert_eq!(keys.len(), 9);
        let single: Vec<i64> = cells_in_radius(Vec2::new(5.0, 5.0), 1.0, 10.0).collect();
        assert_eq!(single, vec![cell_key(0, 0)]);
    }

    #[test]
    fn test_nearest_respects_filter_and_extent() {
        let mut world = World::new();
        let near = world.spawn(());
        let far = world.spawn(());
        let mut grid = SpatialGrid::new(10.0);
        let entry = |entity, x: f32, team, extent| TargetEntry {
            entity,
            position: Vec3::new(x, 0.0, 0.0),
            team,
            extent,
        };
        grid.insert(cell_key(0, 0), entry(near, 3.0, Team(1), 0.0));
        // Further centre but a large footprint brings its surface closer.
        grid.insert(cell_key(0, 0), entry(far, 6.0, Team(2), 4.5));

        let hit = grid.nearest(Vec2::ZERO, 8.0, |_| true).unwrap();
        assert_eq!(hit.entity, far);
        let hit = grid.nearest(Vec2::ZERO, 8.0, |e| e.team == Team(1)).unwrap();
        assert_eq!(hit.entity, near);
        assert!(grid.nearest(Vec2::ZERO, 2.0, |e| e.team == Team(1)).is_none());
    }

    #[test]
    fn test_nearest_finds_large_footprint_centred_outside_search() {
        let mut world = World::new();
        let depot = world.spawn(());
        let mut grid = SpatialGrid::new(10.0);
        // Centre three cells away, surface 15 from the origin.
        grid.insert_target(TargetEntry {
            entity: depot,
            position: Vec3::new(25.0, 0.0, 0.0),
            team: Team(1),
            extent: 10.0,
        });

        let hit = grid.nearest(Vec2::ZERO, 16.0, |_| true).unwrap();
        assert_eq!(hit.entity, depot);
        assert!(grid.nearest(Vec2::ZERO, 14.0, |_| true).is_none());
    }
}
