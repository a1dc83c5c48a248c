//! Tile-grid navigation mesh.
//!
//! Every walkable tile is a square polygon; corridors are found with A*
//! over 4-connected tiles. Structures carve tiles out when placed and give
//! them back when destroyed.

use glam::{Vec2, Vec3};
use pathfinding::prelude::astar;

use warfront_core::enums::AgentType;

use crate::corridor::{ConvexPolygon, Corridor, NavError, NavQuery};

type Tile = (i32, i32);

const NEIGHBOURS: [Tile; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// How far a blocked endpoint may be moved to reach a walkable tile.
const SNAP_RINGS: i32 = 2;

#[derive(Debug, Clone)]
pub struct TileNavMesh {
    origin: Vec2,
    tile: f32,
    width: i32,
    height: i32,
    /// Number of carved rectangles covering each tile.
    blockers: Vec<u16>,
}

impl TileNavMesh {
    /// Cover `min..max` with square tiles of side `tile`.
    pub fn new(min: Vec2, max: Vec2, tile: f32) -> Self {
        let size = (max - min) / tile;
        let width = size.x.ceil().max(1.0) as i32;
        let height = size.y.ceil().max(1.0) as i32;
        Self {
            origin: min,
            tile,
            width,
            height,
            blockers: vec![0; (width * height) as usize],
        }
    }

    pub fn tile_of(&self, point: Vec3) -> Option<Tile> {
        let x = ((point.x - self.origin.x) / self.tile).floor() as i32;
        let z = ((point.z - self.origin.y) / self.tile).floor() as i32;
        self.in_bounds((x, z)).then_some((x, z))
    }

    fn in_bounds(&self, (x, z): Tile) -> bool {
        x >= 0 && z >= 0 && x < self.width && z < self.height
    }

    fn index(&self, (x, z): Tile) -> usize {
        (z * self.width + x) as usize
    }

    pub fn is_blocked(&self, tile: Tile) -> bool {
        !self.in_bounds(tile) || self.blockers[self.index(tile)] > 0
    }

    /// Vehicles keep one tile of clearance from anything blocked.
    fn walkable(&self, tile: Tile, agent: AgentType) -> bool {
        if self.is_blocked(tile) {
            return false;
        }
        match agent {
            AgentType::Infantry => true,
            AgentType::Vehicle => NEIGHBOURS
                .iter()
                .all(|(dx, dz)| {
                    let n = (tile.0 + dx, tile.1 + dz);
                    !self.in_bounds(n) || self.blockers[self.index(n)] == 0
                }),
        }
    }

    /// The tile itself if walkable, otherwise the closest walkable tile
    /// within `SNAP_RINGS`. Agents standing against a structure often sit
    /// in a tile the structure only partly covers.
    fn snap(&self, tile: Tile, agent: AgentType) -> Option<Tile> {
        if self.walkable(tile, agent) {
            return Some(tile);
        }
        let mut best: Option<(i32, Tile)> = None;
        for dz in -SNAP_RINGS..=SNAP_RINGS {
            for dx in -SNAP_RINGS..=SNAP_RINGS {
                let candidate = (tile.0 + dx, tile.1 + dz);
                let d = dx * dx + dz * dz;
                if best.map_or(true, |(bd, _)| d < bd) && self.walkable(candidate, agent) {
                    best = Some((d, candidate));
                }
            }
        }
        best.map(|(_, t)| t)
    }

    fn polygon(&self, (x, z): Tile) -> ConvexPolygon {
        let min = self.origin + Vec2::new(x as f32, z as f32) * self.tile;
        let max = self.origin + Vec2::new((x + 1) as f32, (z + 1) as f32) * self.tile;
        ConvexPolygon::rect(min, max)
    }

    fn tiles_covering(&self, min: Vec2, max: Vec2) -> impl Iterator<Item = Tile> {
        let lo = ((min - self.origin) / self.tile).floor();
        // Shrink slightly so a rectangle ending exactly on a tile edge does
        // not claim the next tile.
        let hi = ((max - self.origin) / self.tile - Vec2::splat(1e-4)).floor();
        let (x0, z0) = (lo.x.max(0.0) as i32, lo.y.max(0.0) as i32);
        let (x1, z1) = (
            (hi.x as i32).min(self.width - 1),
            (hi.y as i32).min(self.height - 1),
        );
        (z0..=z1).flat_map(move |z| (x0..=x1).map(move |x| (x, z)))
    }
}

impl NavQuery for TileNavMesh {
    fn find_corridor(&self, start: Vec3, end: Vec3, agent: AgentType) -> Result<Corridor, NavError> {
        let from = self
            .tile_of(start)
            .ok_or(NavError::OutOfBounds { x: start.x, z: start.z })?;
        let to = self
            .tile_of(end)
            .ok_or(NavError::OutOfBounds { x: end.x, z: end.z })?;
        let from = self
            .snap(from, agent)
            .ok_or(NavError::Blocked { x: start.x, z: start.z })?;
        let to = self
            .snap(to, agent)
            .ok_or(NavError::Blocked { x: end.x, z: end.z })?;

        let (tiles, _cost) = astar(
            &from,
            |&(x, z)| {
                NEIGHBOURS
                    .iter()
                    .map(move |(dx, dz)| (x + dx, z + dz))
                    .filter(|&n| self.walkable(n, agent))
                    .map(|n| (n, 1u32))
                    .collect::<Vec<_>>()
            },
            |&(x, z)| x.abs_diff(to.0) + z.abs_diff(to.1),
            |&tile| tile == to,
        )
        .ok_or(NavError::NoCorridor)?;

        Ok(Corridor::new(tiles.into_iter().map(|t| self.polygon(t)).collect()))
    }

    fn carve(&mut self, min: Vec2, max: Vec2, blocked: bool) {
        let tiles: Vec<Tile> = self.tiles_covering(min, max).collect();
        for tile in tiles {
            let idx = self.index(tile);
            self.blockers[idx] = if blocked {
                self.blockers[idx].saturating_add(1)
            } else {
                self.blockers[idx].saturating_sub(1)
            };
        }
    }
}
