//! Polygon corridors and the navigation query seam.
//!
//! Polygons lie on the XZ plane and list their vertices counter-clockwise
//! when viewed with +x to the right and +z up. Consecutive corridor
//! polygons share exactly one edge.

use glam::{Vec2, Vec3};
use thiserror::Error;

use warfront_core::enums::AgentType;

/// Squared XZ distance under which two vertices are the same vertex.
const VERTEX_EPSILON_SQ: f32 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavError {
    #[error("point ({x}, {z}) is outside the navigation mesh")]
    OutOfBounds { x: f32, z: f32 },
    #[error("point ({x}, {z}) is not walkable")]
    Blocked { x: f32, z: f32 },
    #[error("no corridor connects the start and end polygons")]
    NoCorridor,
    #[error("corridor polygon {index} shares no edge with its successor")]
    Disconnected { index: usize },
}

/// A convex walkable polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    pub vertices: Vec<Vec3>,
}

impl ConvexPolygon {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle on the ground plane.
    pub fn rect(min: Vec2, max: Vec2) -> Self {
        Self::new(vec![
            Vec3::new(min.x, 0.0, min.y),
            Vec3::new(max.x, 0.0, min.y),
            Vec3::new(max.x, 0.0, max.y),
            Vec3::new(min.x, 0.0, max.y),
        ])
    }

    fn has_vertex(&self, point: Vec3) -> bool {
        self.vertices.iter().any(|v| same_xz(*v, point))
    }
}

/// Edge crossed when leaving one corridor polygon for the next, oriented
/// relative to the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portal {
    pub left: Vec3,
    pub right: Vec3,
}

impl Portal {
    fn point(p: Vec3) -> Self {
        Self { left: p, right: p }
    }
}

/// Ordered polygons from the start polygon to the end polygon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corridor {
    pub polygons: Vec<ConvexPolygon>,
}

impl Corridor {
    pub fn new(polygons: Vec<ConvexPolygon>) -> Self {
        Self { polygons }
    }

    /// Portal list for the funnel: a degenerate portal at `start`, one per
    /// shared edge, and a degenerate portal at `end`.
    pub fn portals(&self, start: Vec3, end: Vec3) -> Result<Vec<Portal>, NavError> {
        let mut portals = Vec::with_capacity(self.polygons.len() + 1);
        portals.push(Portal::point(start));
        for (index, pair) in self.polygons.windows(2).enumerate() {
            let portal = shared_edge(&pair[0], &pair[1]).ok_or(NavError::Disconnected { index })?;
            portals.push(portal);
        }
        portals.push(Portal::point(end));
        Ok(portals)
    }
}

/// Find the edge of `from` that `to` also has. Walking `from` counter-
/// clockwise, the interior is on the left of each edge, so a traveller
/// leaving through edge `v0 -> v1` has `v1` on its left.
fn shared_edge(from: &ConvexPolygon, to: &ConvexPolygon) -> Option<Portal> {
    let n = from.vertices.len();
    (0..n).find_map(|j| {
        let v0 = from.vertices[j];
        let v1 = from.vertices[(j + 1) % n];
        (to.has_vertex(v0) && to.has_vertex(v1)).then_some(Portal {
            left: v1,
            right: v0,
        })
    })
}

pub(crate) fn same_xz(a: Vec3, b: Vec3) -> bool {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz <= VERTEX_EPSILON_SQ
}

/// Navigation corridor provider.
pub trait NavQuery: Send + Sync {
    /// Polygons an agent of `agent` type walks through from `start` to `end`.
    fn find_corridor(&self, start: Vec3, end: Vec3, agent: AgentType) -> Result<Corridor, NavError>;

    /// Mark a ground rectangle blocked (or free again). Meshes that cannot
    /// change at runtime ignore this.
    fn carve(&mut self, _min: Vec2, _max: Vec2, _blocked: bool) {}
}

/// A single open rectangle: every corridor is one polygon.
#[derive(Debug, Clone)]
pub struct OpenField {
    pub min: Vec2,
    pub max: Vec2,
}

impl NavQuery for OpenField {
    fn find_corridor(&self, start: Vec3, end: Vec3, _agent: AgentType) -> Result<Corridor, NavError> {
        for p in [start, end] {
            if p.x < self.min.x || p.x > self.max.x || p.z < self.min.y || p.z > self.max.y {
                return Err(NavError::OutOfBounds { x: p.x, z: p.z });
            }
        }
        Ok(Corridor::new(vec![ConvexPolygon::rect(self.min, self.max)]))
    }
}
