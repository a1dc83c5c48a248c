//! Navigation for WARFRONT.
//!
//! Corridor types, the navigation query seam, the funnel (string-pulling)
//! straightener, and a tile-grid navigation mesh. Pure geometry, no ECS
//! dependency.

pub mod corridor;
pub mod funnel;
pub mod tile_mesh;

pub use corridor::{ConvexPolygon, Corridor, NavError, NavQuery, OpenField, Portal};
pub use funnel::{string_pull, straighten_or_direct, FunnelError};
pub use tile_mesh::TileNavMesh;
pub use warfront_core as core;

#[cfg(test)]
mod tests;
