//! Funnel (string-pulling) straightening of a polygon corridor.
//!
//! The funnel is anchored at an apex and bounded by a left and a right
//! edge. Each portal tries to narrow one side; when a side would cross
//! over the other, the point on the crossed side becomes a waypoint and
//! the funnel restarts from it.

use glam::Vec3;
use thiserror::Error;

use warfront_core::constants::{MAX_PATH_POINTS, POINT_MERGE_EPSILON_SQ};

use crate::corridor::{Corridor, NavError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunnelError {
    #[error(transparent)]
    Corridor(#[from] NavError),
    #[error("straightened path exceeds {MAX_PATH_POINTS} points")]
    TooManyPoints,
    #[error("funnel did not converge")]
    DidNotConverge,
}

/// Twice the signed area of triangle (a, b, c) on the XZ plane.
/// Positive when `c` lies to the left of `a -> b`.
fn cross(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
}

fn coincident(a: Vec3, b: Vec3) -> bool {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz <= POINT_MERGE_EPSILON_SQ
}

fn push_point(path: &mut Vec<Vec3>, point: Vec3) -> Result<(), FunnelError> {
    if path.last().is_some_and(|last| coincident(*last, point)) {
        return Ok(());
    }
    if path.len() >= MAX_PATH_POINTS {
        return Err(FunnelError::TooManyPoints);
    }
    path.push(point);
    Ok(())
}

/// Reduce `corridor` to the shortest waypoint list from `start` to `end`
/// that stays inside it. The first point is `start`, the last is `end`.
pub fn string_pull(corridor: &Corridor, start: Vec3, end: Vec3) -> Result<Vec<Vec3>, FunnelError> {
    if corridor.polygons.len() <= 1 {
        return Ok(vec![start, end]);
    }

    let portals = corridor.portals(start, end)?;
    let mut path = vec![start];

    let mut apex = start;
    let mut left = start;
    let mut right = start;
    let mut apex_index = 0;
    let mut left_index = 0;
    let mut right_index = 0;

    // Every restart moves the apex forward by at least one portal.
    let max_iterations = portals.len() * (MAX_PATH_POINTS + 1);
    let mut iterations = 0;

    let mut i = 1;
    while i < portals.len() {
        iterations += 1;
        if iterations > max_iterations {
            return Err(FunnelError::DidNotConverge);
        }
        let portal = portals[i];

        // Right side: narrow unless the new point crosses the left edge.
        if cross(apex, right, portal.right) >= 0.0 {
            if coincident(apex, right) || cross(apex, left, portal.right) < 0.0 {
                right = portal.right;
                right_index = i;
            } else {
                push_point(&mut path, left)?;
                apex = left;
                apex_index = left_index;
                right = apex;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        // Left side: narrow unless the new point crosses the right edge.
        if cross(apex, left, portal.left) <= 0.0 {
            if coincident(apex, left) || cross(apex, right, portal.left) > 0.0 {
                left = portal.left;
                left_index = i;
            } else {
                push_point(&mut path, right)?;
                apex = right;
                apex_index = right_index;
                left = apex;
                left_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    push_point(&mut path, end)?;
    Ok(path)
}

/// `string_pull`, falling back to the direct line when the corridor cannot
/// be straightened. The flag reports whether the fallback was taken.
pub fn straighten_or_direct(corridor: &Corridor, start: Vec3, end: Vec3) -> (Vec<Vec3>, bool) {
    match string_pull(corridor, start, end) {
        Ok(path) => (path, false),
        Err(_) => (vec![start, end], true),
    }
}
