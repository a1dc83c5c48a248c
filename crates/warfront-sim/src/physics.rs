//! Box and ray queries against structure footprints.
//!
//! The simulation only needs two physics questions: "does this box overlap
//! anything" (placement, push-out) and "does this segment hit anything"
//! (path invalidation). `PhysicsQuery` is the seam; `FootprintColliders`
//! answers both from the axis-aligned footprints in the world.

use glam::Vec2;
use hecs::{Entity, World};

use warfront_core::components::Footprint;
use warfront_core::types::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxHit {
    pub entity: Entity,
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl BoxHit {
    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
}

/// Accepts every collider.
pub fn any_collider(_: Entity) -> bool {
    true
}

/// Collider queries. `filter` decides which colliders take part.
pub trait PhysicsQuery {
    /// First collider overlapping the box. Touching edges do not overlap.
    fn check_box(&self, center: Vec2, half_extents: Vec2, filter: &dyn Fn(Entity) -> bool) -> Option<BoxHit>;

    /// Nearest collider crossed by the segment `from -> to`.
    fn cast_ray(&self, from: Vec2, to: Vec2, filter: &dyn Fn(Entity) -> bool) -> Option<RayHit>;
}

#[derive(Debug, Clone, Default)]
pub struct FootprintColliders {
    boxes: Vec<BoxHit>,
}

impl FootprintColliders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collider set with every footprint currently in the world.
    pub fn rebuild(&mut self, world: &World) {
        self.boxes.clear();
        for (entity, (pos, footprint)) in world.query::<(&Position, &Footprint)>().iter() {
            self.boxes.push(BoxHit {
                entity,
                center: pos.ground(),
                half_extents: footprint.half_extents,
            });
        }
        self.boxes.sort_unstable_by_key(|b| b.entity.to_bits());
    }

    /// Add a collider placed mid-tick so later queries in the same tick see it.
    pub fn insert(&mut self, entity: Entity, center: Vec2, half_extents: Vec2) {
        self.boxes.push(BoxHit {
            entity,
            center,
            half_extents,
        });
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl PhysicsQuery for FootprintColliders {
    fn check_box(&self, center: Vec2, half_extents: Vec2, filter: &dyn Fn(Entity) -> bool) -> Option<BoxHit> {
        self.boxes.iter().copied().filter(|b| filter(b.entity)).find(|b| {
            let gap = (b.center - center).abs();
            let reach = b.half_extents + half_extents;
            gap.x < reach.x && gap.y < reach.y
        })
    }

    fn cast_ray(&self, from: Vec2, to: Vec2, filter: &dyn Fn(Entity) -> bool) -> Option<RayHit> {
        let delta = to - from;
        let length = delta.length();
        let mut best: Option<RayHit> = None;
        for b in self.boxes.iter().filter(|b| filter(b.entity)) {
            if let Some(t) = segment_enters_box(from, delta, b.min(), b.max()) {
                let distance = t * length;
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(RayHit {
                        entity: b.entity,
                        distance,
                    });
                }
            }
        }
        best
    }
}

/// Slab test. Returns the segment parameter in [0, 1] where it enters the box.
fn segment_enters_box(from: Vec2, delta: Vec2, min: Vec2, max: Vec2) -> Option<f32> {
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    for axis in 0..2 {
        let (o, d, lo, hi) = (from[axis], delta[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if o <= lo || o >= hi {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter >= t_exit {
            return None;
        }
    }
    Some(t_enter)
}

/// Closest point to `point` that lies on or outside the box. Points already
/// outside are projected onto the boundary; points inside leave through the
/// nearest edge.
pub fn closest_point_outside(point: Vec2, center: Vec2, half_extents: Vec2) -> Vec2 {
    let local = point - center;
    if local.x.abs() >= half_extents.x || local.y.abs() >= half_extents.y {
        return center + local.clamp(-half_extents, half_extents);
    }
    let to_x = half_extents.x - local.x.abs();
    let to_z = half_extents.y - local.y.abs();
    let mut out = local;
    if to_x <= to_z {
        out.x = if local.x >= 0.0 { half_extents.x } else { -half_extents.x };
    } else {
        out.y = if local.y >= 0.0 { half_extents.y } else { -half_extents.y };
    }
    center + out
}

/// Ground distance from a point to a box (zero inside it).
pub fn distance_to_box(point: Vec2, center: Vec2, half_extents: Vec2) -> f32 {
    let local = (point - center).abs() - half_extents;
    local.max(Vec2::ZERO).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colliders(world: &mut World) -> (FootprintColliders, Entity) {
        let wall = world.spawn((
            Position::on_ground(0.0, 0.0),
            Footprint {
                half_extents: Vec2::new(2.0, 1.0),
            },
        ));
        let mut colliders = FootprintColliders::new();
        colliders.rebuild(world);
        (colliders, wall)
    }

    #[test]
    fn test_check_box_overlap_and_touching() {
        let mut world = World::new();
        let (colliders, wall) = colliders(&mut world);
        let hit = colliders
            .check_box(Vec2::new(2.5, 0.0), Vec2::splat(1.0), &any_collider)
            .unwrap();
        assert_eq!(hit.entity, wall);
        // Edges touching exactly is not an overlap.
        assert!(colliders
            .check_box(Vec2::new(3.0, 0.0), Vec2::splat(1.0), &any_collider)
            .is_none());
        assert!(colliders
            .check_box(Vec2::new(0.0, 5.0), Vec2::splat(1.0), &any_collider)
            .is_none());
        // Filtered out.
        assert!(colliders
            .check_box(Vec2::new(2.5, 0.0), Vec2::splat(1.0), &|e| e != wall)
            .is_none());
    }

    #[test]
    fn test_cast_ray_reports_entry_distance() {
        let mut world = World::new();
        let (colliders, wall) = colliders(&mut world);
        let (from, to) = (Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0));
        let hit = colliders.cast_ray(from, to, &any_collider).unwrap();
        assert_eq!(hit.entity, wall);
        assert!((hit.distance - 8.0).abs() < 1e-4);
        assert!(colliders
            .cast_ray(Vec2::new(-10.0, 3.0), Vec2::new(10.0, 3.0), &any_collider)
            .is_none());
        // Segment stopping short of the box.
        assert!(colliders
            .cast_ray(from, Vec2::new(-3.0, 0.0), &any_collider)
            .is_none());
        assert!(colliders.cast_ray(from, to, &|e| e != wall).is_none());
    }

    #[test]
    fn test_closest_point_outside() {
        let c = Vec2::ZERO;
        let h = Vec2::new(2.0, 1.0);
        // Inside, nearer the top edge.
        assert_eq!(closest_point_outside(Vec2::new(0.5, 0.8), c, h), Vec2::new(0.5, 1.0));
        // Inside, nearer the right edge.
        assert_eq!(closest_point_outside(Vec2::new(1.9, 0.0), c, h), Vec2::new(2.0, 0.0));
        // Outside projects onto the boundary.
        assert_eq!(closest_point_outside(Vec2::new(5.0, 5.0), c, h), Vec2::new(2.0, 1.0));
    }

    #[test]
    fn test_distance_to_box() {
        let h = Vec2::new(2.0, 1.0);
        assert_eq!(distance_to_box(Vec2::new(1.0, 0.5), Vec2::ZERO, h), 0.0);
        assert!((distance_to_box(Vec2::new(5.0, 0.0), Vec2::ZERO, h) - 3.0).abs() < 1e-6);
    }
}
