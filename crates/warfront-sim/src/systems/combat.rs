//! Self-destruct countdowns and radius damage.

use hecs::{Entity, World};
use tracing::debug;

use warfront_core::components::{ExplosionData, Footprint, Health, SelfDestructCountdown};
use warfront_core::constants::DT;
use warfront_core::events::SimEvent;
use warfront_core::types::{NetId, Position};

use crate::physics::distance_to_box;

/// Advance armed fuses and detonate the ones that ran out.
pub fn run(world: &mut World, events: &mut Vec<SimEvent>) {
    let mut due = Vec::new();
    for (entity, countdown) in world.query_mut::<&mut SelfDestructCountdown>() {
        if !countdown.is_armed() {
            continue;
        }
        countdown.remaining -= DT;
        if countdown.remaining <= 0.0 {
            due.push(entity);
        }
    }
    for entity in due {
        detonate(world, entity, events);
    }
}

/// Damage every living object inside the blast radius with linear falloff,
/// then mark the source dead. Returns how many objects were hit, or `None`
/// if the source cannot explode (missing data or already dead).
pub fn detonate(world: &mut World, source: Entity, events: &mut Vec<SimEvent>) -> Option<u32> {
    if !world.get::<&Health>(source).ok()?.is_alive() {
        return None;
    }
    let center = world.get::<&Position>(source).ok()?.ground();
    let blast = *world.get::<&ExplosionData>(source).ok()?;

    let mut hits = 0;
    for (entity, (pos, health, footprint)) in
        world.query_mut::<(&Position, &mut Health, Option<&Footprint>)>()
    {
        if entity == source || !health.is_alive() {
            continue;
        }
        let distance = match footprint {
            Some(f) => distance_to_box(center, pos.ground(), f.half_extents),
            None => pos.ground().distance(center),
        };
        let damage = falloff_damage(blast.damage, blast.radius, distance);
        if damage > 0.0 {
            health.current -= damage;
            hits += 1;
        }
    }

    if let Ok(mut health) = world.get::<&mut Health>(source) {
        health.current = 0.0;
    }
    if let Ok(mut countdown) = world.get::<&mut SelfDestructCountdown>(source) {
        countdown.remaining = -1.0;
    }
    if let Ok(net_id) = world.get::<&NetId>(source) {
        debug!(source = net_id.0, hits, "detonated");
        events.push(SimEvent::Detonated {
            source: *net_id,
            hits,
        });
    }
    Some(hits)
}

/// Full damage at the centre, falling linearly to zero at the radius.
pub fn falloff_damage(damage: f32, radius: f32, distance: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    damage * (1.0 - distance / radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff_is_linear_and_zero_at_edge() {
        assert_eq!(falloff_damage(100.0, 10.0, 0.0), 100.0);
        assert!((falloff_damage(100.0, 10.0, 5.0) - 50.0).abs() < 1e-4);
        assert_eq!(falloff_damage(100.0, 10.0, 10.0), 0.0);
        assert_eq!(falloff_damage(100.0, 10.0, 12.0), 0.0);
        assert_eq!(falloff_damage(100.0, 0.0, 0.0), 0.0);
    }
}
