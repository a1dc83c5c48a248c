//! Facility production timers.
//!
//! Cost and population were reserved when the request was accepted, so a
//! finished timer only has to spawn the unit. Spawns go through a command
//! buffer because the facilities are being iterated.

use glam::Vec3;
use hecs::{CommandBuffer, World};
use tracing::debug;

use warfront_core::components::{Footprint, Owner, ProductionQueue};
use warfront_core::constants::{DT, SPAWN_CLEARANCE};
use warfront_core::events::SimEvent;
use warfront_core::settings::SimSettings;
use warfront_core::types::{NetId, Position};

use crate::net_ids::NetIdAllocator;
use crate::world_setup;

pub fn run(
    world: &mut World,
    settings: &SimSettings,
    net_ids: &mut NetIdAllocator,
    cmd: &mut CommandBuffer,
    events: &mut Vec<SimEvent>,
) {
    for (_entity, (queue, pos, owner, footprint, facility_id)) in world.query_mut::<(
        &mut ProductionQueue,
        &Position,
        &Owner,
        Option<&Footprint>,
        &NetId,
    )>() {
        if !queue.active {
            continue;
        }
        queue.progress += DT;
        if queue.progress < queue.duration {
            continue;
        }
        let template = queue.producing;
        *queue = ProductionQueue::default();

        let radius = settings
            .units
            .get(template)
            .map_or(0.0, |t| t.obstacle_radius);
        let half_x = footprint.map_or(0.0, |f| f.half_extents.x);
        let spawn = pos.0 + Vec3::new(half_x + radius + SPAWN_CLEARANCE, 0.0, 0.0);

        let unit_id = net_ids.allocate();
        if let Some(mut builder) = world_setup::unit_builder(settings, template, unit_id, owner.0, spawn) {
            cmd.spawn(builder.build());
            debug!(facility = facility_id.0, unit = unit_id.0, template, "unit produced");
            events.push(SimEvent::UnitProduced {
                facility: *facility_id,
                unit: unit_id,
            });
        }
    }
}
