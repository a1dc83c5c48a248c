//! Structure construction.
//!
//! A site advances while at least one builder assigned to it stands within
//! reach. Health rises with progress. On completion the site becomes a full
//! structure and its housing is added to the owner's population cap.

use std::collections::BTreeSet;

use glam::Vec2;
use hecs::{CommandBuffer, Entity, World};
use tracing::info;

use warfront_core::components::*;
use warfront_core::constants::{CONSTRUCTION_START_HEALTH, DT};
use warfront_core::events::SimEvent;
use warfront_core::settings::SimSettings;
use warfront_core::types::{NetId, Position};

use crate::ledger::Ledger;

use super::{gap_to, halt};

pub fn run(
    world: &mut World,
    settings: &SimSettings,
    ledger: &mut Ledger,
    cmd: &mut CommandBuffer,
    events: &mut Vec<SimEvent>,
) {
    let builders: Vec<(Entity, Entity, Vec2, f32, f32)> = world
        .query::<(&Intent, &Position, &Agent, &WaypointState)>()
        .iter()
        .filter_map(|(entity, (intent, pos, agent, waypoint))| match intent {
            Intent::Build(site) => Some((
                entity,
                *site,
                pos.ground(),
                agent.obstacle_radius,
                waypoint.arrival_radius,
            )),
            _ => None,
        })
        .collect();

    let reach = settings.combat.interact_reach;
    let mut working: BTreeSet<Entity> = BTreeSet::new();
    for (builder, site, position, radius, slack) in &builders {
        if world.get::<&Construction>(*site).is_err() {
            // Site finished or destroyed.
            if let Ok(mut intent) = world.get::<&mut Intent>(*builder) {
                *intent = Intent::None;
            }
            continue;
        }
        if gap_to(world, *position, *radius, *site).map_or(false, |gap| gap <= reach + slack) {
            working.insert(*site);
            if let Ok((goal, waypoint)) =
                world.query_one_mut::<(&mut MovementGoal, &mut WaypointState)>(*builder)
            {
                halt(goal, waypoint);
            }
        }
    }

    for site in working {
        let Ok((construction, health, structure, owner, net_id)) = world.query_one_mut::<(
            &mut Construction,
            &mut Health,
            &Structure,
            &Owner,
            &NetId,
        )>(site) else {
            continue;
        };
        let step = if construction.duration > 0.0 {
            DT / construction.duration
        } else {
            1.0
        };
        construction.progress = (construction.progress + step).min(1.0);
        health.current = (health.current + health.max * (1.0 - CONSTRUCTION_START_HEALTH) * step).min(health.max);

        if construction.progress >= 1.0 {
            ledger.add_population_cap(owner.0, structure.housing);
            cmd.remove_one::<Construction>(site);
            info!(structure = net_id.0, template = structure.template, "construction complete");
            events.push(SimEvent::StructureCompleted {
                structure: *net_id,
            });
        }
    }
}
