//! Builds the replicated view of the world after a tick.

use hecs::World;

use warfront_core::components::*;
use warfront_core::enums::ObjectKind;
use warfront_core::events::{ClientNotification, SimEvent};
use warfront_core::state::{GameStateSnapshot, ObjectView, WaveView};
use warfront_core::types::{NetId, Position, SimTime, Team};

use crate::ledger::Ledger;

pub fn build_snapshot(
    world: &World,
    time: SimTime,
    wave: WaveView,
    ledger: &Ledger,
    notifications: Vec<ClientNotification>,
    events: Vec<SimEvent>,
) -> GameStateSnapshot {
    let mut objects = Vec::new();
    let mut query = world.query::<(
        &NetId,
        &Position,
        (Option<&Team>, Option<&Owner>, Option<&Health>),
        (Option<&Unit>, Option<&Structure>, Option<&Hostile>, Option<&ResourceNode>),
        (Option<&MovementGoal>, Option<&AggroTarget>),
        (
            Option<&ProductionQueue>,
            Option<&Construction>,
            Option<&GatheringState>,
            Option<&SelfDestructCountdown>,
        ),
    )>();
    for (_entity, (net_id, pos, (team, owner, health), kinds, (goal, aggro), progress)) in query.iter() {
        let (unit, structure, hostile, node) = kinds;
        let (kind, template) = if let Some(u) = unit {
            (ObjectKind::Unit, Some(u.template))
        } else if let Some(s) = structure {
            (ObjectKind::Structure, Some(s.template))
        } else if let Some(h) = hostile {
            (ObjectKind::Hostile, Some(h.template))
        } else if node.is_some() {
            (ObjectKind::ResourceNode, None)
        } else {
            continue;
        };
        let (queue, construction, gathering, countdown) = progress;

        objects.push(ObjectView {
            net_id: *net_id,
            kind,
            template,
            team: team.copied(),
            owner: owner.map(|o| o.0),
            position: pos.0,
            health: health.map(|h| h.current),
            max_health: health.map(|h| h.max),
            move_phase: goal.map(|g| g.phase),
            target: aggro.and_then(|a| world.get::<&NetId>(a.target).ok().map(|n| *n)),
            production: queue
                .filter(|q| q.active)
                .map(|q| if q.duration > 0.0 { (q.progress / q.duration).min(1.0) } else { 1.0 }),
            construction: construction.map(|c| c.progress),
            resources: gathering
                .map(|g| g.carried)
                .or_else(|| node.map(|n| n.remaining)),
            fuse_remaining: countdown.filter(|c| c.is_armed()).map(|c| c.remaining),
        });
    }
    objects.sort_unstable_by_key(|o| o.net_id);

    GameStateSnapshot {
        time,
        wave,
        objects,
        ledgers: ledger.views(),
        notifications,
        events,
    }
}
