//! Scripted orders for headless matches, derived from a snapshot.

use std::collections::BTreeSet;

use warfront_core::commands::{RemoteRequest, RequestCommand};
use warfront_core::enums::ObjectKind;
use warfront_core::settings::SimSettings;
use warfront_core::state::{GameStateSnapshot, ObjectView};
use warfront_core::types::{ClientId, NetId};

/// Send every idle worker of each client to the nearest free resource node,
/// returning to one of that client's resource centers.
///
/// A node takes one worker, so assignments are handed out client by client
/// in id order and each node is given away at most once.
pub fn gather_orders(snapshot: &GameStateSnapshot, settings: &SimSettings) -> Vec<RemoteRequest> {
    let worker_template = settings.start.worker;
    let nodes: Vec<&ObjectView> = snapshot
        .objects
        .iter()
        .filter(|o| o.kind == ObjectKind::ResourceNode && o.resources.unwrap_or(0) > 0)
        .collect();
    let mut taken: BTreeSet<NetId> = BTreeSet::new();
    let mut orders = Vec::new();

    for ledger in &snapshot.ledgers {
        let client = ledger.client;
        let Some(center) = resource_center(snapshot, settings, client) else {
            continue;
        };
        for worker in idle_workers(snapshot, client, worker_template) {
            let free = nodes
                .iter()
                .filter(|n| !taken.contains(&n.net_id))
                .min_by(|a, b| {
                    let da = a.position.distance_squared(worker.position);
                    let db = b.position.distance_squared(worker.position);
                    da.total_cmp(&db).then(a.net_id.cmp(&b.net_id))
                });
            let Some(node) = free else {
                return orders;
            };
            taken.insert(node.net_id);
            orders.push(RemoteRequest::new(
                client,
                RequestCommand::Gather {
                    worker: worker.net_id,
                    node: node.net_id,
                    return_point: center,
                },
            ));
        }
    }
    orders
}

fn idle_workers(
    snapshot: &GameStateSnapshot,
    client: ClientId,
    worker_template: usize,
) -> impl Iterator<Item = &ObjectView> {
    snapshot.objects.iter().filter(move |o| {
        o.kind == ObjectKind::Unit
            && o.owner == Some(client)
            && o.template == Some(worker_template)
            && o.resources.is_none()
    })
}

/// The client's completed resource center with the lowest id.
fn resource_center(snapshot: &GameStateSnapshot, settings: &SimSettings, client: ClientId) -> Option<NetId> {
    snapshot
        .objects
        .iter()
        .find(|o| {
            o.kind == ObjectKind::Structure
                && o.owner == Some(client)
                && o.construction.is_none()
                && o
                    .template
                    .and_then(|t| settings.structures.get(t))
                    .is_some_and(|t| t.resource_center)
        })
        .map(|o| o.net_id)
}
