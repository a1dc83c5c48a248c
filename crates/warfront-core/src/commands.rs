//! Remote requests sent by clients to the authoritative simulation.
//!
//! Requests are queued and validated at the next tick boundary. Every object
//! reference is a `NetId`; local handles never cross the network.

use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::types::{ClientId, NetId};

/// All possible remote requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RequestCommand {
    /// Walk a unit to a point.
    Move { unit: NetId, target: Vec3 },
    /// Pin a unit on a hostile target.
    Attack {
        unit: NetId,
        target: NetId,
        target_position: Vec3,
    },
    /// Start a worker harvesting a resource node.
    Gather {
        worker: NetId,
        node: NetId,
        return_point: NetId,
    },
    /// Send a loaded worker to drop off at a resource center.
    ReturnResource { worker: NetId, center: NetId },
    /// Queue a unit at a production facility.
    ProduceUnit { facility: NetId, catalog_index: usize },
    /// Detonate (or arm the fuse of) an explosive object.
    SelfDestruct { target: NetId },
    /// Place a structure on the build grid and assign a builder.
    Build {
        structure_index: usize,
        grid_position: IVec2,
        builder: NetId,
    },
}

/// A request together with the connection that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub client: ClientId,
    pub command: RequestCommand,
}

impl RemoteRequest {
    pub fn new(client: ClientId, command: RequestCommand) -> Self {
        Self { client, command }
    }
}
