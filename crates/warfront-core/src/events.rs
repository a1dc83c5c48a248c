//! Messages emitted by the simulation: per-client notifications and
//! match-wide events.

use serde::{Deserialize, Serialize};

use crate::types::{ClientId, NetId};

/// Business-rule rejection reported to the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    InsufficientFunds,
    InvalidPlacement,
    ProductionQueueFull,
    PopulationLimitReached,
}

/// A notification routed to exactly one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientNotification {
    pub client: ClientId,
    pub notification: Notification,
}

/// Things that happened during a tick, for logs and client feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// The wave orchestrator entered a new phase.
    PhaseChanged { phase: usize, name: String },
    /// A facility finished producing a unit.
    UnitProduced { facility: NetId, unit: NetId },
    /// A structure finished construction.
    StructureCompleted { structure: NetId },
    /// An explosive object detonated.
    Detonated { source: NetId, hits: u32 },
    /// An object was removed by the death pass.
    Destroyed { object: NetId },
}
