//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Movement state of a goal-driven agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePhase {
    /// No destination.
    #[default]
    Idle,
    /// Destination set, waiting for a corridor and straightened path.
    PathPending,
    /// Walking the waypoint list.
    Following,
    /// Final waypoint reached.
    Arrived,
}

/// Step of the worker harvest loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherPhase {
    /// Walking to the claimed resource node.
    #[default]
    ToNode,
    /// Standing at the node, filling the carry capacity.
    Harvesting,
    /// Walking back to the return point with a load.
    ToCenter,
}

/// Navigation profile requested from the corridor query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    #[default]
    Infantry,
    Vehicle,
}

/// Coarse classification of a networked object, used in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Unit,
    Structure,
    Hostile,
    ResourceNode,
}
