//! Stable replication ids and their per-tick lookup table.

use std::collections::HashMap;

use hecs::{Entity, World};

use warfront_core::types::NetId;

/// Hands out `NetId`s. Ids are never reused within a match.
#[derive(Debug, Clone)]
pub struct NetIdAllocator {
    next: u32,
}

impl Default for NetIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl NetIdAllocator {
    pub fn allocate(&mut self) -> NetId {
        let id = NetId(self.next);
        self.next += 1;
        id
    }
}

/// `NetId -> Entity` lookup, rebuilt from the world at the start of every tick.
#[derive(Debug, Clone, Default)]
pub struct NetIdMap {
    map: HashMap<NetId, Entity>,
}

impl NetIdMap {
    pub fn rebuild(&mut self, world: &World) {
        self.map.clear();
        for (entity, net_id) in world.query::<&NetId>().iter() {
            self.map.insert(*net_id, entity);
        }
    }

    pub fn resolve(&self, id: NetId) -> Option<Entity> {
        self.map.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
