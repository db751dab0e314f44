//! Deterministic, identity-derived agent placement.
//!
//! An agent's coordinate is its zone anchor plus an offset taken from its
//! identity alone, so re-computing it never moves the agent and adding or
//! removing other agents has no effect on it.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use shared::domain::{AgentId, AgentRecord};

use crate::zones::Zone;

/// Height above the zone plane at which agents hover.
pub const AGENT_HEIGHT: f64 = 0.5;
/// Width of the square each zone scatters its agents across.
pub const ZONE_SPREAD: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub zone: Zone,
    pub position: Position,
}

/// Retired agents rest at Omega Gate whatever their last status was.
pub fn zone_for(agent: &AgentRecord) -> Zone {
    if agent.active {
        Zone::classify(agent.status.as_deref())
    } else {
        Zone::OmegaGate
    }
}

pub fn place(agent: &AgentRecord) -> Placement {
    let zone = zone_for(agent);
    Placement {
        zone,
        position: position_in(zone, &agent.id),
    }
}

pub fn position_in(zone: Zone, id: &AgentId) -> Position {
    let anchor = zone.anchor();
    let (offset_x, offset_z) = identity_offset(id);
    Position::new(anchor.x + offset_x, AGENT_HEIGHT, anchor.z + offset_z)
}

/// Offsets in `[-ZONE_SPREAD / 2, ZONE_SPREAD / 2]` for the X and Z axes.
pub fn identity_offset(id: &AgentId) -> (f64, f64) {
    let (x, z) = hex_slices(id.as_str()).unwrap_or_else(|| digest_slices(id.as_str()));
    (scale(x), scale(z))
}

// Container ids are hex; read the first two 16-bit slices directly.
fn hex_slices(id: &str) -> Option<(u16, u16)> {
    let prefix = id.as_bytes().get(..8)?;
    if !prefix.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let x = u16::from_str_radix(&id[..4], 16).ok()?;
    let z = u16::from_str_radix(&id[4..8], 16).ok()?;
    Some((x, z))
}

// Anything else (short, non-hex, non-ASCII) is re-hashed so it still gets a
// stable offset.
fn digest_slices(id: &str) -> (u16, u16) {
    let digest = Sha256::digest(id.as_bytes());
    (
        u16::from_be_bytes([digest[0], digest[1]]),
        u16::from_be_bytes([digest[2], digest[3]]),
    )
}

fn scale(value: u16) -> f64 {
    (f64::from(value) / f64::from(u16::MAX) - 0.5) * ZONE_SPREAD
}

/// Placements keyed by identity, refreshed on each reconciliation.
///
/// An entry is only recomputed when its agent changes zone; entries for
/// agents that leave the registry are dropped.
#[derive(Debug, Default, Clone)]
pub struct PlacementCache {
    entries: HashMap<AgentId, Placement>,
}

impl PlacementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cache in line with `agents`, returning how many entries were
    /// (re)computed.
    pub fn sync<'a>(&mut self, agents: impl IntoIterator<Item = &'a AgentRecord>) -> usize {
        let mut previous = std::mem::take(&mut self.entries);
        let mut computed = 0;
        for agent in agents {
            let zone = zone_for(agent);
            let placement = match previous.remove(&agent.id) {
                Some(cached) if cached.zone == zone => cached,
                _ => {
                    computed += 1;
                    Placement {
                        zone,
                        position: position_in(zone, &agent.id),
                    }
                }
            };
            self.entries.insert(agent.id.clone(), placement);
        }
        computed
    }

    pub fn get(&self, id: &AgentId) -> Option<Placement> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/placement_tests.rs"]
mod tests;
