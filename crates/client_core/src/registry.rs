use std::collections::{HashMap, HashSet};

use shared::domain::{AgentId, AgentRecord};
use tracing::{debug, warn};

/// Canonical agent set, replaced wholesale by every snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AgentRegistry {
    active: Vec<AgentRecord>,
    retired: Vec<AgentRecord>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub active: usize,
    pub retired: usize,
    pub added: usize,
    pub dropped: usize,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry with `agents`.
    ///
    /// Agents missing from the snapshot are dropped. Snapshot order is kept
    /// within each partition; a repeated id keeps its first slot and its last
    /// contents. An agent already retired stays retired.
    pub fn apply_snapshot(&mut self, agents: Vec<AgentRecord>) -> ReconcileSummary {
        let previously_retired: HashSet<&AgentId> = self.retired.iter().map(|a| &a.id).collect();

        let mut ordered: Vec<AgentRecord> = Vec::with_capacity(agents.len());
        let mut slots: HashMap<AgentId, usize> = HashMap::with_capacity(agents.len());
        for mut agent in agents {
            if agent.active && previously_retired.contains(&agent.id) {
                warn!(
                    agent_id = agent.id.short(),
                    "snapshot reactivates a retired agent; keeping it retired"
                );
                agent.active = false;
            }
            match slots.get(&agent.id) {
                Some(&slot) => {
                    warn!(agent_id = agent.id.short(), "duplicate agent id in snapshot");
                    ordered[slot] = agent;
                }
                None => {
                    slots.insert(agent.id.clone(), ordered.len());
                    ordered.push(agent);
                }
            }
        }

        let previous: HashSet<&AgentId> = self.iter().map(|a| &a.id).collect();
        let added = ordered.iter().filter(|a| !previous.contains(&a.id)).count();
        let dropped = previous.iter().filter(|id| !slots.contains_key(**id)).count();

        let (active, retired): (Vec<_>, Vec<_>) = ordered.into_iter().partition(|a| a.active);
        self.active = active;
        self.retired = retired;

        let summary = ReconcileSummary {
            active: self.active.len(),
            retired: self.retired.len(),
            added,
            dropped,
        };
        debug!(
            active = summary.active,
            retired = summary.retired,
            added = summary.added,
            dropped = summary.dropped,
            "registry reconciled"
        );
        summary
    }

    pub fn active(&self) -> &[AgentRecord] {
        &self.active
    }

    pub fn retired(&self) -> &[AgentRecord] {
        &self.retired
    }

    /// Active agents first, then retired ones.
    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.active.iter().chain(self.retired.iter())
    }

    pub fn get(&self, id: &AgentId) -> Option<&AgentRecord> {
        self.iter().find(|agent| &agent.id == id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.retired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
