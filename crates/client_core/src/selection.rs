use shared::domain::AgentId;

/// At most one selected agent; selecting it again clears the selection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    selected: Option<AgentId>,
}

impl Selection {
    pub fn toggle(&mut self, id: &AgentId) -> Option<&AgentId> {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        } else {
            self.selected = Some(id.clone());
        }
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&AgentId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &AgentId) -> bool {
        self.selected.as_ref() == Some(id)
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
