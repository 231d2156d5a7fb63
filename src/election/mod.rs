use std::collections::BTreeSet;

/// A node is identified by its 16-bit radio source address (AT MY).
pub type NodeId = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// No round has finished yet, both LEDs stay off
    Undecided,
    Leader,
    Pleb,
}

/// The set of node IDs heard during the current election round. Every node
/// keeps its own roster and applies the same rule to it, so as long as the
/// rosters converge the decision does too.
#[derive(Debug, Default)]
pub struct Roster {
    ids: BTreeSet<NodeId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ID. Returns true if it was not already known.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.ids.insert(id)
    }

    /// Reset for a fresh round. Our own broadcast is not echoed back by the
    /// radio, so the local ID goes straight in.
    pub fn clear_round(&mut self, self_id: NodeId) {
        self.ids.clear();
        self.ids.insert(self_id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The winning ID: the highest one heard this round
    pub fn leader_id(&self) -> Option<NodeId> {
        self.ids.iter().next_back().copied()
    }

    pub fn decide_role(&self, self_id: NodeId) -> Role {
        match self.leader_id() {
            None => Role::Undecided,
            Some(winner) if winner == self_id => Role::Leader,
            Some(_) => Role::Pleb,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids.iter().copied()
    }
}
