use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node (stage) in the supply network.
    pub struct NodeId;
}

/// A simulated period index.
pub type Period = usize;

/// A neighbor of a node on the supply or demand side.
///
/// Per-successor and per-predecessor state (backorders, pipelines, on-order
/// quantities) is stored in slot vectors ordered by this type's `Ord`:
/// the external sentinel first, then real nodes ascending by `NodeId`. That
/// ordering is what makes shipment allocation deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Neighbor {
    /// The sentinel outside party: the end customer on the demand side,
    /// the outside supplier on the supply side.
    External,
    /// Another stage in the network.
    Node(NodeId),
}

impl Neighbor {
    /// Returns the inner `NodeId` for a real node, `None` for the sentinel.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Neighbor::External => None,
            Neighbor::Node(id) => Some(*id),
        }
    }

    /// Returns true if this is the external sentinel.
    pub fn is_external(&self) -> bool {
        matches!(self, Neighbor::External)
    }
}

impl From<NodeId> for Neighbor {
    fn from(id: NodeId) -> Self {
        Neighbor::Node(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn external_sorts_first() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = nodes.insert(());
        let b = nodes.insert(());

        let mut neighbors = vec![Neighbor::Node(b), Neighbor::Node(a), Neighbor::External];
        neighbors.sort();
        assert_eq!(neighbors[0], Neighbor::External);
        assert_eq!(neighbors[1], Neighbor::Node(a));
        assert_eq!(neighbors[2], Neighbor::Node(b));
    }

    #[test]
    fn node_id_round_trip() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = nodes.insert(());
        assert_eq!(Neighbor::from(a).node_id(), Some(a));
        assert_eq!(Neighbor::External.node_id(), None);
        assert!(Neighbor::External.is_external());
    }
}
