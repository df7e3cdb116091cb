//! The supply network: a DAG of stages connected by supply/demand edges.
//!
//! Nodes live in a `SlotMap`; adjacency is stored in a `SecondaryMap` keyed
//! by `NodeId`, which guarantees key synchronization with the primary node
//! map. Edges point from predecessor (supplier) to successor (customer).

use crate::id::{Neighbor, NodeId};
use crate::node::SupplyNode;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during network construction or validation.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("cycle detected in supply network")]
    CycleDetected,
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("duplicate edge: {0:?} -> {1:?}")]
    DuplicateEdge(NodeId, NodeId),
}

// ---------------------------------------------------------------------------
// Adjacency
// ---------------------------------------------------------------------------

/// Adjacency lists for a single node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NodeAdjacency {
    /// Nodes this node orders from.
    preds: Vec<NodeId>,
    /// Nodes this node ships to.
    succs: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// SupplyNetwork
// ---------------------------------------------------------------------------

/// The supply network: stages and directed predecessor → successor edges.
///
/// Must be acyclic; [`SupplyNetwork::validate_acyclic`] is called by the
/// engine before any period executes, so a cyclic network fails immediately
/// with no partial results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplyNetwork {
    nodes: SlotMap<NodeId, SupplyNode>,
    adjacency: SecondaryMap<NodeId, NodeAdjacency>,
}

impl SupplyNetwork {
    /// Create a new, empty network.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Add a stage. Returns the assigned `NodeId`.
    pub fn add_node(&mut self, node: SupplyNode) -> NodeId {
        let id = self.nodes.insert(node);
        self.adjacency.insert(id, NodeAdjacency::default());
        id
    }

    /// Connect `pred -> succ` (goods flow `pred` to `succ`, orders the
    /// reverse). Errors if either node is missing or the edge exists.
    pub fn connect(&mut self, pred: NodeId, succ: NodeId) -> Result<(), NetworkError> {
        if !self.nodes.contains_key(pred) {
            return Err(NetworkError::NodeNotFound(pred));
        }
        if !self.nodes.contains_key(succ) {
            return Err(NetworkError::NodeNotFound(succ));
        }
        // Adjacency entries exist for every inserted node.
        if self.adjacency[pred].succs.contains(&succ) {
            return Err(NetworkError::DuplicateEdge(pred, succ));
        }
        self.adjacency[pred].succs.push(succ);
        self.adjacency[succ].preds.push(pred);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get a node's configuration.
    pub fn node(&self, id: NodeId) -> Option<&SupplyNode> {
        self.nodes.get(id)
    }

    /// Get a node's configuration mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SupplyNode> {
        self.nodes.get_mut(id)
    }

    /// Iterate over all node IDs and their configuration.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SupplyNode)> {
        self.nodes.iter()
    }

    /// All node IDs in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().collect();
        ids.sort();
        ids
    }

    /// Total number of stages.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// The node's successors, sorted (external sentinel first when
    /// `include_external` and the node faces an external customer, then
    /// real nodes ascending).
    pub fn successors(&self, id: NodeId, include_external: bool) -> Vec<Neighbor> {
        let mut out: Vec<Neighbor> = self
            .adjacency
            .get(id)
            .map(|adj| adj.succs.iter().map(|&n| Neighbor::Node(n)).collect())
            .unwrap_or_default();
        if include_external
            && self
                .nodes
                .get(id)
                .is_some_and(|n| n.has_external_customer())
        {
            out.push(Neighbor::External);
        }
        out.sort();
        out
    }

    /// The node's predecessors, sorted (external sentinel first when
    /// `include_external` and the node has an outside supplier, then real
    /// nodes ascending).
    pub fn predecessors(&self, id: NodeId, include_external: bool) -> Vec<Neighbor> {
        let mut out: Vec<Neighbor> = self
            .adjacency
            .get(id)
            .map(|adj| adj.preds.iter().map(|&n| Neighbor::Node(n)).collect())
            .unwrap_or_default();
        if include_external
            && self
                .nodes
                .get(id)
                .is_some_and(|n| n.has_external_supplier())
        {
            out.push(Neighbor::External);
        }
        out.sort();
        out
    }

    /// Nodes with no graph predecessors (they may still have an outside
    /// supplier), sorted by `NodeId`.
    pub fn source_nodes(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|&id| self.adjacency[id].preds.is_empty())
            .collect();
        out.sort();
        out
    }

    // -----------------------------------------------------------------------
    // Cycle check (Kahn's algorithm)
    // -----------------------------------------------------------------------

    /// Reject the network if it contains a directed cycle.
    ///
    /// Runs Kahn's algorithm; if any node remains unprocessed it sits on a
    /// cycle and the network is invalid.
    pub fn validate_acyclic(&self) -> Result<(), NetworkError> {
        let mut in_degree: SecondaryMap<NodeId, usize> = SecondaryMap::new();
        for (id, _) in &self.nodes {
            in_degree.insert(id, self.adjacency[id].preds.len());
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for (id, &deg) in &in_degree {
            if deg == 0 {
                queue.push_back(id);
            }
        }

        let mut processed = 0usize;
        while let Some(id) = queue.pop_front() {
            processed += 1;
            for &succ in &self.adjacency[id].succs {
                let deg = &mut in_degree[succ];
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if processed < self.nodes.len() {
            Err(NetworkError::CycleDetected)
        } else {
            Ok(())
        }
    }
}

// Nodes reached through traversal orders are structurally valid, so the
// engine indexes directly instead of unwrapping `Option`s.
impl Index<NodeId> for SupplyNetwork {
    type Output = SupplyNode;

    fn index(&self, id: NodeId) -> &SupplyNode {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for SupplyNetwork {
    fn index_mut(&mut self, id: NodeId) -> &mut SupplyNode {
        &mut self.nodes[id]
    }
}

// ===========================================================================
// Tests
// ===========================================================================
