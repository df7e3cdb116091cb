//! Per-(node, period) state records and the run history that owns them.
//!
//! A full run allocates `num_periods + extra_periods` [`NodeState`] records
//! per node up front. Each record is written during its own period's passes,
//! partially copied forward to seed the next period, and never mutated
//! again — the history is an append-only time series.
//!
//! Per-neighbor quantities are stored in slot vectors parallel to the
//! node's [`NeighborIndex`]: the external sentinel first, then real
//! neighbors ascending by `NodeId`. Slot order is fixed at run start, which
//! is what makes the shipment-allocation loop deterministic.

use crate::id::{Neighbor, NodeId, Period};
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Neighbor slot index
// ---------------------------------------------------------------------------

/// Sorted predecessor/successor slot lists for one node, fixed at run
/// start. Slot `i` of every per-neighbor vector in [`NodeState`] refers to
/// `preds[i]` / `succs[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeighborIndex {
    pub preds: Vec<Neighbor>,
    pub succs: Vec<Neighbor>,
}

impl NeighborIndex {
    /// Slot of a predecessor neighbor. Lists are sorted, so binary search.
    pub fn pred_slot(&self, n: Neighbor) -> Option<usize> {
        self.preds.binary_search(&n).ok()
    }

    /// Slot of a successor neighbor.
    pub fn succ_slot(&self, n: Neighbor) -> Option<usize> {
        self.succs.binary_search(&n).ok()
    }
}

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// All time-indexed quantities for one node in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    /// Finished-goods position: on-hand minus total unmet demand. Negative
    /// means the node is in an aggregate backorder position.
    pub inventory_level: f64,

    /// Quantity owed to each successor, per slot. Non-negative.
    pub backorders_by_successor: Vec<f64>,
    /// Quantity withheld from each successor because of that successor's
    /// shipment-pausing disruption. Not a backorder.
    pub disrupted_items_by_successor: Vec<f64>,
    /// Quantity ordered from each predecessor but not yet received.
    pub on_order_by_predecessor: Vec<f64>,
    /// Received-but-unprocessed quantity from each predecessor.
    pub raw_material_inventory: Vec<f64>,

    /// In-flight shipments from each predecessor, indexed by periods until
    /// arrival. Slot 0 arrives this period.
    pub inbound_shipment_pipeline: Vec<VecDeque<f64>>,
    /// In-flight orders from each successor, indexed by periods until the
    /// order is seen. Slot 0 is seen this period.
    pub inbound_order_pipeline: Vec<VecDeque<f64>>,

    /// Realized receipt from each predecessor this period.
    pub inbound_shipment: Vec<f64>,
    /// Realized order from each successor this period.
    pub inbound_order: Vec<f64>,
    /// Realized shipment to each successor this period.
    pub outbound_shipment: Vec<f64>,
    /// Order placed with each predecessor this period.
    pub order_quantity: Vec<f64>,

    /// Cumulative demand received through this period.
    pub demand_cumul: f64,
    /// Cumulative demand satisfied directly from stock on arrival.
    pub demand_met_from_stock_cumul: f64,
    /// `demand_met_from_stock_cumul / demand_cumul`; 1.0 before any demand.
    pub fill_rate: f64,

    pub holding_cost_incurred: f64,
    pub stockout_cost_incurred: f64,
    pub in_transit_holding_cost_incurred: f64,
    pub revenue_earned: f64,
    pub total_cost_incurred: f64,

    /// Realized disruption status for this period.
    pub disrupted: bool,
}

impl NodeState {
    /// Fresh all-zero state sized for the given neighbor slots.
    ///
    /// `shipment_pipeline_len` applies to every predecessor pipeline;
    /// `order_pipeline_lens[i]` is the length for successor slot `i` (one
    /// slot per remaining lead-time period, plus the slot read this period).
    pub fn new(
        index: &NeighborIndex,
        initial_inventory: f64,
        shipment_pipeline_len: usize,
        order_pipeline_lens: &[usize],
    ) -> Self {
        let np = index.preds.len();
        let ns = index.succs.len();
        Self {
            inventory_level: initial_inventory,
            backorders_by_successor: vec![0.0; ns],
            disrupted_items_by_successor: vec![0.0; ns],
            on_order_by_predecessor: vec![0.0; np],
            raw_material_inventory: vec![0.0; np],
            inbound_shipment_pipeline: vec![
                VecDeque::from(vec![0.0; shipment_pipeline_len]);
                np
            ],
            inbound_order_pipeline: order_pipeline_lens
                .iter()
                .map(|&len| VecDeque::from(vec![0.0; len]))
                .collect(),
            inbound_shipment: vec![0.0; np],
            inbound_order: vec![0.0; ns],
            outbound_shipment: vec![0.0; ns],
            order_quantity: vec![0.0; np],
            demand_cumul: 0.0,
            demand_met_from_stock_cumul: 0.0,
            fill_rate: 1.0,
            holding_cost_incurred: 0.0,
            stockout_cost_incurred: 0.0,
            in_transit_holding_cost_incurred: 0.0,
            revenue_earned: 0.0,
            total_cost_incurred: 0.0,
            disrupted: false,
        }
    }

    /// On-hand finished goods.
    pub fn on_hand(&self) -> f64 {
        self.inventory_level.max(0.0)
    }

    /// Total quantity owed across all successors.
    pub fn backorder_total(&self) -> f64 {
        self.backorders_by_successor.iter().sum()
    }

    /// Total quantity withheld across all successors.
    pub fn disrupted_items_total(&self) -> f64 {
        self.disrupted_items_by_successor.iter().sum()
    }

    /// The inventory-position signal fed to the inventory policy for one
    /// predecessor slot. Backorders need no explicit term because
    /// `inventory_level` is already net of them.
    pub fn inventory_position(&self, pred_slot: usize) -> f64 {
        self.inventory_level
            + self.on_order_by_predecessor[pred_slot]
            + self.raw_material_inventory[pred_slot]
    }

    /// Seed the next period's state from this one: carry forward the
    /// running quantities and shift the pipelines by one slot.
    ///
    /// `freeze_transit` is set when the node is under a transit-pausing
    /// disruption: the inbound-shipment pipelines are copied unshifted so
    /// goods stay stuck in transit. Order pipelines always shift.
    ///
    /// A receipt-pausing period leaves the undelivered quantity in shipment
    /// slot 0; the shift folds it into the new slot 0 so it is offered for
    /// receipt again next period.
    pub fn advanced(&self, freeze_transit: bool) -> Self {
        let mut next = self.clone();

        for pipeline in &mut next.inbound_shipment_pipeline {
            if !freeze_transit {
                shift_pipeline(pipeline);
            }
        }
        for pipeline in &mut next.inbound_order_pipeline {
            shift_pipeline(pipeline);
        }

        // Realized per-period values start fresh.
        next.inbound_shipment.iter_mut().for_each(|v| *v = 0.0);
        next.inbound_order.iter_mut().for_each(|v| *v = 0.0);
        next.outbound_shipment.iter_mut().for_each(|v| *v = 0.0);
        next.order_quantity.iter_mut().for_each(|v| *v = 0.0);
        next.holding_cost_incurred = 0.0;
        next.stockout_cost_incurred = 0.0;
        next.in_transit_holding_cost_incurred = 0.0;
        next.revenue_earned = 0.0;
        next.total_cost_incurred = 0.0;
        next.disrupted = false;

        next
    }
}

/// Shift one slot toward arrival: pop the front, append a zero, and fold
/// any unreceived front quantity back into the new slot 0.
fn shift_pipeline(pipeline: &mut VecDeque<f64>) {
    let leftover = pipeline.pop_front().unwrap_or(0.0);
    pipeline.push_back(0.0);
    if leftover != 0.0 {
        if let Some(front) = pipeline.front_mut() {
            *front += leftover;
        }
    }
}

// ---------------------------------------------------------------------------
// StateHistory
// ---------------------------------------------------------------------------

/// The full per-node, per-period state series for one run. Owned by the run
/// and returned with the results; re-running allocates a fresh history, so
/// state never leaks between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateHistory {
    index: SecondaryMap<NodeId, NeighborIndex>,
    states: SecondaryMap<NodeId, Vec<NodeState>>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node with its neighbor slots and preallocated state
    /// series (period 0 seeded, later periods filled as the run advances).
    pub(crate) fn insert_node(&mut self, id: NodeId, index: NeighborIndex, states: Vec<NodeState>) {
        self.index.insert(id, index);
        self.states.insert(id, states);
    }

    /// Neighbor slot mapping for a node.
    pub fn neighbor_index(&self, id: NodeId) -> &NeighborIndex {
        &self.index[id]
    }

    /// Full state series for a node.
    pub fn node_states(&self, id: NodeId) -> &[NodeState] {
        &self.states[id]
    }

    /// One node's state in one period.
    pub fn state(&self, id: NodeId, t: Period) -> &NodeState {
        &self.states[id][t]
    }

    pub(crate) fn state_mut(&mut self, id: NodeId, t: Period) -> &mut NodeState {
        &mut self.states[id][t]
    }

    /// Number of simulated periods (including trailing extra periods).
    pub fn period_count(&self, id: NodeId) -> usize {
        self.states[id].len()
    }

    // -----------------------------------------------------------------------
    // Per-neighbor convenience queries
    // -----------------------------------------------------------------------

    /// Backorders owed to one successor in one period.
    pub fn backorders_for(&self, id: NodeId, succ: Neighbor, t: Period) -> f64 {
        match self.index[id].succ_slot(succ) {
            Some(slot) => self.states[id][t].backorders_by_successor[slot],
            None => 0.0,
        }
    }

    /// Disrupted items withheld from one successor in one period.
    pub fn disrupted_items_for(&self, id: NodeId, succ: Neighbor, t: Period) -> f64 {
        match self.index[id].succ_slot(succ) {
            Some(slot) => self.states[id][t].disrupted_items_by_successor[slot],
            None => 0.0,
        }
    }

    /// Order placed with one predecessor in one period.
    pub fn order_quantity_for(&self, id: NodeId, pred: Neighbor, t: Period) -> f64 {
        match self.index[id].pred_slot(pred) {
            Some(slot) => self.states[id][t].order_quantity[slot],
            None => 0.0,
        }
    }

    /// Shipment sent to one successor in one period.
    pub fn outbound_shipment_for(&self, id: NodeId, succ: Neighbor, t: Period) -> f64 {
        match self.index[id].succ_slot(succ) {
            Some(slot) => self.states[id][t].outbound_shipment[slot],
            None => 0.0,
        }
    }

    /// Total realized receipt in one period.
    pub fn inbound_shipment_total(&self, id: NodeId, t: Period) -> f64 {
        self.states[id][t].inbound_shipment.iter().sum()
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Deterministic hash of the entire history, for replay comparison.
    pub fn state_hash(&self) -> u64 {
        let mut ids: Vec<NodeId> = self.states.keys().collect();
        ids.sort();

        let mut hash = StateHash::new();
        for id in ids {
            for state in &self.states[id] {
                state.hash_into(&mut hash);
            }
        }
        hash.finish()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for replay comparison.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed an f64 into the hash (via its bit pattern).
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeState {
    /// Feed every field into the hash in a fixed order.
    fn hash_into(&self, h: &mut StateHash) {
        h.write_f64(self.inventory_level);
        for &v in &self.backorders_by_successor {
            h.write_f64(v);
        }
        for &v in &self.disrupted_items_by_successor {
            h.write_f64(v);
        }
        for &v in &self.on_order_by_predecessor {
            h.write_f64(v);
        }
        for &v in &self.raw_material_inventory {
            h.write_f64(v);
        }
        for pipeline in &self.inbound_shipment_pipeline {
            for &v in pipeline {
                h.write_f64(v);
            }
        }
        for pipeline in &self.inbound_order_pipeline {
            for &v in pipeline {
                h.write_f64(v);
            }
        }
        for &v in &self.inbound_shipment {
            h.write_f64(v);
        }
        for &v in &self.inbound_order {
            h.write_f64(v);
        }
        for &v in &self.outbound_shipment {
            h.write_f64(v);
        }
        for &v in &self.order_quantity {
            h.write_f64(v);
        }
        h.write_f64(self.demand_cumul);
        h.write_f64(self.demand_met_from_stock_cumul);
        h.write_f64(self.fill_rate);
        h.write_f64(self.holding_cost_incurred);
        h.write_f64(self.stockout_cost_incurred);
        h.write_f64(self.in_transit_holding_cost_incurred);
        h.write_f64(self.revenue_earned);
        h.write_f64(self.total_cost_incurred);
        h.write(&[self.disrupted as u8]);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two_index() -> NeighborIndex {
        // Slot vectors are keyed by sorted neighbor order; the tests only
        // need the lengths, so the sentinel stands in for both sides.
        NeighborIndex {
            preds: vec![Neighbor::External],
            succs: vec![Neighbor::External],
        }
    }

    #[test]
    fn new_state_is_sized_and_zeroed() {
        let index = two_by_two_index();
        let state = NodeState::new(&index, 5.0, 3, &[1]);
        assert_eq!(state.inventory_level, 5.0);
        assert_eq!(state.backorders_by_successor, vec![0.0]);
        assert_eq!(state.inbound_shipment_pipeline[0].len(), 3);
        assert_eq!(state.inbound_order_pipeline[0].len(), 1);
        assert_eq!(state.fill_rate, 1.0);
    }

    #[test]
    fn inventory_position_sums_components() {
        let index = two_by_two_index();
        let mut state = NodeState::new(&index, -2.0, 3, &[1]);
        state.on_order_by_predecessor[0] = 4.0;
        state.raw_material_inventory[0] = 1.0;
        assert_eq!(state.inventory_position(0), 3.0);
    }

    #[test]
    fn advanced_shifts_pipelines() {
        let index = two_by_two_index();
        let mut state = NodeState::new(&index, 0.0, 3, &[2]);
        state.inbound_shipment_pipeline[0][1] = 7.0;
        state.inbound_order_pipeline[0][1] = 2.0;

        let next = state.advanced(false);
        assert_eq!(next.inbound_shipment_pipeline[0][0], 7.0);
        assert_eq!(next.inbound_shipment_pipeline[0][2], 0.0);
        assert_eq!(next.inbound_order_pipeline[0][0], 2.0);
        // Length is preserved.
        assert_eq!(next.inbound_shipment_pipeline[0].len(), 3);
    }

    #[test]
    fn advanced_freeze_keeps_shipments_in_place() {
        let index = two_by_two_index();
        let mut state = NodeState::new(&index, 0.0, 3, &[2]);
        state.inbound_shipment_pipeline[0][1] = 7.0;
        state.inbound_order_pipeline[0][1] = 2.0;

        let next = state.advanced(true);
        // Shipment pipeline frozen in place.
        assert_eq!(next.inbound_shipment_pipeline[0][1], 7.0);
        assert_eq!(next.inbound_shipment_pipeline[0][0], 0.0);
        // Order pipeline still shifts.
        assert_eq!(next.inbound_order_pipeline[0][0], 2.0);
    }

    #[test]
    fn advanced_folds_unreceived_front_forward() {
        // A receipt-pausing period leaves quantity in slot 0; the shift
        // must keep it at slot 0 next period, not drop it.
        let index = two_by_two_index();
        let mut state = NodeState::new(&index, 0.0, 3, &[1]);
        state.inbound_shipment_pipeline[0][0] = 4.0;
        state.inbound_shipment_pipeline[0][1] = 6.0;

        let next = state.advanced(false);
        assert_eq!(next.inbound_shipment_pipeline[0][0], 10.0);
    }

    #[test]
    fn advanced_carries_running_quantities_and_clears_realized() {
        let index = two_by_two_index();
        let mut state = NodeState::new(&index, 3.0, 2, &[1]);
        state.backorders_by_successor[0] = 1.5;
        state.on_order_by_predecessor[0] = 2.5;
        state.demand_cumul = 30.0;
        state.inbound_shipment[0] = 9.0;
        state.total_cost_incurred = 4.0;
        state.disrupted = true;

        let next = state.advanced(false);
        assert_eq!(next.inventory_level, 3.0);
        assert_eq!(next.backorders_by_successor[0], 1.5);
        assert_eq!(next.on_order_by_predecessor[0], 2.5);
        assert_eq!(next.demand_cumul, 30.0);
        assert_eq!(next.inbound_shipment[0], 0.0);
        assert_eq!(next.total_cost_incurred, 0.0);
        assert!(!next.disrupted);
    }

    #[test]
    fn state_hash_detects_field_change() {
        let index = two_by_two_index();
        let a = NodeState::new(&index, 0.0, 2, &[1]);
        let mut b = a.clone();

        let mut ha = StateHash::new();
        a.hash_into(&mut ha);
        let mut hb = StateHash::new();
        b.hash_into(&mut hb);
        assert_eq!(ha.finish(), hb.finish());

        b.inventory_level = 0.1;
        let mut hb = StateHash::new();
        b.hash_into(&mut hb);
        assert_ne!(ha.finish(), hb.finish());
    }

    #[test]
    fn neighbor_index_slot_lookup() {
        let index = NeighborIndex {
            preds: vec![Neighbor::External],
            succs: vec![Neighbor::External],
        };
        assert_eq!(index.pred_slot(Neighbor::External), Some(0));
        assert_eq!(index.succ_slot(Neighbor::External), Some(0));
    }
}
