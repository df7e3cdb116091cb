//! The simulation engine: advances a supply network period by period.
//!
//! # Per-Period Pipeline
//!
//! Each simulated period runs five phases, in order:
//!
//! 1. **Disruption update** -- sample every node's disruption process and
//!    record the realized state for the period.
//! 2. **Order pass** -- realize external demand, receive inbound orders,
//!    compute order quantities via each node's policy, and post orders
//!    upstream. Runs in reverse traversal order so a node's successors have
//!    already posted their orders when the node computes its own.
//! 3. **Shipment pass** -- receive arriving shipments, convert raw material
//!    into finished goods, allocate outbound shipments in fixed successor
//!    order, and post shipments downstream. Runs source-to-sink.
//! 4. **Consistency check** -- cross-validate backorder bookkeeping
//!    (configurable response).
//! 5. **Advance & costing** -- shift pipelines, carry running quantities
//!    into the next period, and accrue holding/stockout/in-transit/revenue
//!    costs for the period.
//!
//! The traversal order is an explicit-stack depth-first walk from the
//! source nodes, computed once at run start (the graph is immutable during
//! the run) and reused every period. No recursion, no shared visitation
//! state.

use crate::disruption::DisruptionType;
use crate::id::{Neighbor, NodeId, Period};
use crate::network::{NetworkError, SupplyNetwork};
use crate::rng::SimRng;
use crate::state::{NeighborIndex, NodeState, StateHistory};
use serde::Serialize;
use slotmap::SecondaryMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Options & results
// ---------------------------------------------------------------------------

/// How to respond when the backorder consistency check fails.
///
/// The interacting demand/backorder/disrupted-item updates are easy to get
/// subtly wrong; the checker is a self-defense mechanism, not part of the
/// algorithm. The `*Dump` variants write a JSON snapshot of the instance
/// and state history to the given path for postmortem.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum ConsistencyChecks {
    /// Skip the check entirely.
    Ignore,
    /// Log a warning once per run and mark the results as suspect.
    #[default]
    Warn,
    /// Like `Warn`, plus a diagnostic dump on first violation.
    WarnAndDump(PathBuf),
    /// Halt the run with [`SimError::ConsistencyViolation`].
    Fail,
    /// Like `Fail`, plus a diagnostic dump before halting.
    FailAndDump(PathBuf),
}

/// Configuration for one simulation run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimOptions {
    /// Number of periods to simulate. Trailing extra periods (sized from
    /// the network's maximum lead times) are simulated on top, letting
    /// in-flight orders and shipments settle.
    pub num_periods: usize,
    /// Seed for the run's single PRNG. Identical configuration and seed
    /// replay bit-identically; repeated trials must take distinct seeds.
    pub seed: u64,
    pub consistency: ConsistencyChecks,
}

impl SimOptions {
    pub fn new(num_periods: usize, seed: u64) -> Self {
        Self {
            num_periods,
            seed,
            consistency: ConsistencyChecks::default(),
        }
    }
}

/// Output of a completed run.
#[derive(Debug)]
pub struct SimResults {
    /// Total cost summed over all nodes and all simulated periods.
    pub total_cost: f64,
    /// Full per-node, per-period state series.
    pub history: StateHistory,
    /// Trailing periods simulated beyond `num_periods`.
    pub extra_periods: usize,
    /// True if a consistency warning fired during the run.
    pub consistency_suspect: bool,
}

/// Errors that can occur during a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(
        "backorder bookkeeping inconsistent at node {node:?}, period {period}: \
         expected {expected}, found {actual}"
    )]
    ConsistencyViolation {
        node: NodeId,
        period: Period,
        expected: f64,
        actual: f64,
    },
    #[error("failed to write diagnostic dump: {0}")]
    DumpIo(#[from] std::io::Error),
    #[error("failed to encode diagnostic dump: {0}")]
    DumpEncode(#[from] serde_json::Error),
}

/// Absolute tolerance for the backorder consistency check, scaled up for
/// large magnitudes.
const CONSISTENCY_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Simulate `options.num_periods` (plus trailing extra periods) of the
/// given network and return the total cost and full state history.
///
/// The network is the run's single shared mutable resource: node disruption
/// processes advance in place (and are reset at start, so repeated runs
/// never leak chain state). A cyclic network is rejected before any period
/// executes.
pub fn simulate(
    network: &mut SupplyNetwork,
    options: &SimOptions,
) -> Result<SimResults, SimError> {
    network.validate_acyclic()?;

    let mut run = SimRun::new(network, options);
    run.init();

    log::debug!(
        "starting run: {} nodes, {} periods (+{} extra), seed {}",
        run.net.node_count(),
        options.num_periods,
        run.extra_periods,
        options.seed
    );

    for t in 0..run.total_periods {
        run.update_disruptions(t);
        run.order_pass(t);
        run.shipment_pass(t);
        run.check_consistency(t)?;
        run.advance_and_cost(t);
    }

    let results = run.finish();
    log::debug!("run complete: total cost {}", results.total_cost);
    Ok(results)
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Everything owned by one run in progress. Replaces any notion of shared
/// process-wide state (the warned-once flag lives here, not in a global).
struct SimRun<'a> {
    net: &'a mut SupplyNetwork,
    options: &'a SimOptions,
    rng: SimRng,
    history: StateHistory,
    indexes: SecondaryMap<NodeId, NeighborIndex>,
    /// Source-to-sink DFS order (shipment pass).
    pre_order: Vec<NodeId>,
    /// Successors-first DFS order (order pass).
    post_order: Vec<NodeId>,
    /// All node IDs ascending, for the per-node phases where graph order
    /// is irrelevant but determinism is not.
    sorted_ids: Vec<NodeId>,
    extra_periods: usize,
    total_periods: usize,
    warned: bool,
    suspect: bool,
}

impl<'a> SimRun<'a> {
    fn new(net: &'a mut SupplyNetwork, options: &'a SimOptions) -> Self {
        Self {
            net,
            options,
            rng: SimRng::new(options.seed),
            history: StateHistory::new(),
            indexes: SecondaryMap::new(),
            pre_order: Vec::new(),
            post_order: Vec::new(),
            sorted_ids: Vec::new(),
            extra_periods: 0,
            total_periods: 0,
            warned: false,
            suspect: false,
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    fn init(&mut self) {
        self.sorted_ids = self.net.node_ids();
        self.extra_periods = extra_periods(self.net);
        self.total_periods = self.options.num_periods + self.extra_periods;

        // Reset disruption chain state from any previous run.
        for i in 0..self.sorted_ids.len() {
            let id = self.sorted_ids[i];
            self.net[id].disruption.reset();
        }

        // Neighbor slot lists, fixed for the whole run.
        for &id in &self.sorted_ids {
            self.indexes.insert(
                id,
                NeighborIndex {
                    preds: self.net.predecessors(id, true),
                    succs: self.net.successors(id, true),
                },
            );
        }

        // Preallocate the full state series per node.
        for &id in &self.sorted_ids {
            let node = &self.net[id];
            let index = &self.indexes[id];

            // An external-supply order lands at slot OLT + SLT of the
            // node's own pipeline; a predecessor's shipment at slot SLT.
            let shipment_len = node.order_lead_time + node.shipment_lead_time + 1;
            // An order from successor `s` lands at slot `s.order_lead_time`;
            // external demand at slot 0.
            let order_lens: Vec<usize> = index
                .succs
                .iter()
                .map(|succ| match succ {
                    Neighbor::External => 1,
                    Neighbor::Node(m) => self.net[*m].order_lead_time + 1,
                })
                .collect();

            // Periods past 0 are placeholders; the advance phase overwrites
            // each from its predecessor.
            let seed_state =
                NodeState::new(index, node.initial_inventory, shipment_len, &order_lens);
            let states = vec![seed_state; self.total_periods];
            self.history.insert_node(id, index.clone(), states);
        }

        self.compute_traversal();
    }

    /// Explicit-stack DFS from the source nodes. `pre_order` records nodes
    /// on the way down (source-to-sink), `post_order` on the way back up
    /// (every node after all of its successors). Roots and successor lists
    /// are iterated in ascending order, so the walk is deterministic.
    fn compute_traversal(&mut self) {
        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();

        for &root in &self.net.source_nodes() {
            if visited.contains_key(root) {
                continue;
            }
            visited.insert(root, ());
            self.pre_order.push(root);
            stack.push((root, real_successors(self.net, root), 0));

            while let Some((node, succs, next)) = stack.last_mut() {
                if *next < succs.len() {
                    let child = succs[*next];
                    *next += 1;
                    if !visited.contains_key(child) {
                        visited.insert(child, ());
                        self.pre_order.push(child);
                        stack.push((child, real_successors(self.net, child), 0));
                    }
                } else {
                    self.post_order.push(*node);
                    stack.pop();
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 1: Disruption update
    // -----------------------------------------------------------------------

    fn update_disruptions(&mut self, t: Period) {
        for i in 0..self.sorted_ids.len() {
            let id = self.sorted_ids[i];
            self.net[id].disruption.update(t, &mut self.rng);
            self.history.state_mut(id, t).disrupted = self.net[id].disruption.disrupted();
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Order pass
    // -----------------------------------------------------------------------

    fn order_pass(&mut self, t: Period) {
        for i in 0..self.post_order.len() {
            let id = self.post_order[i];
            self.order_pass_node(id, t);
        }
    }

    fn order_pass_node(&mut self, n: NodeId, t: Period) {
        let node = &self.net[n];
        let index = &self.indexes[n];

        // 1. Realize external demand into the external-successor order slot.
        if let Some(demand) = node.demand_source.generate(t, &mut self.rng) {
            if let Some(slot) = index.succ_slot(Neighbor::External) {
                self.history.state_mut(n, t).inbound_order_pipeline[slot][0] += demand;
            }
        }

        // 2. Receive inbound orders: slot 0 of every successor's pipeline
        // is this period's realized order.
        let st = self.history.state_mut(n, t);
        let mut total_inbound = 0.0;
        for s in 0..st.inbound_order_pipeline.len() {
            let incoming = st.inbound_order_pipeline[s][0];
            st.inbound_order_pipeline[s][0] = 0.0;
            st.inbound_order[s] = incoming;
            total_inbound += incoming;
        }
        st.demand_cumul += total_inbound;

        // 3. Compute and place one order per predecessor. An order-pausing
        // disruption forces every quantity to zero.
        let order_paused = node
            .disruption
            .disrupted_as(DisruptionType::OrderPausing);
        for p in 0..index.preds.len() {
            let order_qty = if order_paused {
                0.0
            } else {
                let signal = self.history.state(n, t).inventory_position(p);
                node.policy.order_quantity(signal)
            };

            let st = self.history.state_mut(n, t);
            st.order_quantity[p] = order_qty;
            st.on_order_by_predecessor[p] += order_qty;

            match index.preds[p] {
                // External supply skips the order pipeline entirely: the
                // goods land in the node's own inbound-shipment pipeline
                // after the combined lead time.
                Neighbor::External => {
                    let arrival = node.order_lead_time + node.shipment_lead_time;
                    self.history.state_mut(n, t).inbound_shipment_pipeline[p][arrival] +=
                        order_qty;
                }
                Neighbor::Node(m) => {
                    if let Some(slot) = self.indexes[m].succ_slot(Neighbor::Node(n)) {
                        self.history.state_mut(m, t).inbound_order_pipeline[slot]
                            [node.order_lead_time] += order_qty;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Shipment pass
    // -----------------------------------------------------------------------

    fn shipment_pass(&mut self, t: Period) {
        for i in 0..self.pre_order.len() {
            let id = self.pre_order[i];
            self.shipment_pass_node(id, t);
        }
    }

    fn shipment_pass_node(&mut self, n: NodeId, t: Period) {
        let node = &self.net[n];
        let index = &self.indexes[n];
        let receipt_paused = node
            .disruption
            .disrupted_as(DisruptionType::ReceiptPausing);

        let st = self.history.state_mut(n, t);

        // 1. Receive shipments. Under a receipt-pausing disruption the
        // realized receipt is zero and the goods stay in the pipeline slot.
        for p in 0..index.preds.len() {
            if receipt_paused {
                st.inbound_shipment[p] = 0.0;
            } else {
                let arriving = st.inbound_shipment_pipeline[p][0];
                st.inbound_shipment_pipeline[p][0] = 0.0;
                st.inbound_shipment[p] = arriving;
                st.raw_material_inventory[p] += arriving;
                st.on_order_by_predecessor[p] -= arriving;
            }
        }

        // 2. Produce finished goods: the assembly bottleneck is the minimum
        // raw-material balance across predecessors.
        let new_finished = if index.preds.is_empty() {
            0.0
        } else {
            st.raw_material_inventory
                .iter()
                .fold(f64::INFINITY, |a, &b| a.min(b))
        };
        for rm in &mut st.raw_material_inventory {
            *rm -= new_finished;
        }
        st.inventory_level += new_finished;

        // 3. Allocate outbound shipments in fixed successor-slot order.
        // Physical on-hand is the inventory level plus the demand already
        // owed, since the level is net of unmet demand.
        let mut on_hand = (st.inventory_level + st.backorder_total()).max(0.0);
        let mut met_from_stock = 0.0;
        for s in 0..index.succs.len() {
            let succ_paused = match index.succs[s] {
                Neighbor::External => false,
                Neighbor::Node(m) => self.net[m]
                    .disruption
                    .disrupted_as(DisruptionType::ShipmentPausing),
            };

            let incoming = st.inbound_order[s];
            let owed = st.backorders_by_successor[s];
            let ready_to_ship = on_hand.min(owed + incoming);
            // Backorders clear first; the remainder is today's demand.
            let backorders_cleared = owed.min(ready_to_ship);
            let new_demand_covered = ready_to_ship - backorders_cleared;

            let shipped;
            if succ_paused {
                // Withhold everything; buffer it as disrupted items.
                shipped = 0.0;
                st.disrupted_items_by_successor[s] += ready_to_ship;
            } else {
                // Held items always release once the successor recovers,
                // independent of current capacity.
                shipped = ready_to_ship + st.disrupted_items_by_successor[s];
                st.disrupted_items_by_successor[s] = 0.0;
                met_from_stock += new_demand_covered;
            }
            // Released held items were already excluded from on-hand when
            // they were buffered, so only the fresh transfer leaves it.
            on_hand -= ready_to_ship;

            st.backorders_by_successor[s] =
                (owed - backorders_cleared) + (incoming - new_demand_covered);
            st.outbound_shipment[s] = shipped;

            // Inventory level tracks on-hand minus total unmet demand, so
            // it drops by the successor's realized order, not the shipment.
            st.inventory_level -= incoming;
        }

        // 4. Fill rate.
        st.demand_met_from_stock_cumul += met_from_stock;
        st.fill_rate = if st.demand_cumul > 0.0 {
            st.demand_met_from_stock_cumul / st.demand_cumul
        } else {
            1.0
        };

        // 5. Propagate downstream: shipments land in each successor's
        // inbound pipeline after that successor's shipment lead time.
        for s in 0..index.succs.len() {
            if let Neighbor::Node(m) = index.succs[s] {
                let shipped = self.history.state(n, t).outbound_shipment[s];
                let arrival = self.net[m].shipment_lead_time;
                if let Some(slot) = self.indexes[m].pred_slot(Neighbor::Node(n)) {
                    self.history.state_mut(m, t).inbound_shipment_pipeline[slot][arrival] +=
                        shipped;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Consistency check
    // -----------------------------------------------------------------------

    fn check_consistency(&mut self, t: Period) -> Result<(), SimError> {
        if matches!(self.options.consistency, ConsistencyChecks::Ignore) {
            return Ok(());
        }

        for i in 0..self.sorted_ids.len() {
            let id = self.sorted_ids[i];
            let st = self.history.state(id, t);
            let expected = (-st.inventory_level).max(0.0);
            let actual = st.backorder_total();
            let tol = CONSISTENCY_TOL * expected.abs().max(1.0);
            if (actual - expected).abs() <= tol {
                continue;
            }

            match &self.options.consistency {
                ConsistencyChecks::Ignore => unreachable!(),
                ConsistencyChecks::Warn | ConsistencyChecks::WarnAndDump(_) => {
                    self.suspect = true;
                    if !self.warned {
                        self.warned = true;
                        log::warn!(
                            "backorder bookkeeping inconsistent at node {:?}, period {}: \
                             expected {}, found {} (results may be unreliable)",
                            id,
                            t,
                            expected,
                            actual
                        );
                        if let ConsistencyChecks::WarnAndDump(path) = &self.options.consistency {
                            if let Err(err) = self.write_dump(path.clone()) {
                                log::warn!("diagnostic dump failed: {err}");
                            }
                        }
                    }
                }
                ConsistencyChecks::Fail | ConsistencyChecks::FailAndDump(_) => {
                    if let ConsistencyChecks::FailAndDump(path) = &self.options.consistency {
                        self.write_dump(path.clone())?;
                    }
                    return Err(SimError::ConsistencyViolation {
                        node: id,
                        period: t,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    /// Write the instance plus the state history so far as JSON.
    fn write_dump(&self, path: PathBuf) -> Result<(), SimError> {
        #[derive(Serialize)]
        struct Dump<'d> {
            network: &'d SupplyNetwork,
            history: &'d StateHistory,
        }

        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(
            file,
            &Dump {
                network: &*self.net,
                history: &self.history,
            },
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 5: Advance & costing
    // -----------------------------------------------------------------------

    fn advance_and_cost(&mut self, t: Period) {
        // Seed period t+1 before costing so the pipeline shift and the cost
        // accrual both see period t's final values.
        if t + 1 < self.total_periods {
            for i in 0..self.sorted_ids.len() {
                let id = self.sorted_ids[i];
                let freeze = self.net[id]
                    .disruption
                    .disrupted_as(DisruptionType::TransitPausing);
                let next = self.history.state(id, t).advanced(freeze);
                *self.history.state_mut(id, t + 1) = next;
            }
        }

        for i in 0..self.sorted_ids.len() {
            let id = self.sorted_ids[i];
            let index = &self.indexes[id];

            // Quantities en route to successors sit in their pipelines.
            let mut in_transit = 0.0;
            for succ in &index.succs {
                if let Neighbor::Node(m) = succ {
                    if let Some(slot) = self.indexes[*m].pred_slot(Neighbor::Node(id)) {
                        in_transit += self.history.state(*m, t).inbound_shipment_pipeline[slot]
                            .iter()
                            .sum::<f64>();
                    }
                }
            }

            // Raw material is valued at the supplying predecessor's rate;
            // external raw material carries no holding cost.
            let mut raw_material_holding = 0.0;
            for p in 0..index.preds.len() {
                if let Neighbor::Node(m) = index.preds[p] {
                    raw_material_holding += self.net[m].local_holding_cost
                        * self.history.state(id, t).raw_material_inventory[p];
                }
            }

            let node = &self.net[id];
            let local_holding_cost = node.local_holding_cost;
            let stockout_cost = node.stockout_cost;
            let in_transit_rate = node.in_transit_rate();
            let revenue_rate = node.revenue;

            let st = self.history.state_mut(id, t);
            st.holding_cost_incurred = local_holding_cost
                * (st.on_hand() + st.disrupted_items_total())
                + raw_material_holding;
            st.stockout_cost_incurred = stockout_cost * (-st.inventory_level).max(0.0);
            st.in_transit_holding_cost_incurred = in_transit_rate * in_transit;
            st.revenue_earned = revenue_rate * st.outbound_shipment.iter().sum::<f64>();
            st.total_cost_incurred = st.holding_cost_incurred
                + st.stockout_cost_incurred
                + st.in_transit_holding_cost_incurred
                - st.revenue_earned;
        }
    }

    // -----------------------------------------------------------------------
    // Finish
    // -----------------------------------------------------------------------

    fn finish(self) -> SimResults {
        let mut total_cost = 0.0;
        for &id in &self.sorted_ids {
            for state in self.history.node_states(id) {
                total_cost += state.total_cost_incurred;
            }
        }
        SimResults {
            total_cost,
            history: self.history,
            extra_periods: self.extra_periods,
            consistency_suspect: self.suspect,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Trailing buffer periods: enough for the longest order still in flight at
/// the horizon to arrive and settle.
pub fn extra_periods(net: &SupplyNetwork) -> usize {
    let max_order = net
        .nodes()
        .map(|(_, n)| n.order_lead_time)
        .max()
        .unwrap_or(0);
    let max_shipment = net
        .nodes()
        .map(|(_, n)| n.shipment_lead_time)
        .max()
        .unwrap_or(0);
    max_order + max_shipment + 2
}

/// Real (non-sentinel) successors in ascending order.
fn real_successors(net: &SupplyNetwork, id: NodeId) -> Vec<NodeId> {
    net.successors(id, false)
        .into_iter()
        .filter_map(|n| n.node_id())
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandSource;
    use crate::node::{SupplyNode, SupplyType};
    use crate::policy::InventoryPolicy;

    fn base_stock_stage(level: f64) -> SupplyNode {
        SupplyNode {
            local_holding_cost: 1.0,
            stockout_cost: 10.0,
            supply_type: SupplyType::External,
            demand_source: DemandSource::constant(10.0),
            policy: InventoryPolicy::BaseStock {
                base_stock_level: level,
            },
            ..SupplyNode::new()
        }
    }

    #[test]
    fn cyclic_network_rejected_before_simulating() {
        let mut net = SupplyNetwork::new();
        let a = net.add_node(SupplyNode::new());
        let b = net.add_node(SupplyNode::new());
        net.connect(a, b).unwrap();
        net.connect(b, a).unwrap();

        let err = simulate(&mut net, &SimOptions::new(10, 1)).unwrap_err();
        assert!(matches!(
            err,
            SimError::Network(NetworkError::CycleDetected)
        ));
    }

    #[test]
    fn empty_network_runs_to_zero_cost() {
        let mut net = SupplyNetwork::new();
        let results = simulate(&mut net, &SimOptions::new(10, 1)).unwrap();
        assert_eq!(results.total_cost, 0.0);
        assert_eq!(results.extra_periods, 2);
    }

    #[test]
    fn extra_periods_from_max_lead_times() {
        let mut net = SupplyNetwork::new();
        net.add_node(SupplyNode {
            order_lead_time: 3,
            shipment_lead_time: 1,
            ..SupplyNode::new()
        });
        net.add_node(SupplyNode {
            order_lead_time: 0,
            shipment_lead_time: 4,
            ..SupplyNode::new()
        });
        assert_eq!(extra_periods(&net), 3 + 4 + 2);
    }

    #[test]
    fn single_stage_zero_lead_time_conserves() {
        // Base-stock 10, deterministic demand 10, zero lead times, zero
        // initial inventory: the stage replenishes exactly what it sells
        // every period, so IL pins at 0 and no cost is ever incurred.
        let mut net = SupplyNetwork::new();
        let n = net.add_node(base_stock_stage(10.0));

        let results = simulate(&mut net, &SimOptions::new(20, 7)).unwrap();
        for t in 0..results.history.period_count(n) {
            let st = results.history.state(n, t);
            assert_eq!(st.inventory_level, 0.0, "period {t}");
            assert_eq!(st.stockout_cost_incurred, 0.0, "period {t}");
            assert_eq!(st.total_cost_incurred, 0.0, "period {t}");
        }
        assert_eq!(results.total_cost, 0.0);
        assert!(!results.consistency_suspect);
    }

    #[test]
    fn pipeline_delay_matches_lead_time() {
        // Shipment lead time 2: the unit ordered in period 0 arrives as an
        // inbound shipment exactly in period 2, not before.
        let mut net = SupplyNetwork::new();
        let n = net.add_node(SupplyNode {
            shipment_lead_time: 2,
            supply_type: SupplyType::External,
            policy: InventoryPolicy::FixedQuantity { quantity: 1.0 },
            ..SupplyNode::new()
        });

        let results = simulate(&mut net, &SimOptions::new(6, 3)).unwrap();
        assert_eq!(
            results.history.order_quantity_for(n, Neighbor::External, 0),
            1.0
        );
        assert_eq!(results.history.inbound_shipment_total(n, 0), 0.0);
        assert_eq!(results.history.inbound_shipment_total(n, 1), 0.0);
        assert_eq!(results.history.inbound_shipment_total(n, 2), 1.0);
        assert_eq!(results.history.inbound_shipment_total(n, 3), 1.0);
    }

    #[test]
    fn unmet_demand_becomes_backorders() {
        // No replenishment at all: every period's demand backorders, and
        // the consistency identity holds as IL goes negative.
        let mut net = SupplyNetwork::new();
        let n = net.add_node(SupplyNode {
            stockout_cost: 1.0,
            demand_source: DemandSource::constant(5.0),
            ..SupplyNode::new()
        });

        let results = simulate(&mut net, &SimOptions::new(4, 1)).unwrap();
        for t in 0..4 {
            let st = results.history.state(n, t);
            let expected = 5.0 * (t + 1) as f64;
            assert_eq!(st.inventory_level, -expected, "period {t}");
            assert_eq!(st.backorder_total(), expected, "period {t}");
            assert_eq!(st.stockout_cost_incurred, expected, "period {t}");
        }
        assert!(!results.consistency_suspect);
    }

    #[test]
    fn rerun_is_bit_identical() {
        let mut net = SupplyNetwork::new();
        net.add_node(SupplyNode {
            local_holding_cost: 0.5,
            stockout_cost: 4.0,
            shipment_lead_time: 1,
            supply_type: SupplyType::External,
            demand_source: DemandSource::Poisson { mean: 8.0 },
            policy: InventoryPolicy::BaseStock {
                base_stock_level: 20.0,
            },
            ..SupplyNode::new()
        });

        let options = SimOptions::new(50, 42);
        let first = simulate(&mut net, &options).unwrap();
        let second = simulate(&mut net, &options).unwrap();
        assert_eq!(first.total_cost.to_bits(), second.total_cost.to_bits());
        assert_eq!(first.history.state_hash(), second.history.state_hash());
        // Same config, different seed: a different realization.
        let third = simulate(&mut net, &SimOptions::new(50, 43)).unwrap();
        assert_ne!(first.history.state_hash(), third.history.state_hash());
    }

    #[test]
    fn order_pass_runs_successors_first() {
        // Two-stage serial system with zero lead times everywhere: the
        // upstream stage must see the downstream order in the same period,
        // so in steady state both stages order the per-period demand.
        let mut net = SupplyNetwork::new();
        let upstream = net.add_node(SupplyNode {
            supply_type: SupplyType::External,
            policy: InventoryPolicy::BaseStock {
                base_stock_level: 0.0,
            },
            ..SupplyNode::new()
        });
        let downstream = net.add_node(SupplyNode {
            demand_source: DemandSource::constant(6.0),
            policy: InventoryPolicy::BaseStock {
                base_stock_level: 0.0,
            },
            ..SupplyNode::new()
        });
        net.connect(upstream, downstream).unwrap();

        let results = simulate(&mut net, &SimOptions::new(5, 1)).unwrap();
        // Period 0's demand registers in the downstream inventory level by
        // period 1, so from then on the downstream stage orders 6 per
        // period, and the upstream stage sees each order in the same period
        // it is placed (zero order lead time, successors-first traversal).
        for t in 1..5 {
            assert_eq!(
                results
                    .history
                    .order_quantity_for(downstream, Neighbor::Node(upstream), t),
                6.0,
                "downstream period {t}"
            );
            let slot = results
                .history
                .neighbor_index(upstream)
                .succ_slot(Neighbor::Node(downstream))
                .unwrap();
            assert_eq!(
                results.history.state(upstream, t).inbound_order[slot],
                6.0,
                "upstream period {t}"
            );
        }
        // Before any order arrives, the upstream stage has seen no demand.
        assert_eq!(results.history.state(upstream, 0).demand_cumul, 0.0);
    }

    #[test]
    fn consistency_fail_mode_halts_on_corruption() {
        // Sabotage the bookkeeping through a crafted initial state: a
        // negative initial inventory with no matching backorders violates
        // the identity in period 0 (demandless node, IL stays negative,
        // backorders stay zero... but the identity requires them equal).
        let mut net = SupplyNetwork::new();
        net.add_node(SupplyNode {
            initial_inventory: -5.0,
            ..SupplyNode::new()
        });

        let mut options = SimOptions::new(3, 1);
        options.consistency = ConsistencyChecks::Fail;
        let err = simulate(&mut net, &options).unwrap_err();
        match err {
            SimError::ConsistencyViolation {
                period,
                expected,
                actual,
                ..
            } => {
                assert_eq!(period, 0);
                assert_eq!(expected, 5.0);
                assert_eq!(actual, 0.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn consistency_warn_mode_marks_suspect_and_finishes() {
        let mut net = SupplyNetwork::new();
        net.add_node(SupplyNode {
            initial_inventory: -5.0,
            ..SupplyNode::new()
        });

        let results = simulate(&mut net, &SimOptions::new(3, 1)).unwrap();
        assert!(results.consistency_suspect);
    }

    #[test]
    fn consistency_ignore_mode_stays_silent() {
        let mut net = SupplyNetwork::new();
        net.add_node(SupplyNode {
            initial_inventory: -5.0,
            ..SupplyNode::new()
        });

        let mut options = SimOptions::new(3, 1);
        options.consistency = ConsistencyChecks::Ignore;
        let results = simulate(&mut net, &options).unwrap();
        assert!(!results.consistency_suspect);
    }
}
