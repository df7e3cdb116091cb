//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::demand::DemandSource;
use crate::id::NodeId;
use crate::network::SupplyNetwork;
use crate::node::{SupplyNode, SupplyType};
use crate::policy::InventoryPolicy;
use crate::sim::{simulate, SimOptions, SimResults};

// ===========================================================================
// Node constructors
// ===========================================================================

/// A stage with base-stock control and unit holding/stockout costs.
pub fn base_stock_node(base_stock_level: f64) -> SupplyNode {
    SupplyNode {
        local_holding_cost: 1.0,
        stockout_cost: 10.0,
        policy: InventoryPolicy::BaseStock { base_stock_level },
        ..SupplyNode::new()
    }
}

// ===========================================================================
// Network constructors
// ===========================================================================

/// One externally supplied stage facing constant demand.
pub fn single_stage(base_stock_level: f64, demand: f64) -> (SupplyNetwork, NodeId) {
    let mut net = SupplyNetwork::new();
    let n = net.add_node(SupplyNode {
        supply_type: SupplyType::External,
        demand_source: DemandSource::constant(demand),
        ..base_stock_node(base_stock_level)
    });
    (net, n)
}

/// A serial chain: node 0 has external supply, the last node faces demand.
/// `stages[i]` is the pre-configured node for echelon `i`; supply type and
/// demand source are overwritten to make the chain well-formed.
pub fn serial_system(
    mut stages: Vec<SupplyNode>,
    demand_source: DemandSource,
) -> (SupplyNetwork, Vec<NodeId>) {
    assert!(!stages.is_empty());
    let last = stages.len() - 1;
    stages[0].supply_type = SupplyType::External;
    stages[last].demand_source = demand_source;

    let mut net = SupplyNetwork::new();
    let ids: Vec<NodeId> = stages.into_iter().map(|n| net.add_node(n)).collect();
    for pair in ids.windows(2) {
        net.connect(pair[0], pair[1]).unwrap();
    }
    (net, ids)
}

/// A two-supplier assembly: both suppliers feed one externally facing
/// assembler, which needs a unit from each to produce one finished unit.
pub fn assembly_system(
    supplier_a: SupplyNode,
    supplier_b: SupplyNode,
    mut assembler: SupplyNode,
    demand_source: DemandSource,
) -> (SupplyNetwork, [NodeId; 3]) {
    assembler.demand_source = demand_source;

    let mut net = SupplyNetwork::new();
    let mut a_node = supplier_a;
    let mut b_node = supplier_b;
    a_node.supply_type = SupplyType::External;
    b_node.supply_type = SupplyType::External;
    let a = net.add_node(a_node);
    let b = net.add_node(b_node);
    let asm = net.add_node(assembler);
    net.connect(a, asm).unwrap();
    net.connect(b, asm).unwrap();
    (net, [a, b, asm])
}

// ===========================================================================
// Run helper
// ===========================================================================

/// Simulate with default consistency handling, panicking on error.
pub fn run(net: &mut SupplyNetwork, num_periods: usize, seed: u64) -> SimResults {
    simulate(net, &SimOptions::new(num_periods, seed)).unwrap()
}
