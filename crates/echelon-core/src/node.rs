//! Static per-stage configuration. Immutable during a run.

use crate::demand::DemandSource;
use crate::disruption::DisruptionProcess;
use crate::policy::InventoryPolicy;

/// Whether a node can order from outside the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SupplyType {
    /// Replenishes only from its graph predecessors.
    #[default]
    None,
    /// Has an outside supplier with unlimited capacity; orders to it are
    /// delivered after `order_lead_time + shipment_lead_time` periods.
    External,
}

/// One inventory-holding stage in the supply network.
///
/// Created once and immutable during a run, except for the disruption
/// process, whose chain state advances period by period (and is reset at
/// run start).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SupplyNode {
    /// Optional human-readable label, used in logs and diagnostics.
    pub name: Option<String>,

    /// Holding cost per item per period for on-hand finished goods.
    pub local_holding_cost: f64,
    /// Penalty per item per period of unmet demand.
    pub stockout_cost: f64,
    /// Revenue per item shipped.
    pub revenue: f64,
    /// Holding cost rate for items in transit to successors. Falls back to
    /// `local_holding_cost` when unset.
    pub in_transit_holding_cost: Option<f64>,

    /// Periods between placing an order and the supplier seeing it.
    pub order_lead_time: usize,
    /// Periods between a shipment leaving the supplier and arriving here.
    pub shipment_lead_time: usize,

    /// Finished-goods inventory on hand at the start of period 0.
    pub initial_inventory: f64,

    pub supply_type: SupplyType,
    pub demand_source: DemandSource,
    pub policy: InventoryPolicy,
    pub disruption: DisruptionProcess,
}

impl Default for SupplyNode {
    fn default() -> Self {
        Self {
            name: None,
            local_holding_cost: 0.0,
            stockout_cost: 0.0,
            revenue: 0.0,
            in_transit_holding_cost: None,
            order_lead_time: 0,
            shipment_lead_time: 0,
            initial_inventory: 0.0,
            supply_type: SupplyType::None,
            demand_source: DemandSource::None,
            policy: InventoryPolicy::None,
            disruption: DisruptionProcess::None,
        }
    }
}

impl SupplyNode {
    /// A node with all-zero costs and lead times. Fields are public;
    /// configure by struct update or direct assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective in-transit holding cost rate.
    pub fn in_transit_rate(&self) -> f64 {
        self.in_transit_holding_cost
            .unwrap_or(self.local_holding_cost)
    }

    /// Returns true if the node orders from an outside supplier.
    pub fn has_external_supplier(&self) -> bool {
        self.supply_type == SupplyType::External
    }

    /// Returns true if the node faces an external customer.
    pub fn has_external_customer(&self) -> bool {
        self.demand_source.is_some()
    }
}
