//! Inventory policies: how much a node orders from each predecessor.
//!
//! A policy is a pure function from an inventory-position signal to a
//! non-negative order quantity. The engine computes the signal (inventory
//! level + on-order + raw material, net of backorders) and calls the policy
//! once per predecessor per period; the policy itself holds no simulation
//! state.

/// Inventory policy assigned to a node. Enum dispatch, one variant per
/// policy family.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum InventoryPolicy {
    /// Never orders.
    #[default]
    None,
    /// Order up to `base_stock_level` every period.
    BaseStock { base_stock_level: f64 },
    /// When the inventory position falls to `reorder_point` or below, order
    /// `order_quantity` (a multiple of it, enough to get back above the
    /// reorder point).
    RQ {
        reorder_point: f64,
        order_quantity: f64,
    },
    /// When the inventory position falls to `s` or below, order up to `big_s`.
    SS { s: f64, big_s: f64 },
    /// Order `quantity` every period regardless of the signal.
    FixedQuantity { quantity: f64 },
}

impl InventoryPolicy {
    /// Compute the order quantity for the given inventory-position signal.
    /// Always non-negative.
    pub fn order_quantity(&self, inventory_position: f64) -> f64 {
        match self {
            InventoryPolicy::None => 0.0,
            InventoryPolicy::BaseStock { base_stock_level } => {
                (base_stock_level - inventory_position).max(0.0)
            }
            InventoryPolicy::RQ {
                reorder_point,
                order_quantity,
            } => {
                if inventory_position > *reorder_point || *order_quantity <= 0.0 {
                    0.0
                } else {
                    // Smallest multiple of Q that raises IP above r.
                    let deficit = reorder_point - inventory_position;
                    let batches = (deficit / order_quantity).ceil().max(1.0);
                    batches * order_quantity
                }
            }
            InventoryPolicy::SS { s, big_s } => {
                if inventory_position > *s {
                    0.0
                } else {
                    (big_s - inventory_position).max(0.0)
                }
            }
            InventoryPolicy::FixedQuantity { quantity } => quantity.max(0.0),
        }
    }
}
