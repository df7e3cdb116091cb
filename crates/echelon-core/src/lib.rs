//! Echelon Core -- a discrete-time simulation engine for multi-echelon
//! inventory networks.
//!
//! This crate provides the supply network graph, per-period state records,
//! inventory policies, demand sources, disruption processes, and the
//! deterministic simulation loop that drives them.
//!
//! # Five-Phase Period Pipeline
//!
//! Each simulated period in [`sim::simulate`] advances through the
//! following phases:
//!
//! 1. **Disruption update** -- Sample every node's disruption process.
//! 2. **Order pass** -- Realize demand, receive inbound orders, compute and
//!    post orders upstream (successors-first traversal).
//! 3. **Shipment pass** -- Receive shipments, produce finished goods,
//!    allocate outbound shipments downstream (source-to-sink traversal).
//! 4. **Consistency check** -- Cross-validate backorder bookkeeping.
//! 5. **Advance & costing** -- Shift pipelines into the next period and
//!    accrue holding, stockout, in-transit, and revenue terms.
//!
//! # Key Types
//!
//! - [`network::SupplyNetwork`] -- Directed acyclic graph of supply stages,
//!   with external-supply and external-demand sentinels at the boundary.
//! - [`node::SupplyNode`] -- Static per-stage configuration: costs, lead
//!   times, policy, demand source, disruption process.
//! - [`policy::InventoryPolicy`] -- Order-quantity rules: base-stock,
//!   (r, Q), (s, S), and fixed-quantity.
//! - [`demand::DemandSource`] -- Deterministic and stochastic external
//!   demand generators.
//! - [`disruption::DisruptionProcess`] -- Per-node on/off processes that
//!   each suspend one stage of the period pipeline.
//! - [`state::StateHistory`] -- Append-only per-node, per-period state
//!   series returned with the results.
//! - [`rng::SimRng`] -- Seeded deterministic PRNG; identical seeds replay
//!   bit-identically.
//! - [`instance`] -- Versioned JSON instance save/load (feature
//!   `instance-io`).

pub mod demand;
pub mod disruption;
pub mod id;
#[cfg(feature = "instance-io")]
pub mod instance;
pub mod network;
pub mod node;
pub mod policy;
pub mod rng;
pub mod sim;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
