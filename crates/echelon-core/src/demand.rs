//! Demand sources: how external customer demand is realized each period.
//!
//! Uses **enum dispatch** (not trait objects): sized inline storage, plain
//! serde derives, and a single match in the per-period hot loop. A node
//! whose demand source is [`DemandSource::None`] faces no external customer
//! and never draws from the RNG.

use crate::id::Period;
use crate::rng::SimRng;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

/// Demand source assigned to a node. Realized once per period during the
/// order-propagation pass.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum DemandSource {
    /// No external customer.
    #[default]
    None,
    /// Deterministic demand list, cycled (`list[t % len]`). A single-element
    /// list gives constant demand.
    Deterministic { demand_list: Vec<f64> },
    /// Continuous uniform demand on `[lo, hi]`.
    Uniform { lo: f64, hi: f64 },
    /// Normal demand truncated at zero.
    Normal { mean: f64, sd: f64 },
    /// Poisson demand.
    Poisson { mean: f64 },
}

impl DemandSource {
    /// Constant demand every period.
    pub fn constant(demand: f64) -> Self {
        DemandSource::Deterministic {
            demand_list: vec![demand],
        }
    }

    /// Returns true if this node faces an external customer.
    pub fn is_some(&self) -> bool {
        !matches!(self, DemandSource::None)
    }

    /// Realize the demand for `period`, or `None` if the node has no
    /// external customer.
    ///
    /// Degenerate parameters (zero-width uniform, non-positive Poisson mean,
    /// non-finite sd) degrade to their deterministic limit rather than
    /// failing mid-run; validating configuration is the caller's job.
    pub fn generate(&self, period: Period, rng: &mut SimRng) -> Option<f64> {
        match self {
            DemandSource::None => None,
            DemandSource::Deterministic { demand_list } => {
                if demand_list.is_empty() {
                    Some(0.0)
                } else {
                    Some(demand_list[period % demand_list.len()])
                }
            }
            DemandSource::Uniform { lo, hi } => {
                if hi <= lo {
                    Some(lo.max(0.0))
                } else {
                    Some(rng.gen_range(*lo..*hi).max(0.0))
                }
            }
            DemandSource::Normal { mean, sd } => match Normal::new(*mean, *sd) {
                Ok(dist) => Some(dist.sample(rng).max(0.0)),
                Err(_) => Some(mean.max(0.0)),
            },
            DemandSource::Poisson { mean } => match Poisson::new(*mean) {
                Ok(dist) => Some(dist.sample(rng)),
                Err(_) => Some(0.0),
            },
        }
    }
}
