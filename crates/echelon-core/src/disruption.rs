//! Disruption processes: per-node on/off processes that each suspend a
//! different stage of the per-period protocol.
//!
//! The transition sampling lives here; the *effects* live in the engine:
//!
//! - `OrderPausing` forces the node's order quantities to zero.
//! - `ShipmentPausing` makes upstream nodes withhold shipments to this node
//!   and buffer them as disrupted items.
//! - `ReceiptPausing` forces the node's realized receipts to zero; the
//!   goods stay queued in the pipeline slot.
//! - `TransitPausing` freezes the node's own inbound-shipment pipelines
//!   during the period advance.

use crate::id::Period;
use crate::rng::SimRng;

/// Which stage of the per-period protocol a disruption suspends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DisruptionType {
    OrderPausing,
    ShipmentPausing,
    ReceiptPausing,
    TransitPausing,
}

/// Disruption process assigned to a node. Updated once per period, per
/// node, before the order-propagation pass; the realized state for the
/// period is recorded on that period's node state.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum DisruptionProcess {
    /// Never disrupted.
    #[default]
    None,
    /// Two-state Markov chain: while up, goes down with probability
    /// `disruption_prob`; while down, recovers with probability
    /// `recovery_prob`. Starts up.
    TwoStateMarkov {
        disruption_type: DisruptionType,
        disruption_prob: f64,
        recovery_prob: f64,
        /// Current chain state. Reset at the start of every run.
        #[serde(default)]
        down: bool,
    },
    /// Disrupted exactly in the listed periods.
    Explicit {
        disruption_type: DisruptionType,
        periods: Vec<Period>,
        #[serde(default)]
        down: bool,
    },
}

impl DisruptionProcess {
    /// Reset internal state to "up". Called at run start so a previous
    /// run's chain state never leaks into the next.
    pub fn reset(&mut self) {
        match self {
            DisruptionProcess::None => {}
            DisruptionProcess::TwoStateMarkov { down, .. }
            | DisruptionProcess::Explicit { down, .. } => *down = false,
        }
    }

    /// Sample the transition for `period` and record the realized state.
    pub fn update(&mut self, period: Period, rng: &mut SimRng) {
        match self {
            DisruptionProcess::None => {}
            DisruptionProcess::TwoStateMarkov {
                disruption_prob,
                recovery_prob,
                down,
                ..
            } => {
                if *down {
                    if rng.chance(*recovery_prob) {
                        *down = false;
                    }
                } else if rng.chance(*disruption_prob) {
                    *down = true;
                }
            }
            DisruptionProcess::Explicit { periods, down, .. } => {
                *down = periods.contains(&period);
            }
        }
    }

    /// Current disruption status.
    pub fn disrupted(&self) -> bool {
        match self {
            DisruptionProcess::None => false,
            DisruptionProcess::TwoStateMarkov { down, .. }
            | DisruptionProcess::Explicit { down, .. } => *down,
        }
    }

    /// The type of this disruption process, if it has one.
    pub fn disruption_type(&self) -> Option<DisruptionType> {
        match self {
            DisruptionProcess::None => None,
            DisruptionProcess::TwoStateMarkov {
                disruption_type, ..
            }
            | DisruptionProcess::Explicit {
                disruption_type, ..
            } => Some(*disruption_type),
        }
    }

    /// True if the node is currently disrupted with the given type.
    pub fn disrupted_as(&self, ty: DisruptionType) -> bool {
        self.disrupted() && self.disruption_type() == Some(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_disrupts() {
        let mut p = DisruptionProcess::None;
        let mut rng = SimRng::new(1);
        for t in 0..100 {
            p.update(t, &mut rng);
            assert!(!p.disrupted());
        }
        assert_eq!(p.disruption_type(), None);
    }

    #[test]
    fn explicit_periods_hit_exactly() {
        let mut p = DisruptionProcess::Explicit {
            disruption_type: DisruptionType::OrderPausing,
            periods: vec![2, 3, 7],
            down: false,
        };
        let mut rng = SimRng::new(1);
        for t in 0..10 {
            p.update(t, &mut rng);
            assert_eq!(p.disrupted(), [2, 3, 7].contains(&t), "period {t}");
        }
    }

    #[test]
    fn markov_certain_transitions() {
        let mut p = DisruptionProcess::TwoStateMarkov {
            disruption_type: DisruptionType::ShipmentPausing,
            disruption_prob: 1.0,
            recovery_prob: 1.0,
            down: false,
        };
        let mut rng = SimRng::new(1);
        // Alternates: down, up, down, ...
        p.update(0, &mut rng);
        assert!(p.disrupted());
        p.update(1, &mut rng);
        assert!(!p.disrupted());
        p.update(2, &mut rng);
        assert!(p.disrupted());
    }

    #[test]
    fn markov_zero_prob_stays_up() {
        let mut p = DisruptionProcess::TwoStateMarkov {
            disruption_type: DisruptionType::TransitPausing,
            disruption_prob: 0.0,
            recovery_prob: 0.5,
            down: false,
        };
        let mut rng = SimRng::new(1);
        for t in 0..100 {
            p.update(t, &mut rng);
            assert!(!p.disrupted());
        }
    }

    #[test]
    fn reset_clears_state() {
        let mut p = DisruptionProcess::Explicit {
            disruption_type: DisruptionType::ReceiptPausing,
            periods: vec![0],
            down: false,
        };
        let mut rng = SimRng::new(1);
        p.update(0, &mut rng);
        assert!(p.disrupted());
        p.reset();
        assert!(!p.disrupted());
    }

    #[test]
    fn disrupted_as_matches_type_and_state() {
        let mut p = DisruptionProcess::Explicit {
            disruption_type: DisruptionType::OrderPausing,
            periods: vec![0],
            down: false,
        };
        let mut rng = SimRng::new(1);
        p.update(0, &mut rng);
        assert!(p.disrupted_as(DisruptionType::OrderPausing));
        assert!(!p.disrupted_as(DisruptionType::ShipmentPausing));
    }
}
