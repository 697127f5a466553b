//! Fairness-penalty injection into the primal player's costs.
//!
//! The cost of answering 1 on a label-0 row starts at `1/n`. Each round the
//! auditor's group adds a signed, budget-scaled increment to its members, and
//! the accumulated deviation from `1/n` decays as `(t-1)/t`, which averages
//! the dual player's history.

use crate::auditor::GroupAudit;
use crate::config::FairnessDefinition;
use ndarray::{Array1, ArrayView1, Zip};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostError {
    #[error("Expected one previous cost per label-0 row ({expected}), got {found}.")]
    LengthMismatch { expected: usize, found: usize },
}

/// Parameters of one cost update.
#[derive(Debug, Clone, Copy)]
pub struct CostUpdate {
    /// Population size `n`.
    pub population: usize,
    /// Dual-variable scale `B`.
    pub budget: f64,
    /// Current round `t >= 1`.
    pub iteration: usize,
    pub beta: f64,
    pub fairness: FairnessDefinition,
}

/// This round's penalty on the label-0 rows.
#[derive(Debug, Clone)]
pub struct Penalty {
    pub increments: Array1<f64>,
    /// False when the group was within tolerance and the increments were zeroed.
    pub gate_open: bool,
}

/// Result of one cost update.
#[derive(Debug, Clone)]
pub struct CostStep {
    pub costs: Array1<f64>,
    /// True only when the group was out of tolerance and carried a non-zero disparity.
    pub penalized: bool,
}

/// Starting costs: `1/n` for each of the `negatives` label-0 rows.
pub fn initial_costs(population: usize, negatives: usize) -> Array1<f64> {
    Array1::from_elem(negatives, 1.0 / population as f64)
}

/// Per-row penalty increment for this round:
/// `(1/n) * sign * B * (1/t) * member * (group_weight_0 - 1)`,
/// or all zeros when the group is within tolerance.
pub fn penalty_increments(audit: &GroupAudit, update: &CostUpdate) -> Penalty {
    let members = audit.negative_members.view();
    let m = members.len();
    if m == 0 {
        return Penalty {
            increments: Array1::zeros(0),
            gate_open: false,
        };
    }

    let group_mass_0 = audit.group_mass_0(update.population);
    if update
        .fairness
        .within_tolerance(audit.disparity, group_mass_0, update.beta)
    {
        return Penalty {
            increments: Array1::zeros(m),
            gate_open: false,
        };
    }

    let n = update.population as f64;
    let t = update.iteration as f64;
    let group_weight_0 = audit.negative_member_count() as f64 / m as f64;
    let scale = (1.0 / n) * audit.sign() * update.budget * (1.0 / t) * (group_weight_0 - 1.0);
    Penalty {
        increments: members.mapv(|member| scale * member),
        gate_open: true,
    }
}

/// Blends the previous costs with this round's increments, preserving the `1/n` baseline.
pub fn update_costs(
    previous: ArrayView1<f64>,
    audit: &GroupAudit,
    update: &CostUpdate,
) -> Result<CostStep, CostError> {
    if previous.len() != audit.negative_members.len() {
        return Err(CostError::LengthMismatch {
            expected: audit.negative_members.len(),
            found: previous.len(),
        });
    }

    let penalty = penalty_increments(audit, update);
    let penalized = penalty.gate_open && audit.sign() != 0.0;

    let baseline = 1.0 / update.population as f64;
    let t = update.iteration as f64;
    let decay = (t - 1.0) / t;
    let costs = Zip::from(&previous)
        .and(&penalty.increments)
        .map_collect(|&c, &delta| (c - baseline) * decay + delta + baseline);

    Ok(CostStep { costs, penalized })
}
