//! Primal player: cost-sensitive best response.

use crate::dataset::Dataset;
use crate::oracle::{Classifier, RegressionOracle};
use crate::regression::RegressionError;
use ndarray::{Array1, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LearnerError {
    #[error("Expected one cost per label-0 row ({expected}), got {found}.")]
    CostLengthMismatch { expected: usize, found: usize },
    #[error("Expected one weight per row ({expected}), got {found}.")]
    WeightLengthMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Regression(#[from] RegressionError),
}

/// Expands the per-negative cost vector into the two full-length cost vectors.
///
/// Answering 0 costs `eta` everywhere. Answering 1 costs `-1/n + eta` on
/// label-1 rows and the next unused entry of `negative_costs` plus `eta` on
/// label-0 rows, walking rows in their original order.
pub fn cost_vectors(
    negative_costs: ArrayView1<f64>,
    labels: ArrayView1<f64>,
    eta: f64,
) -> Result<(Array1<f64>, Array1<f64>), LearnerError> {
    let n = labels.len();
    let expected = labels.iter().filter(|&&y| y == 0.0).count();
    if negative_costs.len() != expected {
        return Err(LearnerError::CostLengthMismatch {
            expected,
            found: negative_costs.len(),
        });
    }

    let reward = -1.0 / n as f64 + eta;
    let mut pending = negative_costs.iter();
    let cost1: Array1<f64> = labels
        .iter()
        .map(|&y| {
            if y == 1.0 {
                reward
            } else {
                pending.next().map_or(eta, |&c| c + eta)
            }
        })
        .collect();

    Ok((Array1::from_elem(n, eta), cost1))
}

/// Fits the classifier minimising the cost-weighted error for the given costs.
pub fn best_response(
    negative_costs: ArrayView1<f64>,
    data: &Dataset,
    eta: f64,
) -> Result<Classifier, LearnerError> {
    let (cost0, cost1) = cost_vectors(negative_costs, data.labels(), eta)?;
    Ok(RegressionOracle::fit(
        data.features(),
        cost0.view(),
        cost1.view(),
    )?)
}

/// Plain weighted-error fit: a row pays its weight only for answering the wrong label.
pub fn fit_weighted(weights: ArrayView1<f64>, data: &Dataset) -> Result<Classifier, LearnerError> {
    if weights.len() != data.len() {
        return Err(LearnerError::WeightLengthMismatch {
            expected: data.len(),
            found: weights.len(),
        });
    }

    let labels = data.labels();
    let cost0: Array1<f64> = labels
        .iter()
        .zip(weights.iter())
        .map(|(&y, &w)| if y == 0.0 { 0.0 } else { w })
        .collect();
    let cost1: Array1<f64> = labels
        .iter()
        .zip(weights.iter())
        .map(|(&y, &w)| if y == 1.0 { 0.0 } else { w })
        .collect();

    Ok(RegressionOracle::fit(
        data.features(),
        cost0.view(),
        cost1.view(),
    )?)
}
