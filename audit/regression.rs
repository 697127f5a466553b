//! # Ordinary Least Squares
//!
//! The only learner used by both players. Every oracle in the crate is built
//! from a pair of these regressors, so the fit must be deterministic and must
//! not fail on collinear or rank-deficient designs.
//!
//! The intercept is handled by centering: the slope is the least-norm solution
//! of the centered system, computed through the SVD-based LAPACK driver, and the
//! intercept restores the means. Singular designs therefore resolve to the
//! minimum-norm coefficient vector instead of an error.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::LeastSquaresSvd;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("Design matrix has {design} rows but the target has {target} entries.")]
    ShapeMismatch { design: usize, target: usize },
    #[error("Cannot fit a regression on zero rows.")]
    EmptyDesign,
    #[error("Regression target contains a non-finite value at row {0}.")]
    NonFiniteTarget(usize),
    #[error("The least-squares solve failed: {0}")]
    SolveFailed(#[from] ndarray_linalg::error::LinalgError),
}

/// A fitted linear model `x -> coefficients . x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coefficients: Array1<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Fits `target ~ design` by least squares with an intercept.
    pub fn fit(design: ArrayView2<f64>, target: ArrayView1<f64>) -> Result<Self, RegressionError> {
        if design.nrows() != target.len() {
            return Err(RegressionError::ShapeMismatch {
                design: design.nrows(),
                target: target.len(),
            });
        }
        if target.is_empty() {
            return Err(RegressionError::EmptyDesign);
        }
        if let Some(row) = target.iter().position(|v| !v.is_finite()) {
            return Err(RegressionError::NonFiniteTarget(row));
        }

        let target_mean = target.mean().unwrap_or(0.0);
        if design.ncols() == 0 {
            return Ok(Self::new(Array1::zeros(0), target_mean));
        }

        let column_means = design
            .mean_axis(Axis(0))
            .ok_or(RegressionError::EmptyDesign)?;
        let centered_design = &design - &column_means;
        let centered_target = target.mapv(|v| v - target_mean);

        // A target orthogonal to every centered column (a constant one included)
        // has the all-zero slope as its least-norm solution.
        let projection = centered_design.t().dot(&centered_target);
        if projection.iter().all(|&v| v == 0.0) {
            return Ok(Self::new(Array1::zeros(design.ncols()), target_mean));
        }

        let solution = centered_design.least_squares(&centered_target)?;
        log::trace!(
            "Least-squares fit: rank {} of {} columns",
            solution.rank,
            design.ncols()
        );
        let coefficients = solution.solution;
        let intercept = target_mean - coefficients.dot(&column_means);

        Ok(Self::new(coefficients, intercept))
    }

    /// Predicted value for every row of `rows`.
    pub fn predict(&self, rows: ArrayView2<f64>) -> Array1<f64> {
        rows.dot(&self.coefficients) + self.intercept
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    #[test]
    fn recovers_exact_linear_relationship() {
        let design = array![[1.0, 2.0], [2.0, 0.5], [3.0, 1.0], [4.0, 3.0], [5.0, 2.5]];
        let target = design.dot(&array![1.5, -2.0]) + 0.75;

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert_abs_diff_eq!(model.coefficients()[0], 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(model.coefficients()[1], -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.intercept(), 0.75, epsilon = 1e-9);

        let predictions = model.predict(design.view());
        for (p, t) in predictions.iter().zip(target.iter()) {
            assert_abs_diff_eq!(*p, *t, epsilon = 1e-9);
        }
    }

    #[test]
    fn duplicated_columns_share_weight_evenly() {
        // Two identical columns: the least-norm solution splits the slope.
        let design = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let target = array![2.0, 4.0, 6.0, 8.0];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert_abs_diff_eq!(model.coefficients()[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.coefficients()[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.intercept(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_column_does_not_break_the_fit() {
        let design = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let target = array![1.0, 3.0, 5.0];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert_abs_diff_eq!(model.coefficients()[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.coefficients()[1], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.intercept(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_target_yields_flat_model() {
        let design = array![[0.3, 1.0], [0.1, -2.0], [4.0, 0.0]];
        let target = array![0.25, 0.25, 0.25];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert!(model.coefficients().iter().all(|&c| c == 0.0));
        assert_abs_diff_eq!(model.intercept(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn target_orthogonal_to_the_design_yields_an_exactly_flat_model() {
        // Balanced 2x2 layout with an interaction-only target: no main effect survives.
        let design = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]];
        let target = array![1.25, 1.25, 0.75, 0.75];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert!(model.coefficients().iter().all(|&c| c == 0.0));
        assert_eq!(model.intercept(), 1.0);
        assert_eq!(model.predict(design.view()), array![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn more_columns_than_rows_is_solvable() {
        let design = array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]];
        let target = array![1.0, -1.0];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();
        let predictions = model.predict(design.view());

        assert_abs_diff_eq!(predictions[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(predictions[1], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_column_design_predicts_the_mean() {
        let design = Array2::<f64>::zeros((3, 0));
        let target = array![1.0, 2.0, 6.0];

        let model = LinearRegressor::fit(design.view(), target.view()).unwrap();

        assert_eq!(model.coefficients().len(), 0);
        assert_abs_diff_eq!(model.intercept(), 3.0, epsilon = 1e-12);
        assert_eq!(model.predict(design.view()), array![3.0, 3.0, 3.0]);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let design = Array2::<f64>::zeros((3, 1));
        let target = array![1.0, 2.0];
        let err = LinearRegressor::fit(design.view(), target.view()).unwrap_err();
        assert!(matches!(
            err,
            RegressionError::ShapeMismatch {
                design: 3,
                target: 2
            }
        ));
    }

    #[test]
    fn non_finite_target_is_reported() {
        let design = Array2::<f64>::zeros((2, 1));
        let target = array![1.0, f64::INFINITY];
        let err = LinearRegressor::fit(design.view(), target.view()).unwrap_err();
        assert!(matches!(err, RegressionError::NonFiniteTarget(1)));
    }
}
