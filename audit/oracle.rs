//! Linear threshold oracles.
//!
//! Two shapes of 0/1 predicate exist. A [`RandomThreshold`] is a fixed random
//! hyperplane over the sensitive features, used by the auditor as its candidate
//! group. A [`RegressionOracle`] holds two fitted regressors that predict the
//! cost of answering 0 and the cost of answering 1; it fires when answering 1
//! is strictly cheaper. The same structure is the primal player's classifier
//! and the fitted auditor's group predicate; only the training costs differ.

use crate::regression::{LinearRegressor, RegressionError};
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use rand::Rng;

/// A deterministic 0/1 decision per row.
pub trait ThresholdOracle {
    /// Returns 1.0 for every row the predicate fires on and 0.0 elsewhere.
    fn predict(&self, rows: ArrayView2<f64>) -> Array1<f64>;
}

/// `predict(row) = 1` iff `sign * (coefficients . row) > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomThreshold {
    coefficients: Array1<f64>,
    sign: f64,
}

impl RandomThreshold {
    pub fn new(coefficients: Array1<f64>, sign: f64) -> Self {
        Self {
            coefficients,
            sign: if sign < 0.0 { -1.0 } else { 1.0 },
        }
    }

    /// Draws coefficients uniformly from `[-1, 1)` and a fair random sign.
    pub fn sample<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self {
        let coefficients: Array1<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        Self::new(coefficients, sign)
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn sign(&self) -> f64 {
        self.sign
    }
}

impl ThresholdOracle for RandomThreshold {
    fn predict(&self, rows: ArrayView2<f64>) -> Array1<f64> {
        rows.dot(&self.coefficients)
            .mapv(|score| if self.sign * score > 0.0 { 1.0 } else { 0.0 })
    }
}

/// Cost-sensitive classifier: answers the label with the smaller predicted cost.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionOracle {
    cost0: LinearRegressor,
    cost1: LinearRegressor,
}

/// Members of the mixture are cost-sensitive classifiers.
pub type Classifier = RegressionOracle;

impl RegressionOracle {
    pub fn new(cost0: LinearRegressor, cost1: LinearRegressor) -> Self {
        Self { cost0, cost1 }
    }

    /// Fits one regressor per cost vector; the two fits are independent and run in parallel.
    pub fn fit(
        design: ArrayView2<f64>,
        cost0: ArrayView1<f64>,
        cost1: ArrayView1<f64>,
    ) -> Result<Self, RegressionError> {
        let (fit0, fit1) = rayon::join(
            || LinearRegressor::fit(design, cost0),
            || LinearRegressor::fit(design, cost1),
        );
        Ok(Self::new(fit0?, fit1?))
    }

    pub fn cost0(&self) -> &LinearRegressor {
        &self.cost0
    }

    pub fn cost1(&self) -> &LinearRegressor {
        &self.cost1
    }

    /// `b0 - b1`: positive weight pushes a row towards answering 1.
    pub fn coefficient_gap(&self) -> Array1<f64> {
        &self.cost0.coefficients() - &self.cost1.coefficients()
    }
}

impl ThresholdOracle for RegressionOracle {
    fn predict(&self, rows: ArrayView2<f64>) -> Array1<f64> {
        let predicted0 = self.cost0.predict(rows);
        let predicted1 = self.cost1.predict(rows);
        Zip::from(&predicted0)
            .and(&predicted1)
            .map_collect(|&c0, &c1| if c0 - c1 > 0.0 { 1.0 } else { 0.0 })
    }
}

/// A discovered subgroup of the sensitive-feature space.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupPredicate {
    Random(RandomThreshold),
    Fitted(RegressionOracle),
}

impl GroupPredicate {
    /// Hyperplane weights describing the group, for diagnostics.
    pub fn coefficients(&self) -> Array1<f64> {
        match self {
            Self::Random(threshold) => &threshold.coefficients * threshold.sign,
            Self::Fitted(oracle) => oracle.coefficient_gap(),
        }
    }
}

impl ThresholdOracle for GroupPredicate {
    fn predict(&self, rows: ArrayView2<f64>) -> Array1<f64> {
        match self {
            Self::Random(threshold) => threshold.predict(rows),
            Self::Fitted(oracle) => oracle.predict(rows),
        }
    }
}
