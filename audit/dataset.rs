//! # The Audited Population
//!
//! A run operates on three row-aligned tables: the full feature matrix `X`,
//! the sensitive-feature matrix `X_prime` and the binary label vector `y`.
//! They are validated once on construction and never mutated afterwards, so
//! every downstream component can index them without re-checking shapes.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

/// Validation failures for the dataset triple.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error(
        "Row counts do not line up: features has {features} rows, sensitive features has {sensitive} rows, labels has {labels} entries."
    )]
    RowMismatch {
        features: usize,
        sensitive: usize,
        labels: usize,
    },
    #[error("The dataset contains no rows.")]
    Empty,
    #[error("Label at row {row} is {value}, but labels must be exactly 0 or 1.")]
    NonBinaryLabel { row: usize, value: f64 },
    #[error("Non-finite value (NaN or Infinity) found in {table} at row {row}.")]
    NonFinite { table: &'static str, row: usize },
}

/// Row-aligned `(X, X_prime, y)` triple.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    sensitive: Array2<f64>,
    labels: Array1<f64>,
    negatives: Vec<usize>,
}

impl Dataset {
    pub fn new(
        features: Array2<f64>,
        sensitive: Array2<f64>,
        labels: Array1<f64>,
    ) -> Result<Self, DatasetError> {
        if features.nrows() != labels.len() || sensitive.nrows() != labels.len() {
            return Err(DatasetError::RowMismatch {
                features: features.nrows(),
                sensitive: sensitive.nrows(),
                labels: labels.len(),
            });
        }
        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }

        check_finite(features.view(), "features")?;
        check_finite(sensitive.view(), "sensitive features")?;

        for (row, &value) in labels.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(DatasetError::NonBinaryLabel { row, value });
            }
        }

        let negatives = labels
            .iter()
            .enumerate()
            .filter_map(|(i, &label)| (label == 0.0).then_some(i))
            .collect();

        Ok(Self {
            features,
            sensitive,
            labels,
            negatives,
        })
    }

    /// Number of rows `n`.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn sensitive(&self) -> ArrayView2<'_, f64> {
        self.sensitive.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    /// Indices of label-0 rows, in original row order.
    pub fn negative_rows(&self) -> &[usize] {
        &self.negatives
    }

    /// Count of label-0 rows, `m`.
    pub fn negative_count(&self) -> usize {
        self.negatives.len()
    }

    /// The sensitive features restricted to label-0 rows (`X_0`).
    pub fn negative_sensitive(&self) -> Array2<f64> {
        self.sensitive.select(Axis(0), &self.negatives)
    }

    /// Picks the label-0 entries out of a full-length per-row vector.
    pub fn restrict_to_negatives(&self, values: ArrayView1<f64>) -> Array1<f64> {
        self.negatives.iter().map(|&i| values[i]).collect()
    }

    /// True when every label carries the same value.
    pub fn has_single_label(&self) -> bool {
        self.negatives.is_empty() || self.negatives.len() == self.labels.len()
    }
}

fn check_finite(table: ArrayView2<f64>, name: &'static str) -> Result<(), DatasetError> {
    for (row, values) in table.axis_iter(Axis(0)).enumerate() {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DatasetError::NonFinite { table: name, row });
        }
    }
    Ok(())
}
