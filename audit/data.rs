//! # Dataset Registry and Loading
//!
//! The fairness core only ever sees a validated [`Dataset`]. This module is the
//! collaborator that produces one from a file on disk. Which preparation applies
//! is decided once, at configuration time, through [`DatasetKind`]; there is no
//! lookup by name at run time.
//!
//! - `communities`: the Communities and Crime table. Missing values become 0,
//!   the first 122 columns are the features, the racial-composition and
//!   foreign-born columns are the sensitive features, and the label marks
//!   neighbourhoods above the 70th percentile of violent crime.
//! - `prepared`: any comma-separated table that is already fully numeric, with a
//!   `label` column in {0, 1}. The first `num_sensitive` feature columns are the
//!   sensitive ones.
//!
//! Categorical encoding is not done here: every column must already be numeric.

use crate::dataset::{Dataset, DatasetError};
use ndarray::{Array1, Array2, ShapeBuilder};
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Column positions of the sensitive attributes in the Communities table.
const COMMUNITIES_SENSITIVE: [usize; 18] = [
    3, 4, 5, 6, 22, 23, 24, 25, 26, 27, 61, 62, 92, 105, 106, 107, 108, 109,
];
const COMMUNITIES_FEATURES: usize = 122;
const COMMUNITIES_LABEL: &str = "ViolentCrimesPerPop";
const COMMUNITIES_LABEL_PERCENTILE: f64 = 70.0;
const PREPARED_LABEL: &str = "label";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Unknown dataset '{0}'. Expected one of: communities, prepared.")]
    UnknownDataset(String),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' could not be converted to f64. It contains non-numeric data. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in column '{0}'. Prepared datasets must be complete."
    )]
    MissingValuesFound(String),
    #[error("Expected at least {required} columns but the file has {found}.")]
    InsufficientColumns { found: usize, required: usize },
    #[error("Requested {requested} sensitive columns but only {available} are available.")]
    TooManySensitive { requested: usize, available: usize },
    #[error("Failed to assemble the feature matrix: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("Loaded data failed validation: {0}")]
    Invalid(#[from] DatasetError),
}

/// The datasets the loader knows how to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Communities,
    Prepared,
}

impl FromStr for DatasetKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "communities" => Ok(Self::Communities),
            "prepared" => Ok(Self::Prepared),
            other => Err(DataError::UnknownDataset(other.to_string())),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Communities => write!(f, "communities"),
            Self::Prepared => write!(f, "prepared"),
        }
    }
}

impl DatasetKind {
    /// Reads `path` and prepares it into the `(X, X_prime, y)` triple.
    pub fn load(self, path: &str, num_sensitive: usize) -> Result<Dataset, DataError> {
        log::info!("Loading {} dataset from '{}'", self, path);
        let df = internal::read_csv(path)?;
        let dataset = match self {
            Self::Communities => internal::prepare_communities(&df, num_sensitive)?,
            Self::Prepared => internal::prepare_numeric(&df, num_sensitive)?,
        };
        log::info!(
            "Loaded {} rows, {} features, {} sensitive features, {} label-0 rows",
            dataset.len(),
            dataset.features().ncols(),
            dataset.sensitive().ncols(),
            dataset.negative_count()
        );
        Ok(dataset)
    }
}

/// Linear-interpolation percentile of `values`, `p` in `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

mod internal {
    use super::*;

    pub(super) fn read_csv(path: &str) -> Result<DataFrame, DataError> {
        let df = CsvReader::new(File::open(Path::new(path))?)
            .with_options(
                CsvReadOptions::default()
                    .with_has_header(true)
                    .with_parse_options(CsvParseOptions::default().with_separator(b',')),
            )
            .finish()?;
        Ok(df)
    }

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Reads one column as f64. Nulls become 0 when `fill_nulls` is set and are an error otherwise.
    fn extract_numeric_column(
        df: &DataFrame,
        column_name: &str,
        fill_nulls: bool,
    ) -> Result<Vec<f64>, DataError> {
        let series = df
            .column(column_name)
            .map_err(|_| DataError::ColumnNotFound(column_name.to_string()))?;
        let original_nulls = series.null_count();
        if !fill_nulls && original_nulls > 0 {
            return Err(DataError::MissingValuesFound(column_name.to_string()));
        }

        let casted = match series.cast(&DataType::Float64) {
            Ok(casted) => casted,
            Err(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: column_name.to_string(),
                    found_type: format!("{:?}", series.dtype()),
                });
            }
        };

        // Unparseable entries come back as new nulls after the cast. Only nulls
        // present in the file are eligible for filling.
        if casted.null_count() > original_nulls {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                found_type: format!("{:?}", series.dtype()),
            });
        }

        let values: Vec<f64> = casted
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        Ok(values)
    }

    /// Stacks the named columns into an `n x k` matrix.
    fn stack_columns(
        df: &DataFrame,
        names: &[String],
        fill_nulls: bool,
    ) -> Result<Array2<f64>, DataError> {
        let n = df.height();
        let mut buffer = Vec::with_capacity(n * names.len());
        for name in names {
            let mut column = extract_numeric_column(df, name, fill_nulls)?;
            buffer.append(&mut column);
        }
        Ok(Array2::from_shape_vec((n, names.len()).f(), buffer)?)
    }

    pub(super) fn prepare_communities(
        df: &DataFrame,
        num_sensitive: usize,
    ) -> Result<Dataset, DataError> {
        let names = column_names(df);
        if names.len() < COMMUNITIES_FEATURES {
            return Err(DataError::InsufficientColumns {
                found: names.len(),
                required: COMMUNITIES_FEATURES,
            });
        }
        if num_sensitive > COMMUNITIES_SENSITIVE.len() {
            return Err(DataError::TooManySensitive {
                requested: num_sensitive,
                available: COMMUNITIES_SENSITIVE.len(),
            });
        }
        if !names.iter().any(|c| c == COMMUNITIES_LABEL) {
            return Err(DataError::ColumnNotFound(COMMUNITIES_LABEL.to_string()));
        }

        let feature_names = &names[..COMMUNITIES_FEATURES];
        let sensitive_names: Vec<String> = COMMUNITIES_SENSITIVE[..num_sensitive]
            .iter()
            .map(|&i| names[i].clone())
            .collect();

        let features = stack_columns(df, feature_names, true)?;
        let sensitive = stack_columns(df, &sensitive_names, true)?;

        let crime = extract_numeric_column(df, COMMUNITIES_LABEL, true)?;
        let threshold = percentile(&crime, COMMUNITIES_LABEL_PERCENTILE);
        let labels: Array1<f64> = crime
            .iter()
            .map(|&s| if s > threshold { 1.0 } else { 0.0 })
            .collect();

        Ok(Dataset::new(features, sensitive, labels)?)
    }

    pub(super) fn prepare_numeric(
        df: &DataFrame,
        num_sensitive: usize,
    ) -> Result<Dataset, DataError> {
        let names = column_names(df);
        if !names.iter().any(|c| c == PREPARED_LABEL) {
            return Err(DataError::ColumnNotFound(PREPARED_LABEL.to_string()));
        }

        let feature_names: Vec<String> =
            names.into_iter().filter(|c| c != PREPARED_LABEL).collect();
        if num_sensitive > feature_names.len() {
            return Err(DataError::TooManySensitive {
                requested: num_sensitive,
                available: feature_names.len(),
            });
        }

        let features = stack_columns(df, &feature_names, false)?;
        let sensitive = stack_columns(df, &feature_names[..num_sensitive], false)?;
        let labels = Array1::from_vec(extract_numeric_column(df, PREPARED_LABEL, false)?);

        Ok(Dataset::new(features, sensitive, labels)?)
    }
}
