//! Named numeric columns and design matrices.
//!
//! ## Purpose
//!
//! `ModelFrame` is the tabular input of every regression: one row per spatial
//! unit, one named `f64` column per variable. It also assembles the design
//! matrix (optionally with an intercept) that the model fitters consume.
//!
//! ## Design notes
//!
//! * **Column-major**: Columns are stored as separate vectors, which matches how
//!   covariates are generated and how residual columns are appended later.
//! * **Fixed height**: The row count is fixed at construction; every added
//!   column must match it.
//!
//! ## Invariants
//!
//! * All columns have exactly `n_rows` values.
//! * Column names are unique.
//!
//! ## Non-goals
//!
//! * This module does not handle missing values or non-numeric columns.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::primitives::errors::SpatialError;

/// Name of the residual column appended after model fitting.
pub const RESIDUALS_COLUMN: &str = "residuals";

/// Name of the spatially lagged residual column appended after model fitting.
pub const LAG_RESIDUALS_COLUMN: &str = "lag_residuals";

/// Name of the intercept column in design matrices.
pub const INTERCEPT: &str = "(Intercept)";

// ============================================================================
// ModelFrame
// ============================================================================

/// A table of named numeric columns, one row per spatial unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "FrameColumns", try_from = "FrameColumns")]
pub struct ModelFrame {
    n_rows: usize,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

/// Serialized form of [`ModelFrame`]; deserialization goes through `add_column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameColumns {
    /// Row count.
    pub n_rows: usize,
    /// Column names.
    pub names: Vec<String>,
    /// Column values, aligned with `names`.
    pub columns: Vec<Vec<f64>>,
}

impl From<ModelFrame> for FrameColumns {
    fn from(frame: ModelFrame) -> Self {
        Self {
            n_rows: frame.n_rows,
            names: frame.names,
            columns: frame.columns,
        }
    }
}

impl TryFrom<FrameColumns> for ModelFrame {
    type Error = SpatialError;

    fn try_from(data: FrameColumns) -> Result<Self, Self::Error> {
        if data.names.len() != data.columns.len() {
            return Err(SpatialError::MismatchedInputs {
                what: "column names",
                expected: data.columns.len(),
                got: data.names.len(),
            });
        }
        let mut frame = Self::new(data.n_rows);
        for (name, values) in data.names.into_iter().zip(data.columns) {
            frame.add_column(name, values)?;
        }
        Ok(frame)
    }
}

impl ModelFrame {
    /// Create an empty frame with a fixed number of rows.
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Build a frame from `(name, values)` pairs; the first column fixes the row count.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, SpatialError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut iter = columns.into_iter().peekable();
        let n_rows = match iter.peek() {
            Some((_, values)) => values.len(),
            None => return Err(SpatialError::EmptyInput),
        };

        let mut frame = Self::new(n_rows);
        for (name, values) in iter {
            frame.add_column(name, values)?;
        }
        Ok(frame)
    }

    /// Number of rows (spatial units).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Borrow a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64], SpatialError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| SpatialError::UnknownColumn(name.to_string()))
    }

    /// Append a column. Fails on a duplicate name, a length mismatch, or non-finite values.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), SpatialError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(SpatialError::DuplicateColumn(name));
        }
        if values.len() != self.n_rows {
            return Err(SpatialError::MismatchedInputs {
                what: "column",
                expected: self.n_rows,
                got: values.len(),
            });
        }
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SpatialError::InvalidNumericValue(format!("{name}[{i}]={v}")));
        }

        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Values of every column for a single row.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }

    /// Append the model residuals and their spatial lag as two derived columns.
    pub fn append_residual_columns(
        &mut self,
        residuals: Vec<f64>,
        lagged: Vec<f64>,
    ) -> Result<(), SpatialError> {
        self.add_column(RESIDUALS_COLUMN, residuals)?;
        self.add_column(LAG_RESIDUALS_COLUMN, lagged)
    }

    /// Assemble the design matrix for the named predictors.
    ///
    /// With `intercept`, a leading column of ones named `(Intercept)` is added.
    pub fn design_matrix<S: AsRef<str>>(
        &self,
        predictors: &[S],
        intercept: bool,
    ) -> Result<Design, SpatialError> {
        let mut names = Vec::with_capacity(predictors.len() + usize::from(intercept));
        let mut cols: Vec<&[f64]> = Vec::with_capacity(predictors.len());

        if intercept {
            names.push(INTERCEPT.to_string());
        }
        for p in predictors {
            let name = p.as_ref();
            if names.iter().any(|n| n == name) {
                return Err(SpatialError::DuplicateColumn(name.to_string()));
            }
            cols.push(self.column(name)?);
            names.push(name.to_string());
        }

        let n = self.n_rows;
        let p = names.len();
        let offset = usize::from(intercept);
        let matrix = DMatrix::from_fn(n, p, |i, j| {
            if j < offset { 1.0 } else { cols[j - offset][i] }
        });

        Ok(Design { names, matrix })
    }
}

// ============================================================================
// Design Matrix
// ============================================================================

/// Regression design matrix with column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    /// Column names, intercept first when present.
    pub names: Vec<String>,
    /// n x p matrix of regressors.
    pub matrix: DMatrix<f64>,
}

impl Design {
    /// Build a design from a raw matrix and names.
    pub fn new(names: Vec<String>, matrix: DMatrix<f64>) -> Result<Self, SpatialError> {
        if names.len() != matrix.ncols() {
            return Err(SpatialError::MismatchedInputs {
                what: "design column names",
                expected: matrix.ncols(),
                got: names.len(),
            });
        }
        Ok(Self { names, matrix })
    }

    /// Number of observations.
    #[inline]
    pub fn n(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of regressors.
    #[inline]
    pub fn p(&self) -> usize {
        self.matrix.ncols()
    }
}
