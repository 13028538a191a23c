//! Input validation for simulation and regression configuration.
//!
//! ## Purpose
//!
//! This module checks configuration parameters and input data before any
//! random draw or model fit: sample sizes, neighbour counts, coefficient
//! vectors, interval levels, optimiser settings and coordinate arrays.
//!
//! ## Design notes
//!
//! * **Fail-Fast**: Validation stops at the first error encountered.
//! * **Efficiency**: Checks are ordered from cheap to expensive.
//!
//! ## Invariants
//!
//! * Validation logic is deterministic and side-effect free.
//!
//! ## Non-goals
//!
//! * This module does not transform or repair invalid inputs.

use crate::math::linalg::LogDetMethod;
use crate::primitives::errors::SpatialError;

/// Upper bound on optimiser iterations.
const MAX_ITERATIONS: usize = 10_000;

// ============================================================================
// Validator
// ============================================================================

/// Validation utility for configuration and input data.
///
/// All methods return `Result<(), SpatialError>` and fail fast upon
/// identifying the first violation.
pub struct Validator;

impl Validator {
    // ========================================================================
    // Core Input Validation
    // ========================================================================

    /// Validate flattened 2D coordinates `[x0, y0, x1, y1, ...]`.
    pub fn validate_coordinates(coords: &[f64]) -> Result<usize, SpatialError> {
        // Check 1: Non-empty
        if coords.is_empty() {
            return Err(SpatialError::EmptyInput);
        }

        // Check 2: Complete pairs
        if coords.len() % 2 != 0 {
            return Err(SpatialError::InvalidInput(format!(
                "coordinate array has odd length {}",
                coords.len()
            )));
        }

        // Check 3: Finite values
        for (i, &val) in coords.iter().enumerate() {
            if !val.is_finite() {
                return Err(SpatialError::InvalidNumericValue(format!(
                    "coords[{i}]={val}"
                )));
            }
        }

        Ok(coords.len() / 2)
    }

    /// Validate a single numeric value for finiteness.
    pub fn validate_scalar(val: f64, name: &str) -> Result<(), SpatialError> {
        if !val.is_finite() {
            return Err(SpatialError::InvalidNumericValue(format!("{name}={val}")));
        }
        Ok(())
    }

    // ========================================================================
    // Parameter Validation
    // ========================================================================

    /// Validate the synthetic sample size.
    pub fn validate_sample_size(n: usize) -> Result<(), SpatialError> {
        if n == 0 {
            return Err(SpatialError::InvalidSampleSize(n));
        }
        Ok(())
    }

    /// Validate the neighbour count of a KNN relation over `n` points.
    ///
    /// A point cannot be its own neighbour, so `k` must be in `[1, n)`.
    pub fn validate_neighbor_count(k: usize, n: usize) -> Result<(), SpatialError> {
        if k == 0 || k >= n {
            return Err(SpatialError::InvalidNeighborCount { k, n });
        }
        Ok(())
    }

    /// Validate the true coefficient vector against the covariate count.
    pub fn validate_coefficients(
        coefficients: &[f64],
        n_covariates: usize,
    ) -> Result<(), SpatialError> {
        let expected = n_covariates + 1;
        if coefficients.len() != expected {
            return Err(SpatialError::CoefficientCountMismatch {
                expected,
                got: coefficients.len(),
            });
        }
        for (i, &b) in coefficients.iter().enumerate() {
            Self::validate_scalar(b, &format!("coefficients[{i}]"))?;
        }
        Ok(())
    }

    /// Validate the confidence interval level.
    pub fn validate_interval_level(level: f64) -> Result<(), SpatialError> {
        if !level.is_finite() || level <= 0.0 || level >= 1.0 {
            return Err(SpatialError::InvalidIntervals(level));
        }
        Ok(())
    }

    /// Validate the optimiser tolerance.
    pub fn validate_tolerance(tol: f64) -> Result<(), SpatialError> {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(SpatialError::InvalidTolerance(tol));
        }
        Ok(())
    }

    /// Validate the optimiser iteration cap.
    pub fn validate_iterations(iterations: usize) -> Result<(), SpatialError> {
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return Err(SpatialError::InvalidIterations(iterations));
        }
        Ok(())
    }

    /// Validate the log-determinant method; an eigen decomposition needs a nonzero cap.
    pub fn validate_log_det(method: LogDetMethod) -> Result<(), SpatialError> {
        match method {
            LogDetMethod::Eigen { max_iterations: 0 } => Err(SpatialError::InvalidIterations(0)),
            _ => Ok(()),
        }
    }

    /// Validate the number of Moran's I permutations.
    pub fn validate_permutations(permutations: usize) -> Result<(), SpatialError> {
        if permutations == 0 {
            return Err(SpatialError::InvalidPermutations(permutations));
        }
        Ok(())
    }

    /// Validate that covariate names are unique.
    pub fn validate_unique_names<'a, I>(names: I) -> Result<(), SpatialError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: Vec<&str> = Vec::new();
        for name in names {
            if seen.contains(&name) {
                return Err(SpatialError::DuplicateColumn(name.to_string()));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Validate that no parameters were set multiple times in the builder.
    pub fn validate_no_duplicates(
        duplicate_param: Option<&'static str>,
    ) -> Result<(), SpatialError> {
        if let Some(param) = duplicate_param {
            return Err(SpatialError::DuplicateParameter { parameter: param });
        }
        Ok(())
    }
}
