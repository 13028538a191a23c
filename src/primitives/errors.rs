//! Error types for spatial regression operations.
//!
//! ## Purpose
//!
//! This module defines every error condition that can occur while generating
//! synthetic data, building spatial weights, fitting models, or computing
//! autocorrelation tests.
//!
//! ## Design notes
//!
//! * **Contextual**: Errors carry the offending values (actual vs. expected lengths, bad indices).
//! * **Deferred**: Builder errors are stored during configuration and surfaced by `build()`.
//! * **Distinct failure kinds**: Invalid input, degenerate weights, and non-convergence are
//!   separate variants so callers can tell "rejected" from "fitted badly".
//!
//! ## Invariants
//!
//! * All variants provide sufficient context for diagnosis.
//! * Numeric values in errors are reported as `f64`.
//!
//! ## Non-goals
//!
//! * This module does not perform the validation logic itself.
//! * This module does not provide error recovery or fallback strategies.

use thiserror::Error;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for spatial regression operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    /// Input arrays are empty.
    #[error("Input arrays are empty")]
    EmptyInput,

    /// Generic invalid input error with a descriptive message.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two inputs that must describe the same units have different lengths.
    #[error("Length mismatch: expected {expected} values for {what}, got {got}")]
    MismatchedInputs {
        /// Description of the mismatched input.
        what: &'static str,
        /// Expected number of values.
        expected: usize,
        /// Number of values provided.
        got: usize,
    },

    /// Input data contains NaN or infinite values.
    #[error("Invalid numeric value: {0}")]
    InvalidNumericValue(String),

    /// Number of observations is below the minimum requirement.
    #[error("Too few points: got {got}, need at least {min}")]
    TooFewPoints {
        /// Number of points provided.
        got: usize,
        /// Minimum required points.
        min: usize,
    },

    /// Sample size must be at least 1.
    #[error("Invalid sample size: {0} (must be at least 1)")]
    InvalidSampleSize(usize),

    /// A distribution parameter is out of range.
    #[error("Invalid distribution for '{name}': {reason}")]
    InvalidDistribution {
        /// Name of the covariate or noise term.
        name: String,
        /// Why the parameters were rejected.
        reason: String,
    },

    /// Coordinate extent is empty, inverted, or not finite.
    #[error("Invalid extent: [{x_min}, {x_max}] x [{y_min}, {y_max}]")]
    InvalidExtent {
        /// Lower x bound.
        x_min: f64,
        /// Upper x bound.
        x_max: f64,
        /// Lower y bound.
        y_min: f64,
        /// Upper y bound.
        y_max: f64,
    },

    /// Neighbour count must satisfy 1 <= k < n.
    #[error("Invalid neighbor count: k={k} for {n} points (must be in [1, {n}))")]
    InvalidNeighborCount {
        /// Requested number of neighbours.
        k: usize,
        /// Number of points.
        n: usize,
    },

    /// Number of true coefficients does not match the covariates plus intercept.
    #[error("Coefficient count mismatch: expected {expected} (intercept + covariates), got {got}")]
    CoefficientCountMismatch {
        /// Expected coefficient count.
        expected: usize,
        /// Provided coefficient count.
        got: usize,
    },

    /// A named column was not found in the model frame.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// A column with the same name already exists in the model frame.
    #[error("Duplicate column: '{0}'")]
    DuplicateColumn(String),

    /// Some units have no neighbours and the isolate policy rejects them.
    #[error("{count} isolated unit(s) without neighbors (first: {first})")]
    IsolatedUnits {
        /// Number of isolated units.
        count: usize,
        /// Index of the first isolated unit.
        first: usize,
    },

    /// A neighbour list references an index outside the unit range.
    #[error("Invalid neighbor index: unit {unit} lists {neighbor}, but only {n} units exist")]
    InvalidNeighborIndex {
        /// Unit whose list is invalid.
        unit: usize,
        /// Out-of-range neighbour index.
        neighbor: usize,
        /// Number of units.
        n: usize,
    },

    /// A unit lists itself as a neighbour.
    #[error("Unit {0} lists itself as a neighbor")]
    SelfNeighbor(usize),

    /// The design matrix is rank deficient.
    #[error("Singular design matrix: {0}")]
    SingularDesign(String),

    /// A statistic cannot be computed for the given input (e.g., zero variance).
    #[error("Degenerate statistic: {0}")]
    DegenerateStatistic(String),

    /// Maximum-likelihood optimisation did not converge.
    #[error("{model} fit did not converge after {iterations} iterations")]
    NonConvergence {
        /// Name of the model being fitted.
        model: &'static str,
        /// Iterations performed before giving up.
        iterations: usize,
    },

    /// Interval coverage level must be strictly between 0 and 1.
    #[error("Invalid interval level: {0} (must be > 0 and < 1)")]
    InvalidIntervals(f64),

    /// Convergence tolerance must be positive and finite.
    #[error("Invalid tolerance: {0} (must be > 0 and finite)")]
    InvalidTolerance(f64),

    /// Iteration cap is outside the supported range.
    #[error("Invalid iterations: {0} (must be in [1, 10000])")]
    InvalidIterations(usize),

    /// Number of permutations for the Monte-Carlo test is zero.
    #[error("Invalid permutations: {0} (must be at least 1)")]
    InvalidPermutations(usize),

    /// Parameter was set multiple times in the builder.
    #[error(
        "Parameter '{parameter}' was set multiple times. Each parameter can only be configured once."
    )]
    DuplicateParameter {
        /// Name of the parameter that was set multiple times.
        parameter: &'static str,
    },
}
