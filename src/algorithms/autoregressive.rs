//! Shared machinery of the simultaneous autoregressive (SAR) fitters.
//!
//! ## Purpose
//!
//! The spatial error and spatial lag models are both fitted by maximising a
//! likelihood concentrated down to one autoregressive parameter. This module
//! holds what the two have in common: the dense weights matrix with its
//! eigenvalue log-determinant, the fit options, and the likelihood-ratio test
//! against the non-spatial model.
//!
//! ## Design notes
//!
//! * **Log-determinant**: `ln|I − aW|` comes from one eigen decomposition per fit
//!   when the links are symmetric, and from an LU factorisation per trial value otherwise.
//! * **Search interval**: `(1/ω_min, 1/ω_max)` from the real parts of the eigenvalues,
//!   or `(−1/r, 1/r)` with `r` the largest row sum of `W`.
//!
//! ## Invariants
//!
//! * The weights relation and the design have the same number of units.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::algorithms::weights::SpatialWeights;
use crate::math::linalg::{LogDetMethod, LogDeterminant, invert};
use crate::math::normal::{Alternative, chi_squared_sf, critical_value};
use crate::math::optimize::BrentMinimizer;
use crate::primitives::errors::SpatialError;

// ============================================================================
// Options
// ============================================================================

/// Options shared by the maximum likelihood fitters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Confidence level of the Wald intervals.
    pub level: f64,
    /// Bounded minimiser used for the autoregressive parameter.
    pub optimizer: BrentMinimizer,
    /// Evaluation of the log-determinant term.
    pub log_det: LogDetMethod,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            level: 0.95,
            optimizer: BrentMinimizer::default(),
            log_det: LogDetMethod::default(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Likelihood-ratio test of a spatial model against OLS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodRatio {
    /// `2 (ll_spatial − ll_ols)`.
    pub statistic: f64,
    /// Degrees of freedom.
    pub df: usize,
    /// Upper chi-square tail probability.
    pub p_value: f64,
}

impl LikelihoodRatio {
    /// Compare two nested log-likelihoods differing by `df` parameters.
    pub fn new(ll_full: f64, ll_restricted: f64, df: usize) -> Self {
        let statistic = (2.0 * (ll_full - ll_restricted)).max(0.0);
        Self {
            statistic,
            df,
            p_value: chi_squared_sf(statistic, df as f64),
        }
    }
}

/// Scalar autoregressive parameter with Wald statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoregressiveEstimate {
    /// Point estimate.
    pub estimate: f64,
    /// Asymptotic standard error.
    pub std_error: f64,
    /// Wald z value against zero.
    pub z_value: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Lower confidence bound.
    pub ci_lower: f64,
    /// Upper confidence bound.
    pub ci_upper: f64,
}

impl AutoregressiveEstimate {
    pub(crate) fn new(estimate: f64, variance: f64, level: f64) -> Result<Self, SpatialError> {
        if !variance.is_finite() || variance <= 0.0 {
            return Err(SpatialError::DegenerateStatistic(format!(
                "variance of the autoregressive parameter is {variance}"
            )));
        }
        let std_error = variance.sqrt();
        let z_value = estimate / std_error;
        let crit = critical_value(level);
        Ok(Self {
            estimate,
            std_error,
            z_value,
            p_value: Alternative::TwoSided.p_value(z_value),
            ci_lower: estimate - crit * std_error,
            ci_upper: estimate + crit * std_error,
        })
    }
}

/// Optimiser outcome for the autoregressive parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Convergence {
    /// Iterations used by the minimiser.
    pub iterations: usize,
    /// Lower end of the search interval.
    pub lower: f64,
    /// Upper end of the search interval.
    pub upper: f64,
}

// ============================================================================
// Dense Setup
// ============================================================================

/// Dense form of `W` plus its log-determinant evaluator.
#[derive(Debug, Clone)]
pub(crate) struct SarSetup {
    pub(crate) w: DMatrix<f64>,
    pub(crate) logdet: LogDeterminant,
}

impl SarSetup {
    pub(crate) fn new(
        weights: &SpatialWeights,
        n: usize,
        method: LogDetMethod,
    ) -> Result<Self, SpatialError> {
        if weights.n() != n {
            return Err(SpatialError::MismatchedInputs {
                what: "spatial weights units",
                expected: n,
                got: weights.n(),
            });
        }
        let w = weights.to_dense();
        let symmetric = weights.symmetric_similar();
        let logdet = LogDeterminant::new(&w, symmetric.as_ref(), method)?;
        Ok(Self { w, logdet })
    }
}

/// Invert an information matrix into an asymptotic covariance matrix.
pub(crate) fn covariance_from_information(
    info: &DMatrix<f64>,
) -> Result<DMatrix<f64>, SpatialError> {
    invert(info).ok_or_else(|| {
        SpatialError::DegenerateStatistic("information matrix is not invertible".into())
    })
}
