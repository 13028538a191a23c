//! Ordinary least squares with Wald inference.
//!
//! ## Purpose
//!
//! This module fits the non-spatial baseline model `y = Xβ + ε` and reports the
//! coefficient table, residuals, goodness of fit and the Gaussian likelihood that
//! the spatial fits are compared against.
//!
//! ## Design notes
//!
//! * **Solver**: Normal equations via QR, with an SVD fallback.
//! * **Variance**: `σ² = e'e / (n − p)` and `Var(β) = σ²(X'X)⁻¹`.
//! * **Likelihood**: Evaluated at the ML variance `e'e / n`, so it is directly
//!   comparable with the spatial fits.
//!
//! ## Invariants
//!
//! * `residuals[i] + fitted[i] == y[i]`.
//! * `n > p`, otherwise the residual variance is undefined.

use std::f64::consts::PI;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::coefficients::CoefficientTable;
use crate::primitives::errors::SpatialError;
use crate::primitives::frame::Design;
use crate::math::linalg::least_squares;

/// A fitted ordinary least squares model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Coefficient estimates and Wald statistics.
    pub coefficients: CoefficientTable,
    /// Observed minus fitted values.
    pub residuals: Vec<f64>,
    /// Fitted values `Xβ`.
    pub fitted: Vec<f64>,
    /// Unbiased residual variance `e'e / (n − p)`.
    pub sigma2: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// R² adjusted for the number of regressors.
    pub adj_r_squared: f64,
    /// Gaussian log-likelihood at the ML variance.
    pub log_likelihood: f64,
    /// Akaike information criterion, counting σ² as a parameter.
    pub aic: f64,
    /// Number of observations.
    pub n: usize,
    /// Number of regressors.
    pub p: usize,
}

impl OlsFit {
    /// Fit `y` on the design matrix.
    pub fn fit(y: &[f64], design: &Design, level: f64) -> Result<Self, SpatialError> {
        let n = design.n();
        let p = design.p();
        check_response(y, n, p)?;

        let yv = DVector::from_column_slice(y);
        let (beta, xtx_inv) = least_squares(&design.matrix, &yv)?;

        let fitted_v = &design.matrix * &beta;
        let resid_v = &yv - &fitted_v;
        let sse = resid_v.norm_squared();
        let sigma2 = sse / (n - p) as f64;

        let variances: Vec<f64> = (0..p).map(|j| sigma2 * xtx_inv[(j, j)]).collect();
        let coefficients = CoefficientTable::from_variances(
            design.names.clone(),
            beta.iter().copied().collect(),
            &variances,
            level,
        )?;

        let (r_squared, adj_r_squared) = r_squared(y, sse, p, has_intercept(design));
        let log_likelihood = gaussian_log_likelihood(n, sse);
        let aic = -2.0 * log_likelihood + 2.0 * (p + 1) as f64;

        debug!(n, p, sigma2, r_squared, "fitted OLS");
        Ok(Self {
            coefficients,
            residuals: resid_v.iter().copied().collect(),
            fitted: fitted_v.iter().copied().collect(),
            sigma2,
            r_squared,
            adj_r_squared,
            log_likelihood,
            aic,
            n,
            p,
        })
    }

    /// Residual sum of squares.
    pub fn sse(&self) -> f64 {
        self.residuals.iter().map(|e| e * e).sum()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Reject a response that does not match the design.
pub(crate) fn check_response(y: &[f64], n: usize, p: usize) -> Result<(), SpatialError> {
    if y.is_empty() || n == 0 {
        return Err(SpatialError::EmptyInput);
    }
    if y.len() != n {
        return Err(SpatialError::MismatchedInputs {
            what: "response length",
            expected: n,
            got: y.len(),
        });
    }
    if n <= p {
        return Err(SpatialError::TooFewPoints { got: n, min: p + 1 });
    }
    if let Some(v) = y.iter().find(|v| !v.is_finite()) {
        return Err(SpatialError::InvalidNumericValue(format!("response value {v}")));
    }
    Ok(())
}

/// Concentrated Gaussian log-likelihood `−n/2 (ln 2π + 1) − n/2 ln(SSE/n)`.
pub(crate) fn gaussian_log_likelihood(n: usize, sse: f64) -> f64 {
    let nf = n as f64;
    -0.5 * nf * ((2.0 * PI).ln() + 1.0) - 0.5 * nf * (sse / nf).ln()
}

fn has_intercept(design: &Design) -> bool {
    (0..design.p()).any(|j| design.matrix.column(j).iter().all(|&v| v == 1.0))
}

fn r_squared(y: &[f64], sse: f64, p: usize, intercept: bool) -> (f64, f64) {
    let n = y.len() as f64;
    let sst = if intercept {
        let mean = y.iter().sum::<f64>() / n;
        y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
    } else {
        y.iter().map(|v| v * v).sum::<f64>()
    };
    if sst <= 0.0 {
        return (f64::NAN, f64::NAN);
    }

    let r2 = 1.0 - sse / sst;
    let df_total = if intercept { n - 1.0 } else { n };
    let adj = 1.0 - (1.0 - r2) * df_total / (n - p as f64);
    (r2, adj)
}
