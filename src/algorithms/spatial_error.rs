//! Spatial error model by maximum likelihood.
//!
//! ## Purpose
//!
//! This module fits `y = Xβ + u`, `u = λWu + ε`, the model whose data-generating
//! process the outcome simulator approximates. The autoregressive parameter λ
//! absorbs the spatial correlation of the errors, so the filtered residuals
//! should no longer be autocorrelated.
//!
//! ## Design notes
//!
//! * **Concentration**: For fixed λ, β and σ² have closed forms from the OLS fit
//!   of `y* = y − λWy` on `X* = X − λWX`, leaving a one-dimensional problem:
//!   `ll(λ) = −n/2 (ln 2π + 1) − n/2 ln(SSE(λ)/n) + ln|I − λW|`.
//! * **Search**: Brent's method over the eigenvalue interval of `W`.
//! * **Inference**: `Var(β) = σ²(X*'X*)⁻¹`. `Var(λ)` comes from the inverse
//!   information matrix of (λ, σ²) with `B = W(I − λW)⁻¹`:
//!
//! ```text
//! | tr(BB) + tr(B'B)   tr(B)/σ²   |
//! | tr(B)/σ²           n/(2σ⁴)    |
//! ```
//!
//! ## Invariants
//!
//! * λ lies strictly inside the stationary interval.
//! * The reported likelihood is finite; otherwise the fit fails with `NonConvergence`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::autoregressive::{
    AutoregressiveEstimate, Convergence, FitOptions, LikelihoodRatio, SarSetup,
    covariance_from_information,
};
use crate::algorithms::coefficients::CoefficientTable;
use crate::algorithms::ols::{check_response, gaussian_log_likelihood};
use crate::algorithms::weights::SpatialWeights;
use crate::math::linalg::{filtered_weights, least_squares, trace_of_gram, trace_of_product};
use crate::primitives::errors::SpatialError;
use crate::primitives::frame::Design;

const MODEL: &str = "spatial error";

/// A fitted spatial error model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialErrorFit {
    /// Regression coefficients with Wald statistics.
    pub coefficients: CoefficientTable,
    /// Spatial error parameter λ.
    pub lambda: AutoregressiveEstimate,
    /// `y − Xβ`, still spatially correlated.
    pub residuals: Vec<f64>,
    /// `(I − λW)(y − Xβ)`, the estimated innovations ε.
    pub filtered_residuals: Vec<f64>,
    /// `Xβ`.
    pub fitted: Vec<f64>,
    /// ML innovation variance `SSE/n`.
    pub sigma2: f64,
    /// Maximised log-likelihood.
    pub log_likelihood: f64,
    /// Akaike information criterion (β, λ and σ² counted).
    pub aic: f64,
    /// Likelihood-ratio test against OLS.
    pub lr_test: LikelihoodRatio,
    /// Optimiser information.
    pub convergence: Convergence,
}

struct Filtered {
    beta: DVector<f64>,
    xtx_inv: DMatrix<f64>,
    sse: f64,
}

impl SpatialErrorFit {
    /// Fit the model by concentrated maximum likelihood.
    pub fn fit(
        y: &[f64],
        design: &Design,
        weights: &SpatialWeights,
        options: &FitOptions,
    ) -> Result<Self, SpatialError> {
        let n = design.n();
        let p = design.p();
        check_response(y, n, p)?;
        let setup = SarSetup::new(weights, n, options.log_det)?;

        let x = &design.matrix;
        let yv = DVector::from_column_slice(y);
        let wy = &setup.w * &yv;
        let wx = &setup.w * x;

        let filtered = |lambda: f64| -> Result<Filtered, SpatialError> {
            let ys = &yv - &wy * lambda;
            let xs = x - &wx * lambda;
            let (beta, xtx_inv) = least_squares(&xs, &ys)?;
            let sse = (&ys - &xs * &beta).norm_squared();
            Ok(Filtered {
                beta,
                xtx_inv,
                sse,
            })
        };
        let log_likelihood = |lambda: f64, sse: f64| {
            gaussian_log_likelihood(n, sse) + setup.logdet.eval(lambda)
        };

        let (lower, upper) = setup.logdet.bounds();
        let minimum = options.optimizer.minimize(
            |lambda| match filtered(lambda) {
                Ok(f) => -log_likelihood(lambda, f.sse),
                Err(_) => f64::INFINITY,
            },
            lower,
            upper,
            MODEL,
        )?;

        let lambda = minimum.x;
        let best = filtered(lambda)?;
        let ll = log_likelihood(lambda, best.sse);
        if !ll.is_finite() {
            return Err(SpatialError::NonConvergence {
                model: MODEL,
                iterations: minimum.iterations,
            });
        }
        let sigma2 = best.sse / n as f64;

        // Regression coefficients
        let variances: Vec<f64> = (0..p).map(|j| sigma2 * best.xtx_inv[(j, j)]).collect();
        let coefficients = CoefficientTable::from_variances(
            design.names.clone(),
            best.beta.iter().copied().collect(),
            &variances,
            options.level,
        )?;

        // Information matrix of (λ, σ²)
        let b = filtered_weights(&setup.w, lambda)?;
        let tr_b = setup.logdet.trace_filtered(lambda)?;
        let info = DMatrix::from_row_slice(
            2,
            2,
            &[
                trace_of_product(&b, &b) + trace_of_gram(&b),
                tr_b / sigma2,
                tr_b / sigma2,
                n as f64 / (2.0 * sigma2 * sigma2),
            ],
        );
        let cov = covariance_from_information(&info)?;
        let lambda_est = AutoregressiveEstimate::new(lambda, cov[(0, 0)], options.level)?;

        let fitted_v = x * &best.beta;
        let resid_v = &yv - &fitted_v;
        let filtered_v = &resid_v - (&setup.w * &resid_v) * lambda;

        let ll_ols = gaussian_log_likelihood(n, filtered(0.0)?.sse);
        let lr_test = LikelihoodRatio::new(ll, ll_ols, 1);

        debug!(
            lambda,
            std_error = lambda_est.std_error,
            log_likelihood = ll,
            iterations = minimum.iterations,
            "fitted spatial error model"
        );

        Ok(Self {
            coefficients,
            lambda: lambda_est,
            residuals: resid_v.iter().copied().collect(),
            filtered_residuals: filtered_v.iter().copied().collect(),
            fitted: fitted_v.iter().copied().collect(),
            sigma2,
            log_likelihood: ll,
            aic: -2.0 * ll + 2.0 * (p + 2) as f64,
            lr_test,
            convergence: Convergence {
                iterations: minimum.iterations,
                lower,
                upper,
            },
        })
    }
}
