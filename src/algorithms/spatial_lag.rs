//! Spatial lag model by maximum likelihood.
//!
//! ## Purpose
//!
//! This module fits `y = ρWy + Xβ + ε`, where the outcome itself spills over
//! between neighbours. It complements the spatial error model when the
//! autocorrelation is substantive rather than a nuisance in the errors.
//!
//! ## Design notes
//!
//! * **Concentration**: With `b₀ = (X'X)⁻¹X'y` and `b_L = (X'X)⁻¹X'Wy`, the
//!   residuals at ρ are `e₀ − ρe_L`, so each likelihood evaluation is O(n).
//! * **Inference**: The full asymptotic covariance of (β, ρ, σ²) with
//!   `A = W(I − ρW)⁻¹`:
//!
//! ```text
//! I_ββ = X'X/σ²          I_βρ = X'(AXβ)/σ²      I_βσ = 0
//! I_ρρ = tr(AA) + tr(A'A) + (AXβ)'(AXβ)/σ²      I_ρσ = tr(A)/σ²
//! I_σσ = n/(2σ⁴)
//! ```

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

const MODEL: &str = "spatial lag";

/// A fitted spatial lag model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialLagFit {
    /// Regression coefficients with Wald statistics.
    pub coefficients: CoefficientTable,
    /// Spatial lag parameter ρ.
    pub rho: AutoregressiveEstimate,
    /// `y − ρWy − Xβ`.
    pub residuals: Vec<f64>,
    /// `y − residuals`.
    pub fitted: Vec<f64>,
    /// ML innovation variance `SSE/n`.
    pub sigma2: f64,
    /// Maximised log-likelihood.
    pub log_likelihood: f64,
    /// Akaike information criterion (β, ρ and σ² counted).
    pub aic: f64,
    /// Likelihood-ratio test against OLS.
    pub lr_test: LikelihoodRatio,
    /// Optimiser information.
    pub convergence: Convergence,
}

impl SpatialLagFit {
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

        let (b0, xtx_inv) = least_squares(x, &yv)?;
        let bl = &xtx_inv * x.tr_mul(&wy);
        let e0 = &yv - x * &b0;
        let el = &wy - x * &bl;

        let sse = |rho: f64| (&e0 - &el * rho).norm_squared();
        let log_likelihood =
            |rho: f64| gaussian_log_likelihood(n, sse(rho)) + setup.logdet.eval(rho);

        let (lower, upper) = setup.logdet.bounds();
        let minimum =
            options
                .optimizer
                .minimize(|rho| -log_likelihood(rho), lower, upper, MODEL)?;

        let rho = minimum.x;
        let ll = log_likelihood(rho);
        if !ll.is_finite() {
            return Err(SpatialError::NonConvergence {
                model: MODEL,
                iterations: minimum.iterations,
            });
        }

        let beta = &b0 - &bl * rho;
        let resid_v = &e0 - &el * rho;
        let sigma2 = resid_v.norm_squared() / n as f64;
        let fitted_v = &yv - &resid_v;

        // Information matrix, ordered (β, ρ, σ²)
        let a = filtered_weights(&setup.w, rho)?;
        let axb = &a * (x * &beta);
        let xt_axb = x.tr_mul(&axb) / sigma2;
        let xtx = x.tr_mul(x) / sigma2;
        let tr_a = setup.logdet.trace_filtered(rho)?;

        let dim = p + 2;
        let mut info = DMatrix::<f64>::zeros(dim, dim);
        info.view_mut((0, 0), (p, p)).copy_from(&xtx);
        for j in 0..p {
            info[(j, p)] = xt_axb[j];
            info[(p, j)] = xt_axb[j];
        }
        info[(p, p)] =
            trace_of_product(&a, &a) + trace_of_gram(&a) + axb.norm_squared() / sigma2;
        info[(p, p + 1)] = tr_a / sigma2;
        info[(p + 1, p)] = tr_a / sigma2;
        info[(p + 1, p + 1)] = n as f64 / (2.0 * sigma2 * sigma2);

        let cov = covariance_from_information(&info)?;
        let variances: Vec<f64> = (0..p).map(|j| cov[(j, j)]).collect();
        let coefficients = CoefficientTable::from_variances(
            design.names.clone(),
            beta.iter().copied().collect(),
            &variances,
            options.level,
        )?;
        let rho_est = AutoregressiveEstimate::new(rho, cov[(p, p)], options.level)?;

        let lr_test = LikelihoodRatio::new(ll, gaussian_log_likelihood(n, sse(0.0)), 1);

        debug!(
            rho,
            std_error = rho_est.std_error,
            log_likelihood = ll,
            iterations = minimum.iterations,
            "fitted spatial lag model"
        );

        Ok(Self {
            coefficients,
            rho: rho_est,
            residuals: resid_v.iter().copied().collect(),
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
