//! Moran's I for regression residuals.
//!
//! ## Purpose
//!
//! OLS residuals are not independent even under the null: they are `Me` with
//! the residual maker `M = I − X(X'X)⁻¹X'`. This module computes Moran's I for
//! them with the exact regression-adjusted moments.
//!
//! ## Key concepts
//!
//! * **Expectation**: `E[I] = (n/S0) · tr(MW) / (n − p)`.
//! * **Variance**: `(n/S0)² · [tr(MWMW') + tr(MWMW) + tr(MW)²] / ((n − p)(n − p + 2)) − E[I]²`.
//!
//! ## Invariants
//!
//! * The design must have fewer columns than rows.
//! * The statistic is scaled by the full number of units.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::weights::SpatialWeights;
use crate::math::linalg::{invert, trace_of_product};
use crate::math::normal::Alternative;
use crate::primitives::errors::SpatialError;
use crate::primitives::frame::Design;

/// Moran's I of OLS residuals with regression-adjusted moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualMoranTest {
    /// Observed Moran's I of the residuals.
    pub statistic: f64,
    /// Expectation under the null, given the design.
    pub expectation: f64,
    /// Variance under the null, given the design.
    pub variance: f64,
    /// `(I − E[I]) / √Var[I]`.
    pub std_deviate: f64,
    /// p-value under `alternative`.
    pub p_value: f64,
    /// Alternative hypothesis.
    pub alternative: Alternative,
}

impl ResidualMoranTest {
    /// Test OLS `residuals` of a fit on `design` for spatial autocorrelation.
    pub fn compute(
        residuals: &[f64],
        design: &Design,
        weights: &SpatialWeights,
        alternative: Alternative,
    ) -> Result<Self, SpatialError> {
        let n = design.n();
        let p = design.p();
        if residuals.len() != n {
            return Err(SpatialError::MismatchedInputs {
                what: "residual length",
                expected: n,
                got: residuals.len(),
            });
        }
        if weights.n() != n {
            return Err(SpatialError::MismatchedInputs {
                what: "spatial weights units",
                expected: n,
                got: weights.n(),
            });
        }
        if n <= p + 1 {
            return Err(SpatialError::TooFewPoints { got: n, min: p + 2 });
        }

        let consts = weights.constants();
        if consts.s0 <= 0.0 {
            return Err(SpatialError::DegenerateStatistic(
                "weights relation has no links".into(),
            ));
        }

        let e = DVector::from_column_slice(residuals);
        let ee = e.norm_squared();
        if ee <= 0.0 {
            return Err(SpatialError::DegenerateStatistic(
                "residuals are identically zero".into(),
            ));
        }

        let w = weights.to_dense();
        let scale = n as f64 / consts.s0;
        let statistic = scale * e.dot(&(&w * &e)) / ee;

        // Residual maker M = I − X(X'X)⁻¹X'
        let x = &design.matrix;
        let xtx_inv = invert(&x.tr_mul(x))
            .ok_or_else(|| SpatialError::SingularDesign("X'X is not invertible".into()))?;
        let m = DMatrix::<f64>::identity(n, n) - x * xtx_inv * x.transpose();
        let mw = &m * &w;
        let mwt = &m * w.transpose();

        let df = (n - p) as f64;
        let tr_mw = mw.trace();
        let expectation = scale * tr_mw / df;
        let variance = scale * scale
            * (trace_of_product(&mw, &mwt) + trace_of_product(&mw, &mw) + tr_mw * tr_mw)
            / (df * (df + 2.0))
            - expectation * expectation;
        if !variance.is_finite() || variance <= 0.0 {
            return Err(SpatialError::DegenerateStatistic(format!(
                "variance of residual Moran's I is {variance}"
            )));
        }

        let std_deviate = (statistic - expectation) / variance.sqrt();
        let p_value = alternative.p_value(std_deviate);

        debug!(statistic, expectation, variance, p_value, "computed residual Moran's I");
        Ok(Self {
            statistic,
            expectation,
            variance,
            std_deviate,
            p_value,
            alternative,
        })
    }
}
