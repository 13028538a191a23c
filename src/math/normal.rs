//! Normal and chi-square tail probabilities.
//!
//! ## Purpose
//!
//! Wald intervals, Moran's I deviates, and likelihood-ratio tests all reduce to
//! normal or chi-square tail areas. This module provides them on top of the
//! special functions in `statrs`.
//!
//! ## Key concepts
//!
//! * **Φ(z)** = ½·erfc(−z/√2)
//! * **Φ⁻¹(p)** = −√2·erfc⁻¹(2p)
//! * **χ²ₖ survival** = Q(k/2, x/2), the upper regularised gamma function.
//!
//! ## Invariants
//!
//! * All probabilities are clamped to [0, 1].

use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use statrs::function::gamma::gamma_ur;
use std::f64::consts::SQRT_2;

/// Alternative hypothesis for a z-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alternative {
    /// Deviation in either direction.
    #[default]
    TwoSided,
    /// Statistic larger than expected (positive autocorrelation).
    Greater,
    /// Statistic smaller than expected (negative autocorrelation).
    Less,
}

impl Alternative {
    /// Tail probability of a standard-normal deviate under this alternative.
    pub fn p_value(self, z: f64) -> f64 {
        let p = match self {
            Self::TwoSided => erfc(z.abs() / SQRT_2),
            Self::Greater => normal_sf(z),
            Self::Less => normal_cdf(z),
        };
        p.clamp(0.0, 1.0)
    }
}

/// Standard normal CDF.
#[inline]
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal survival function, `1 - Φ(z)` without cancellation.
#[inline]
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Standard normal quantile for `p` in (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Two-sided critical value for a confidence level, e.g. 1.959964 for 0.95.
pub fn critical_value(level: f64) -> f64 {
    normal_quantile(0.5 + level / 2.0)
}

/// Upper tail probability of a chi-square variable with `df` degrees of freedom.
pub fn chi_squared_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    gamma_ur(df / 2.0, x / 2.0).clamp(0.0, 1.0)
}
