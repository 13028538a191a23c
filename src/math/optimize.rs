//! Bounded one-dimensional minimisation (Brent's method).
//!
//! ## Purpose
//!
//! The spatial error and spatial lag likelihoods are concentrated down to a
//! single autoregressive parameter. This module finds its optimum on a bounded
//! interval with Brent's combination of golden-section search and successive
//! parabolic interpolation.
//!
//! ## Design notes
//!
//! * **Derivative-free**: Only function values are required.
//! * **Explicit failure**: Hitting the iteration cap, or ending on a non-finite
//!   objective, is an error rather than a best-effort answer.
//! * **Non-finite objectives**: NaN is treated as +∞ so it is never accepted.
//!
//! ## Invariants
//!
//! * The returned abscissa lies within `[lower, upper]`.

use tracing::trace;

use crate::primitives::errors::SpatialError;

/// Golden-section ratio `(3 - √5) / 2`.
const GOLDEN: f64 = 0.381_966_011_250_105_1;

/// Outcome of a successful minimisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    /// Location of the minimum.
    pub x: f64,
    /// Objective value at the minimum.
    pub fx: f64,
    /// Number of objective evaluations after the initial one.
    pub iterations: usize,
}

/// Brent minimiser configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentMinimizer {
    /// Absolute tolerance on the abscissa.
    pub tolerance: f64,
    /// Maximum number of iterations before reporting non-convergence.
    pub max_iterations: usize,
}

impl Default for BrentMinimizer {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 200,
        }
    }
}

impl BrentMinimizer {
    /// Minimise `f` on `[lower, upper]`.
    ///
    /// `label` names the model in the `NonConvergence` error.
    pub fn minimize<F>(
        &self,
        mut f: F,
        lower: f64,
        upper: f64,
        label: &'static str,
    ) -> Result<Minimum, SpatialError>
    where
        F: FnMut(f64) -> f64,
    {
        if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
            return Err(SpatialError::InvalidInput(format!(
                "search interval [{lower}, {upper}] is empty or not finite"
            )));
        }

        let mut eval = |x: f64| {
            let v = f(x);
            if v.is_nan() { f64::INFINITY } else { v }
        };

        let eps = f64::EPSILON.sqrt();
        let tol3 = self.tolerance / 3.0;

        let (mut a, mut b) = (lower, upper);
        let mut v = a + GOLDEN * (b - a);
        let mut w = v;
        let mut x = v;
        let mut d: f64 = 0.0;
        let mut e: f64 = 0.0;

        let mut fx = eval(x);
        let mut fv = fx;
        let mut fw = fx;

        for iteration in 0..self.max_iterations {
            let xm = 0.5 * (a + b);
            let tol1 = eps * x.abs() + tol3;
            let t2 = 2.0 * tol1;

            // Stopping criterion
            if (x - xm).abs() <= t2 - 0.5 * (b - a) {
                if !fx.is_finite() {
                    break;
                }
                return Ok(Minimum {
                    x,
                    fx,
                    iterations: iteration,
                });
            }

            let mut p = 0.0;
            let mut q = 0.0;
            let mut r = 0.0;

            // Fit parabola
            if e.abs() > tol1 {
                r = (x - w) * (fx - fv);
                q = (x - v) * (fx - fw);
                p = (x - v) * q - (x - w) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                } else {
                    q = -q;
                }
                r = e;
                e = d;
            }

            if p.abs() >= (0.5 * q * r).abs() || p <= q * (a - x) || p >= q * (b - x) {
                // Golden-section step
                e = if x < xm { b - x } else { a - x };
                d = GOLDEN * e;
            } else {
                // Parabolic interpolation step
                d = p / q;
                let u = x + d;
                if u - a < t2 || b - u < t2 {
                    d = if x < xm { tol1 } else { -tol1 };
                }
            }

            let u = if d.abs() >= tol1 {
                x + d
            } else if d > 0.0 {
                x + tol1
            } else {
                x - tol1
            };
            let fu = eval(u);
            trace!(iteration, u, fu, "brent step");

            if fu <= fx {
                if u < x {
                    b = x;
                } else {
                    a = x;
                }
                v = w;
                fv = fw;
                w = x;
                fw = fx;
                x = u;
                fx = fu;
            } else {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    v = w;
                    fv = fw;
                    w = u;
                    fw = fu;
                } else if fu <= fv || v == x || v == w {
                    v = u;
                    fv = fu;
                }
            }
        }

        Err(SpatialError::NonConvergence {
            model: label,
            iterations: self.max_iterations,
        })
    }
}
