//! Linear algebra helpers backed by nalgebra.
//!
//! ## Purpose
//!
//! This module wraps the dense linear algebra the regression fitters need:
//! normal-equation solves, matrix inversion, rank checks, traces of products,
//! and the log-determinant `ln|I - λW|` of a spatial filter.
//!
//! ## Design notes
//!
//! * Uses QR decomposition (Householder reflections) instead of Cholesky for better
//!   numerical stability with ill-conditioned systems.
//! * Fallback to SVD for rank-deficient matrices.
//! * The log-determinant is evaluated from the eigenvalues of W when W is similar
//!   to a symmetric matrix (symmetric links), so each likelihood evaluation costs O(n).
//! * Asymmetric weights such as KNN fall back to an LU factorisation per trial value,
//!   unless the caller asks for the complex spectrum. Every eigen decomposition runs
//!   under an iteration cap.

use nalgebra::linalg::{Schur, SymmetricEigen};
use nalgebra::{Complex, DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::primitives::errors::SpatialError;

/// Relative singular value threshold below which a matrix is treated as singular.
const RANK_TOLERANCE: f64 = 1e-10;

/// Margin kept between the autoregressive search interval and its poles.
const BOUND_MARGIN: f64 = 1e-6;

// ============================================================================
// Solvers
// ============================================================================

/// Solve the normal equations `X'X * beta = X'y`.
pub fn solve_normal_equations(xtx: &DMatrix<f64>, xty: &DVector<f64>) -> Option<DVector<f64>> {
    let qr = xtx.clone().qr();
    if let Some(solution) = qr.solve(xty) {
        return Some(solution);
    }

    xtx.clone()
        .svd(true, true)
        .solve(xty, f64::EPSILON * 100.0)
        .ok()
}

/// Invert a square matrix, falling back to the pseudo-inverse.
pub fn invert(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = a.nrows();
    let qr = a.clone().qr();
    let identity = DMatrix::identity(n, n);

    if let Some(inv) = qr.solve(&identity) {
        return Some(inv);
    }

    a.clone().pseudo_inverse(f64::EPSILON * 100.0).ok()
}

/// Returns true if the smallest singular value is negligible relative to the largest.
pub fn is_rank_deficient(a: &DMatrix<f64>) -> bool {
    let sv = a.singular_values();
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    max <= 0.0 || min <= max * RANK_TOLERANCE
}

/// Least squares fit of `y` on `x` through the normal equations.
///
/// Returns the coefficients and `(X'X)^-1`.
pub fn least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>), SpatialError> {
    if is_rank_deficient(x) {
        return Err(SpatialError::SingularDesign(format!(
            "X ({} x {}) is rank deficient",
            x.nrows(),
            x.ncols()
        )));
    }

    let xtx = x.tr_mul(x);
    let xty = x.tr_mul(y);
    let beta = solve_normal_equations(&xtx, &xty)
        .ok_or_else(|| SpatialError::SingularDesign("normal equations have no solution".into()))?;
    let xtx_inv = invert(&xtx)
        .ok_or_else(|| SpatialError::SingularDesign("X'X is not invertible".into()))?;

    Ok((beta, xtx_inv))
}

// ============================================================================
// Traces
// ============================================================================

/// `tr(A B)` without forming the product.
pub fn trace_of_product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    debug_assert_eq!(a.ncols(), b.nrows());
    debug_assert_eq!(a.nrows(), b.ncols());
    let mut sum = 0.0;
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            sum += a[(i, j)] * b[(j, i)];
        }
    }
    sum
}

/// `tr(A A')`, the squared Frobenius norm.
pub fn trace_of_gram(a: &DMatrix<f64>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

// ============================================================================
// Log-determinant of the spatial filter
// ============================================================================

/// Eigen decomposition iterations allowed per unit under `LogDetMethod::Auto`.
const EIGEN_ITERATIONS_PER_UNIT: usize = 30;

/// How `ln|I - λW|` is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogDetMethod {
    /// Real eigenvalues when `W` is similar to a symmetric matrix, a dense LU
    /// factorisation per trial value otherwise.
    #[default]
    Auto,

    /// Eigenvalues only, complex when `W` is asymmetric. A decomposition that does
    /// not converge within `max_iterations` is reported as non-convergence.
    Eigen {
        /// Iteration cap of the eigen decomposition.
        max_iterations: usize,
    },

    /// A dense LU factorisation of `I - λW` for every trial value.
    Dense,
}

#[derive(Debug, Clone)]
enum Evaluator {
    Spectrum(Vec<Complex<f64>>),
    Dense(DMatrix<f64>),
}

/// Evaluator of `ln|I - λW|` and `tr(W (I - λW)^-1)` over an admissible interval.
#[derive(Debug, Clone)]
pub struct LogDeterminant {
    evaluator: Evaluator,
    bounds: (f64, f64),
}

impl LogDeterminant {
    /// Prepare the evaluator for a dense square weights matrix.
    ///
    /// `symmetric`, when given, must be a symmetric matrix similar to `w`; its
    /// real eigenvalues replace the general (Schur) decomposition of `w`.
    pub fn new(
        w: &DMatrix<f64>,
        symmetric: Option<&DMatrix<f64>>,
        method: LogDetMethod,
    ) -> Result<Self, SpatialError> {
        let n = w.nrows();
        if w.ncols() != n {
            return Err(SpatialError::MismatchedInputs {
                what: "weights matrix columns",
                expected: n,
                got: w.ncols(),
            });
        }
        if let Some(s) = symmetric {
            if s.nrows() != n || s.ncols() != n {
                return Err(SpatialError::MismatchedInputs {
                    what: "symmetric weights matrix rows",
                    expected: n,
                    got: s.nrows(),
                });
            }
        }

        match method {
            LogDetMethod::Dense => Ok(Self::dense(w)),
            LogDetMethod::Eigen { max_iterations } => {
                if max_iterations == 0 {
                    return Err(SpatialError::InvalidIterations(max_iterations));
                }
                let eigenvalues = match symmetric {
                    Some(s) => symmetric_eigenvalues(s, max_iterations),
                    None => schur_eigenvalues(w, max_iterations),
                };
                match eigenvalues {
                    Some(eigenvalues) => Self::from_spectrum(eigenvalues),
                    None => Err(SpatialError::NonConvergence {
                        model: "eigen decomposition of W",
                        iterations: max_iterations,
                    }),
                }
            }
            LogDetMethod::Auto => {
                let cap = EIGEN_ITERATIONS_PER_UNIT * n.max(1);
                match symmetric.and_then(|s| symmetric_eigenvalues(s, cap)) {
                    Some(eigenvalues) => Self::from_spectrum(eigenvalues),
                    None => {
                        debug!(n, "evaluating log-determinant by dense LU");
                        Ok(Self::dense(w))
                    }
                }
            }
        }
    }

    fn from_spectrum(eigenvalues: Vec<Complex<f64>>) -> Result<Self, SpatialError> {
        if eigenvalues
            .iter()
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
        {
            return Err(SpatialError::DegenerateStatistic(
                "eigen decomposition of W produced non-finite values".into(),
            ));
        }

        let min_re = eigenvalues.iter().map(|c| c.re).fold(f64::INFINITY, f64::min);
        let max_re = eigenvalues
            .iter()
            .map(|c| c.re)
            .fold(f64::NEG_INFINITY, f64::max);
        let lower = if min_re < -f64::EPSILON { 1.0 / min_re } else { -1.0 };
        let upper = if max_re > f64::EPSILON { 1.0 / max_re } else { 1.0 };

        Ok(Self {
            evaluator: Evaluator::Spectrum(eigenvalues),
            bounds: (lower + BOUND_MARGIN, upper - BOUND_MARGIN),
        })
    }

    // The spectral radius is at most the largest absolute row sum, so
    // `I - λW` is nonsingular for |λ| below its inverse.
    fn dense(w: &DMatrix<f64>) -> Self {
        let radius = w
            .row_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0_f64, f64::max);
        let limit = if radius > f64::EPSILON { 1.0 / radius } else { 1.0 };
        Self {
            evaluator: Evaluator::Dense(w.clone()),
            bounds: (-limit + BOUND_MARGIN, limit - BOUND_MARGIN),
        }
    }

    /// The eigenvalues of W, unless the dense evaluator is in use.
    pub fn eigenvalues(&self) -> Option<&[Complex<f64>]> {
        match &self.evaluator {
            Evaluator::Spectrum(eigenvalues) => Some(eigenvalues),
            Evaluator::Dense(_) => None,
        }
    }

    /// Returns true if every evaluation factorises `I - λW` afresh.
    pub fn is_dense(&self) -> bool {
        matches!(self.evaluator, Evaluator::Dense(_))
    }

    /// Open search interval for λ, shrunk by a small margin.
    ///
    /// `(1/min Re(ω), 1/max Re(ω))` from the eigenvalues, or `(-1/r, 1/r)` with
    /// `r` the largest absolute row sum for the dense evaluator.
    pub fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    /// `ln|I - λW|`.
    pub fn eval(&self, lambda: f64) -> f64 {
        match &self.evaluator {
            Evaluator::Spectrum(eigenvalues) => eigenvalues
                .iter()
                .map(|c| {
                    let re = 1.0 - lambda * c.re;
                    let im = lambda * c.im;
                    0.5 * (re * re + im * im).ln()
                })
                .sum(),
            Evaluator::Dense(w) => {
                let n = w.nrows();
                let lu = (DMatrix::<f64>::identity(n, n) - w * lambda).lu();
                lu.u().diagonal().iter().map(|d| d.abs().ln()).sum()
            }
        }
    }

    /// `tr(W (I - λW)^-1)`.
    pub fn trace_filtered(&self, lambda: f64) -> Result<f64, SpatialError> {
        match &self.evaluator {
            Evaluator::Spectrum(eigenvalues) => Ok(eigenvalues
                .iter()
                .map(|&c| (c / (Complex::new(1.0, 0.0) - c * lambda)).re)
                .sum()),
            Evaluator::Dense(w) => Ok(filtered_weights(w, lambda)?.trace()),
        }
    }
}

fn symmetric_eigenvalues(s: &DMatrix<f64>, max_iterations: usize) -> Option<Vec<Complex<f64>>> {
    SymmetricEigen::try_new(s.clone(), f64::EPSILON, max_iterations)
        .map(|eig| eig.eigenvalues.iter().map(|&v| Complex::new(v, 0.0)).collect())
}

fn schur_eigenvalues(w: &DMatrix<f64>, max_iterations: usize) -> Option<Vec<Complex<f64>>> {
    Schur::try_new(w.clone(), f64::EPSILON, max_iterations)
        .map(|schur| schur.complex_eigenvalues().iter().copied().collect())
}

// ============================================================================
// Spatial Filter Products
// ============================================================================

/// `W (I - λW)^-1` as a dense matrix.
pub fn filtered_weights(w: &DMatrix<f64>, lambda: f64) -> Result<DMatrix<f64>, SpatialError> {
    let n = w.nrows();
    let a = DMatrix::<f64>::identity(n, n) - w * lambda;
    let a_inv = a
        .lu()
        .try_inverse()
        .ok_or_else(|| SpatialError::SingularDesign(format!("I - {lambda}W is singular")))?;
    Ok(w * a_inv)
}
