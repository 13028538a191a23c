//! Moran's I test for spatial autocorrelation.
//!
//! ## Purpose
//!
//! This module tests whether a variable (typically regression residuals) is
//! spatially autocorrelated under a weights relation, analytically or by
//! permutation.
//!
//! ## Design notes
//!
//! * **Moments**: Closed-form mean and variance under either the normality or the
//!   randomisation (kurtosis-adjusted) assumption.
//! * **Isolates**: Units without neighbours do not contribute pairs, so `n` is
//!   reduced by their count in the statistic and its moments.
//! * **Permutation**: Values are reshuffled across units with a caller-owned RNG;
//!   the pseudo p-value counts the observed statistic as one draw.
//!
//! ## Key concepts
//!
//! * **Statistic**: `I = (n / S0) · z'Wz / z'z` with `z = x − x̄`.
//! * **Expectation**: `E[I] = −1 / (n − 1)`.
//! * **Normality variance**: `(n²S1 − nS2 + 3S0²) / (S0²(n² − 1)) − E[I]²`.
//! * **Randomisation variance**: as above, corrected by the sample kurtosis
//!   `K = n Σz⁴ / (Σz²)²`.
//!
//! ## Invariants
//!
//! * At least four observations are required.
//! * A constant variable or a non-positive variance is an error, never a NaN.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::weights::{SpatialWeights, WeightsConstants};
use crate::math::normal::Alternative;
use crate::primitives::errors::SpatialError;

/// Minimum number of observations for Moran's I moments.
pub const MIN_OBSERVATIONS: usize = 4;

// ============================================================================
// Configuration
// ============================================================================

/// Sampling assumption behind the variance of I.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VarianceAssumption {
    /// The variable is normally distributed.
    Normality,

    /// Values are a random permutation over the units.
    #[default]
    Randomisation,
}

// ============================================================================
// Analytic Test
// ============================================================================

/// Moran's I with analytic moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoranTest {
    /// Observed Moran's I.
    pub statistic: f64,
    /// Expectation under no autocorrelation.
    pub expectation: f64,
    /// Variance under the chosen assumption.
    pub variance: f64,
    /// `(I − E[I]) / √Var[I]`.
    pub std_deviate: f64,
    /// p-value under `alternative`.
    pub p_value: f64,
    /// Alternative hypothesis.
    pub alternative: Alternative,
    /// Variance assumption.
    pub assumption: VarianceAssumption,
    /// Effective number of units (isolates excluded).
    pub n: usize,
}

/// Centred values, their sum of squares, and the effective sample size.
struct Centered {
    z: Vec<f64>,
    zz: f64,
    n_eff: usize,
    consts: WeightsConstants,
}

fn center(x: &[f64], weights: &SpatialWeights) -> Result<Centered, SpatialError> {
    if x.is_empty() {
        return Err(SpatialError::EmptyInput);
    }
    if x.len() != weights.n() {
        return Err(SpatialError::MismatchedInputs {
            what: "values per spatial unit",
            expected: weights.n(),
            got: x.len(),
        });
    }
    if let Some(v) = x.iter().find(|v| !v.is_finite()) {
        return Err(SpatialError::InvalidNumericValue(format!("value {v}")));
    }

    let consts = weights.constants();
    let n_eff = consts.n - consts.isolates;
    if n_eff < MIN_OBSERVATIONS {
        return Err(SpatialError::TooFewPoints {
            got: n_eff,
            min: MIN_OBSERVATIONS,
        });
    }
    if consts.s0 <= 0.0 {
        return Err(SpatialError::DegenerateStatistic(
            "weights relation has no links".into(),
        ));
    }

    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let z: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let zz: f64 = z.iter().map(|v| v * v).sum();
    let scale = x.iter().map(|v| v.abs()).fold(0.0_f64, f64::max).max(1.0);
    if zz <= f64::EPSILON * scale * scale * x.len() as f64 {
        return Err(SpatialError::DegenerateStatistic(
            "Moran's I is undefined for a constant variable".into(),
        ));
    }

    Ok(Centered {
        z,
        zz,
        n_eff,
        consts,
    })
}

/// `(n / S0) · z'Wz / z'z`.
fn moran_statistic(
    z: &[f64],
    zz: f64,
    n: usize,
    s0: f64,
    weights: &SpatialWeights,
) -> Result<f64, SpatialError> {
    let wz = weights.lag(z)?;
    let cross: f64 = z.iter().zip(&wz).map(|(a, b)| a * b).sum();
    Ok(n as f64 / s0 * cross / zz)
}

impl MoranTest {
    /// Test `x` for spatial autocorrelation under `weights`.
    pub fn compute(
        x: &[f64],
        weights: &SpatialWeights,
        assumption: VarianceAssumption,
        alternative: Alternative,
    ) -> Result<Self, SpatialError> {
        let Centered {
            z,
            zz,
            n_eff,
            consts,
        } = center(x, weights)?;
        let statistic = moran_statistic(&z, zz, n_eff, consts.s0, weights)?;

        let n = n_eff as f64;
        let (s0, s1, s2) = (consts.s0, consts.s1, consts.s2);
        let s0_sq = s0 * s0;
        let expectation = -1.0 / (n - 1.0);

        let variance = match assumption {
            VarianceAssumption::Normality => {
                (n * n * s1 - n * s2 + 3.0 * s0_sq) / (s0_sq * (n * n - 1.0))
                    - expectation * expectation
            }
            VarianceAssumption::Randomisation => {
                let len = z.len() as f64;
                let z4: f64 = z.iter().map(|v| v.powi(4)).sum();
                let k = len * z4 / (zz * zz);
                let num = n * ((n * n - 3.0 * n + 3.0) * s1 - n * s2 + 3.0 * s0_sq)
                    - k * (n * (n - 1.0) * s1 - 2.0 * n * s2 + 6.0 * s0_sq);
                num / ((n - 1.0) * (n - 2.0) * (n - 3.0) * s0_sq) - expectation * expectation
            }
        };
        if !variance.is_finite() || variance <= 0.0 {
            return Err(SpatialError::DegenerateStatistic(format!(
                "variance of Moran's I is {variance}"
            )));
        }

        let std_deviate = (statistic - expectation) / variance.sqrt();
        let p_value = alternative.p_value(std_deviate);

        debug!(
            statistic,
            expectation, variance, std_deviate, p_value, "computed Moran's I"
        );
        Ok(Self {
            statistic,
            expectation,
            variance,
            std_deviate,
            p_value,
            alternative,
            assumption,
            n: n_eff,
        })
    }
}

// ============================================================================
// Permutation Test
// ============================================================================

/// Moran's I with a Monte-Carlo permutation reference distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoranPermutationTest {
    /// Observed Moran's I.
    pub statistic: f64,
    /// Number of permutations.
    pub permutations: usize,
    /// Position of the observed value among the permuted values, counted from below (1-based).
    pub rank: usize,
    /// Mean of the permuted statistics.
    pub mean: f64,
    /// Sample variance of the permuted statistics.
    pub variance: f64,
    /// Pseudo p-value `(r + 1) / (nsim + 1)`.
    pub p_value: f64,
    /// Alternative hypothesis.
    pub alternative: Alternative,
}

impl MoranPermutationTest {
    /// Compare the observed I with `permutations` random relabellings of `x`.
    pub fn compute<R: Rng + ?Sized>(
        x: &[f64],
        weights: &SpatialWeights,
        permutations: usize,
        alternative: Alternative,
        rng: &mut R,
    ) -> Result<Self, SpatialError> {
        if permutations == 0 {
            return Err(SpatialError::InvalidPermutations(permutations));
        }
        let Centered {
            z,
            zz,
            n_eff,
            consts,
        } = center(x, weights)?;
        let statistic = moran_statistic(&z, zz, n_eff, consts.s0, weights)?;

        let mut shuffled = z.clone();
        let mut simulated = Vec::with_capacity(permutations);
        for _ in 0..permutations {
            shuffled.shuffle(rng);
            simulated.push(moran_statistic(&shuffled, zz, n_eff, consts.s0, weights)?);
        }

        let at_least = simulated.iter().filter(|&&s| s >= statistic).count();
        let at_most = simulated.iter().filter(|&&s| s <= statistic).count();
        let denom = (permutations + 1) as f64;
        let p_greater = (at_least + 1) as f64 / denom;
        let p_less = (at_most + 1) as f64 / denom;
        let p_value = match alternative {
            Alternative::Greater => p_greater,
            Alternative::Less => p_less,
            Alternative::TwoSided => (2.0 * p_greater.min(p_less)).min(1.0),
        };

        let m = permutations as f64;
        let mean = simulated.iter().sum::<f64>() / m;
        let variance = if permutations > 1 {
            simulated.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (m - 1.0)
        } else {
            0.0
        };
        let rank = simulated.iter().filter(|&&s| s < statistic).count() + 1;

        debug!(statistic, permutations, p_value, "computed Moran's I permutation test");
        Ok(Self {
            statistic,
            permutations,
            rank,
            mean,
            variance,
            p_value,
            alternative,
        })
    }
}
