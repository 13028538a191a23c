//! Serializable configuration of a simulation run.
//!
//! ## Purpose
//!
//! `SimulationConfig` gathers every knob of the synthetic walkthrough in one
//! plain data type, so runs can be described in JSON (or any serde format)
//! and replayed exactly.
//!
//! ## Design notes
//!
//! * **Defaults**: The defaults reproduce the walkthrough: 100 points in the unit
//!   square, 15 nearest neighbours, noise filter strength 30, true coefficients
//!   (2.0, 0.1, 0.05, 0.03) for an intercept, a treatment flag and two covariates.
//! * **Partial documents**: Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::algorithms::simulation::{CovariateDistribution, CovariateSpec, Extent};
use crate::algorithms::weights::WeightStyle;
use crate::engine::validator::Validator;
use crate::evaluation::moran::VarianceAssumption;
use crate::math::distance::DistanceMetric;
use crate::math::linalg::LogDetMethod;
use crate::math::normal::Alternative;
use crate::math::optimize::BrentMinimizer;
use crate::primitives::errors::SpatialError;

/// Complete description of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of synthetic units.
    pub sample_size: usize,
    /// Coordinate range of the point set.
    pub extent: Extent,
    /// Covariates, in design order after the intercept.
    pub covariates: Vec<CovariateSpec>,
    /// True coefficients, intercept first.
    pub coefficients: Vec<f64>,
    /// Neighbours per unit.
    pub k: usize,
    /// Distance used for neighbour search.
    pub metric: DistanceMetric,
    /// Weighting of neighbour links.
    pub style: WeightStyle,
    /// Strength of the noise filter.
    pub rho: f64,
    /// Standard deviation of the raw noise.
    pub noise_sd: f64,
    /// Seed of the random stream.
    pub seed: u64,
    /// Confidence level of the coefficient intervals.
    pub level: f64,
    /// Variance assumption of the Moran's I tests.
    pub assumption: VarianceAssumption,
    /// Alternative hypothesis of the Moran's I tests.
    pub alternative: Alternative,
    /// Number of Moran's I permutations; `None` skips the permutation test.
    pub permutations: Option<usize>,
    /// Also fit the spatial lag model.
    pub fit_spatial_lag: bool,
    /// Absolute tolerance of the autoregressive parameter search.
    pub tolerance: f64,
    /// Iteration cap of the autoregressive parameter search.
    pub max_iterations: usize,
    /// Log-determinant evaluation of the autoregressive fits.
    pub log_det: LogDetMethod,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let optimizer = BrentMinimizer::default();
        Self {
            sample_size: 100,
            extent: Extent::default(),
            covariates: vec![
                CovariateSpec::bernoulli("treatment", 0.5),
                CovariateSpec::normal("x1", 0.0, 1.0),
                CovariateSpec::normal("x2", 0.0, 1.0),
            ],
            coefficients: vec![2.0, 0.1, 0.05, 0.03],
            k: 15,
            metric: DistanceMetric::Euclidean,
            style: WeightStyle::RowStandardized,
            rho: 30.0,
            noise_sd: 1.0,
            seed: 42,
            level: 0.95,
            assumption: VarianceAssumption::default(),
            alternative: Alternative::default(),
            permutations: None,
            fit_spatial_lag: false,
            tolerance: optimizer.tolerance,
            max_iterations: optimizer.max_iterations,
            log_det: LogDetMethod::default(),
        }
    }
}

impl SimulationConfig {
    /// Check every parameter without drawing any random numbers.
    pub fn validate(&self) -> Result<(), SpatialError> {
        Validator::validate_sample_size(self.sample_size)?;
        self.extent.validate()?;
        Validator::validate_unique_names(self.covariates.iter().map(|c| c.name.as_str()))?;
        for spec in &self.covariates {
            spec.distribution.validate(&spec.name)?;
        }
        Validator::validate_coefficients(&self.coefficients, self.covariates.len())?;
        Validator::validate_neighbor_count(self.k, self.sample_size)?;
        Validator::validate_scalar(self.rho, "rho")?;
        CovariateDistribution::Normal {
            mean: 0.0,
            sd: self.noise_sd,
        }
        .validate("noise")?;
        Validator::validate_interval_level(self.level)?;
        Validator::validate_tolerance(self.tolerance)?;
        Validator::validate_iterations(self.max_iterations)?;
        Validator::validate_log_det(self.log_det)?;
        if let Some(permutations) = self.permutations {
            Validator::validate_permutations(permutations)?;
        }
        Ok(())
    }

    /// Names of the covariate columns.
    pub fn covariate_names(&self) -> Vec<&str> {
        self.covariates.iter().map(|c| c.name.as_str()).collect()
    }

    /// Minimiser implied by `tolerance` and `max_iterations`.
    pub fn optimizer(&self) -> BrentMinimizer {
        BrentMinimizer {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }
}
