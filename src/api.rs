//! High-level API for spatial regression.
//!
//! ## Purpose
//!
//! This module provides the user-facing entry points: a fluent builder for the
//! synthetic walkthrough (`Simulation`) and one for fitting user data with a
//! given weights relation (`Regression`).
//!
//! ## Design notes
//!
//! * **Ergonomic**: Fluent builders with sensible defaults for all parameters.
//! * **Validated**: Parameters are validated when `.build()` is called; errors
//!   from setters are deferred until then.
//! * **Duplicates**: Setting a parameter twice is reported as an error by `.build()`.
//!
//! ### Configuration Flow
//!
//! 1. Create a [`SimulationBuilder`] via `Simulation::new()` (or a
//!    [`RegressionBuilder`] via `Regression::new()`).
//! 2. Chain configuration methods (`.sample_size()`, `.neighbors()`, etc.).
//! 3. Call `.build()` to validate, then `.run()` (or `.fit()`).

// Internal dependencies
use crate::algorithms::autoregressive::FitOptions;
use crate::engine::config::SimulationConfig;
use crate::engine::pipeline::{AnalysisSettings, analyse};
use crate::engine::validator::Validator;
use crate::math::optimize::BrentMinimizer;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Publicly re-exported types
pub use crate::algorithms::autoregressive::{
    AutoregressiveEstimate, Convergence, LikelihoodRatio,
};
pub use crate::algorithms::coefficients::CoefficientTable;
pub use crate::algorithms::ols::OlsFit;
pub use crate::algorithms::simulation::{
    CovariateDistribution, CovariateSpec, Extent, SimulatedOutcome,
};
pub use crate::algorithms::spatial_error::SpatialErrorFit;
pub use crate::algorithms::spatial_lag::SpatialLagFit;
pub use crate::algorithms::weights::{
    IsolatePolicy, NeighborLists, SpatialWeights, WeightStyle, WeightsConstants,
};
pub use crate::engine::output::{RegressionReport, SimulationReport};
pub use crate::engine::pipeline::SimulationPipeline;
pub use crate::evaluation::moran::{MoranPermutationTest, MoranTest, VarianceAssumption};
pub use crate::evaluation::residual_moran::ResidualMoranTest;
pub use crate::math::distance::DistanceMetric;
pub use crate::math::linalg::LogDetMethod;
pub use crate::math::normal::Alternative;
pub use crate::primitives::errors::SpatialError;
pub use crate::primitives::frame::{
    FrameColumns, LAG_RESIDUALS_COLUMN, ModelFrame, RESIDUALS_COLUMN,
};

// ============================================================================
// Simulation Builder
// ============================================================================

/// Fluent builder for the synthetic spatial regression walkthrough.
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    /// Number of synthetic units.
    pub sample_size: Option<usize>,

    /// Coordinate range of the point set.
    pub extent: Option<Extent>,

    /// Covariates to draw.
    pub covariates: Option<Vec<CovariateSpec>>,

    /// True coefficients, intercept first.
    pub coefficients: Option<Vec<f64>>,

    /// Neighbours per unit.
    pub neighbors: Option<usize>,

    /// Neighbour search metric.
    pub distance_metric: Option<DistanceMetric>,

    /// Link weighting.
    pub weight_style: Option<WeightStyle>,

    /// Noise filter strength.
    pub rho: Option<f64>,

    /// Raw noise standard deviation.
    pub noise_sd: Option<f64>,

    /// Random seed.
    pub seed: Option<u64>,

    /// Confidence level for coefficient intervals.
    pub confidence_level: Option<f64>,

    /// Moran's I variance assumption.
    pub variance_assumption: Option<VarianceAssumption>,

    /// Moran's I alternative hypothesis.
    pub alternative: Option<Alternative>,

    /// Moran's I permutations.
    pub permutations: Option<usize>,

    /// Fit the spatial lag model too.
    pub spatial_lag: Option<bool>,

    /// Optimiser tolerance.
    pub tolerance: Option<f64>,

    /// Optimiser iteration cap.
    pub max_iterations: Option<usize>,

    /// Log-determinant evaluation of the autoregressive fits.
    pub log_determinant: Option<LogDetMethod>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

impl SimulationBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration; every field counts as already set.
    pub fn from_config(config: SimulationConfig) -> Self {
        Self {
            sample_size: Some(config.sample_size),
            extent: Some(config.extent),
            covariates: Some(config.covariates),
            coefficients: Some(config.coefficients),
            neighbors: Some(config.k),
            distance_metric: Some(config.metric),
            weight_style: Some(config.style),
            rho: Some(config.rho),
            noise_sd: Some(config.noise_sd),
            seed: Some(config.seed),
            confidence_level: Some(config.level),
            variance_assumption: Some(config.assumption),
            alternative: Some(config.alternative),
            permutations: config.permutations,
            spatial_lag: Some(config.fit_spatial_lag),
            tolerance: Some(config.tolerance),
            max_iterations: Some(config.max_iterations),
            log_determinant: Some(config.log_det),
            duplicate_param: None,
        }
    }

    /// Set the number of synthetic units.
    pub fn sample_size(mut self, n: usize) -> Self {
        if self.sample_size.is_some() {
            self.duplicate_param = Some("sample_size");
        }
        self.sample_size = Some(n);
        self
    }

    /// Set the coordinate range.
    pub fn extent(mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        if self.extent.is_some() {
            self.duplicate_param = Some("extent");
        }
        self.extent = Some(Extent {
            x_min,
            x_max,
            y_min,
            y_max,
        });
        self
    }

    /// Set the covariates to draw, replacing the default treatment/x1/x2 set.
    pub fn covariates(mut self, covariates: Vec<CovariateSpec>) -> Self {
        if self.covariates.is_some() {
            self.duplicate_param = Some("covariates");
        }
        self.covariates = Some(covariates);
        self
    }

    /// Set the true coefficients, intercept first.
    pub fn coefficients(mut self, coefficients: Vec<f64>) -> Self {
        if self.coefficients.is_some() {
            self.duplicate_param = Some("coefficients");
        }
        self.coefficients = Some(coefficients);
        self
    }

    /// Set the number of nearest neighbours per unit.
    pub fn neighbors(mut self, k: usize) -> Self {
        if self.neighbors.is_some() {
            self.duplicate_param = Some("neighbors");
        }
        self.neighbors = Some(k);
        self
    }

    /// Set the neighbour search metric.
    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        if self.distance_metric.is_some() {
            self.duplicate_param = Some("distance_metric");
        }
        self.distance_metric = Some(metric);
        self
    }

    /// Set the link weighting style.
    pub fn weight_style(mut self, style: WeightStyle) -> Self {
        if self.weight_style.is_some() {
            self.duplicate_param = Some("weight_style");
        }
        self.weight_style = Some(style);
        self
    }

    /// Set the noise filter strength.
    pub fn rho(mut self, rho: f64) -> Self {
        if self.rho.is_some() {
            self.duplicate_param = Some("rho");
        }
        self.rho = Some(rho);
        self
    }

    /// Set the raw noise standard deviation.
    pub fn noise_sd(mut self, sd: f64) -> Self {
        if self.noise_sd.is_some() {
            self.duplicate_param = Some("noise_sd");
        }
        self.noise_sd = Some(sd);
        self
    }

    /// Set the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        if self.seed.is_some() {
            self.duplicate_param = Some("seed");
        }
        self.seed = Some(seed);
        self
    }

    /// Set the confidence level of the coefficient intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        if self.confidence_level.is_some() {
            self.duplicate_param = Some("confidence_level");
        }
        self.confidence_level = Some(level);
        self
    }

    /// Set the Moran's I variance assumption.
    pub fn variance_assumption(mut self, assumption: VarianceAssumption) -> Self {
        if self.variance_assumption.is_some() {
            self.duplicate_param = Some("variance_assumption");
        }
        self.variance_assumption = Some(assumption);
        self
    }

    /// Set the Moran's I alternative hypothesis.
    pub fn alternative(mut self, alternative: Alternative) -> Self {
        if self.alternative.is_some() {
            self.duplicate_param = Some("alternative");
        }
        self.alternative = Some(alternative);
        self
    }

    /// Add a permutation test with `nsim` random relabellings.
    pub fn permutations(mut self, nsim: usize) -> Self {
        if self.permutations.is_some() {
            self.duplicate_param = Some("permutations");
        }
        self.permutations = Some(nsim);
        self
    }

    /// Also fit the spatial lag model.
    pub fn spatial_lag(mut self) -> Self {
        if self.spatial_lag.is_some() {
            self.duplicate_param = Some("spatial_lag");
        }
        self.spatial_lag = Some(true);
        self
    }

    /// Set the optimiser tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        if self.tolerance.is_some() {
            self.duplicate_param = Some("tolerance");
        }
        self.tolerance = Some(tol);
        self
    }

    /// Set the optimiser iteration cap.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        if self.max_iterations.is_some() {
            self.duplicate_param = Some("max_iterations");
        }
        self.max_iterations = Some(iterations);
        self
    }

    /// Set how the log-determinant of the autoregressive fits is evaluated.
    pub fn log_determinant(mut self, method: LogDetMethod) -> Self {
        if self.log_determinant.is_some() {
            self.duplicate_param = Some("log_determinant");
        }
        self.log_determinant = Some(method);
        self
    }

    /// Resolve defaults into a configuration without validating it.
    pub fn to_config(&self) -> SimulationConfig {
        let d = SimulationConfig::default();
        SimulationConfig {
            sample_size: self.sample_size.unwrap_or(d.sample_size),
            extent: self.extent.unwrap_or(d.extent),
            covariates: self.covariates.clone().unwrap_or(d.covariates),
            coefficients: self.coefficients.clone().unwrap_or(d.coefficients),
            k: self.neighbors.unwrap_or(d.k),
            metric: self.distance_metric.unwrap_or(d.metric),
            style: self.weight_style.unwrap_or(d.style),
            rho: self.rho.unwrap_or(d.rho),
            noise_sd: self.noise_sd.unwrap_or(d.noise_sd),
            seed: self.seed.unwrap_or(d.seed),
            level: self.confidence_level.unwrap_or(d.level),
            assumption: self.variance_assumption.unwrap_or(d.assumption),
            alternative: self.alternative.unwrap_or(d.alternative),
            permutations: self.permutations.or(d.permutations),
            fit_spatial_lag: self.spatial_lag.unwrap_or(d.fit_spatial_lag),
            tolerance: self.tolerance.unwrap_or(d.tolerance),
            max_iterations: self.max_iterations.unwrap_or(d.max_iterations),
            log_det: self.log_determinant.unwrap_or(d.log_det),
        }
    }

    /// Validate the configuration and produce a runnable pipeline.
    pub fn build(self) -> Result<SimulationPipeline, SpatialError> {
        Validator::validate_no_duplicates(self.duplicate_param)?;
        SimulationPipeline::new(self.to_config())
    }

    /// Build and run in one step.
    pub fn run(self) -> Result<SimulationReport, SpatialError> {
        self.build()?.run()
    }
}

// ============================================================================
// Regression Builder
// ============================================================================

/// Fluent builder for fitting spatial regressions to user data.
#[derive(Debug, Clone, Default)]
pub struct RegressionBuilder {
    /// Outcome column.
    pub response: Option<String>,

    /// Predictor columns; defaults to every other column.
    pub predictors: Option<Vec<String>>,

    /// Confidence level for coefficient intervals.
    pub confidence_level: Option<f64>,

    /// Moran's I variance assumption.
    pub variance_assumption: Option<VarianceAssumption>,

    /// Moran's I alternative hypothesis.
    pub alternative: Option<Alternative>,

    /// Moran's I permutations.
    pub permutations: Option<usize>,

    /// Seed of the permutation stream.
    pub seed: Option<u64>,

    /// Fit the spatial lag model too.
    pub spatial_lag: Option<bool>,

    /// Optimiser tolerance.
    pub tolerance: Option<f64>,

    /// Optimiser iteration cap.
    pub max_iterations: Option<usize>,

    /// Log-determinant evaluation of the autoregressive fits.
    pub log_determinant: Option<LogDetMethod>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

/// A validated regression specification, ready to fit.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    response: String,
    predictors: Option<Vec<String>>,
    settings: AnalysisSettings,
    seed: u64,
}

impl RegressionBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome column (required).
    pub fn response(mut self, name: impl Into<String>) -> Self {
        if self.response.is_some() {
            self.duplicate_param = Some("response");
        }
        self.response = Some(name.into());
        self
    }

    /// Set the predictor columns.
    pub fn predictors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.predictors.is_some() {
            self.duplicate_param = Some("predictors");
        }
        self.predictors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the confidence level of the coefficient intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        if self.confidence_level.is_some() {
            self.duplicate_param = Some("confidence_level");
        }
        self.confidence_level = Some(level);
        self
    }

    /// Set the Moran's I variance assumption.
    pub fn variance_assumption(mut self, assumption: VarianceAssumption) -> Self {
        if self.variance_assumption.is_some() {
            self.duplicate_param = Some("variance_assumption");
        }
        self.variance_assumption = Some(assumption);
        self
    }

    /// Set the Moran's I alternative hypothesis.
    pub fn alternative(mut self, alternative: Alternative) -> Self {
        if self.alternative.is_some() {
            self.duplicate_param = Some("alternative");
        }
        self.alternative = Some(alternative);
        self
    }

    /// Add a permutation test with `nsim` random relabellings.
    pub fn permutations(mut self, nsim: usize) -> Self {
        if self.permutations.is_some() {
            self.duplicate_param = Some("permutations");
        }
        self.permutations = Some(nsim);
        self
    }

    /// Set the seed of the permutation stream.
    pub fn seed(mut self, seed: u64) -> Self {
        if self.seed.is_some() {
            self.duplicate_param = Some("seed");
        }
        self.seed = Some(seed);
        self
    }

    /// Also fit the spatial lag model.
    pub fn spatial_lag(mut self) -> Self {
        if self.spatial_lag.is_some() {
            self.duplicate_param = Some("spatial_lag");
        }
        self.spatial_lag = Some(true);
        self
    }

    /// Set the optimiser tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        if self.tolerance.is_some() {
            self.duplicate_param = Some("tolerance");
        }
        self.tolerance = Some(tol);
        self
    }

    /// Set the optimiser iteration cap.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        if self.max_iterations.is_some() {
            self.duplicate_param = Some("max_iterations");
        }
        self.max_iterations = Some(iterations);
        self
    }

    /// Set how the log-determinant of the autoregressive fits is evaluated.
    pub fn log_determinant(mut self, method: LogDetMethod) -> Self {
        if self.log_determinant.is_some() {
            self.duplicate_param = Some("log_determinant");
        }
        self.log_determinant = Some(method);
        self
    }

    /// Validate the settings.
    pub fn build(self) -> Result<RegressionModel, SpatialError> {
        Validator::validate_no_duplicates(self.duplicate_param)?;

        let response = self
            .response
            .ok_or_else(|| SpatialError::InvalidInput("a response column is required".into()))?;

        let defaults = BrentMinimizer::default();
        let level = self.confidence_level.unwrap_or(0.95);
        let tolerance = self.tolerance.unwrap_or(defaults.tolerance);
        let max_iterations = self.max_iterations.unwrap_or(defaults.max_iterations);
        Validator::validate_interval_level(level)?;
        Validator::validate_tolerance(tolerance)?;
        Validator::validate_iterations(max_iterations)?;
        let log_det = self.log_determinant.unwrap_or_default();
        Validator::validate_log_det(log_det)?;
        if let Some(nsim) = self.permutations {
            Validator::validate_permutations(nsim)?;
        }
        if let Some(predictors) = &self.predictors {
            Validator::validate_unique_names(predictors.iter().map(String::as_str))?;
            if predictors.contains(&response) {
                return Err(SpatialError::DuplicateColumn(response));
            }
        }

        Ok(RegressionModel {
            response,
            predictors: self.predictors,
            settings: AnalysisSettings {
                fit: FitOptions {
                    level,
                    optimizer: BrentMinimizer {
                        tolerance,
                        max_iterations,
                    },
                    log_det,
                },
                assumption: self.variance_assumption.unwrap_or_default(),
                alternative: self.alternative.unwrap_or_default(),
                permutations: self.permutations,
                fit_spatial_lag: self.spatial_lag.unwrap_or(false),
            },
            seed: self.seed.unwrap_or(0),
        })
    }
}

impl RegressionModel {
    /// Fit every model to `frame` under `weights` and test the residuals.
    ///
    /// The report's frame is a copy of `frame` with the residual columns appended.
    pub fn fit(
        &self,
        frame: &ModelFrame,
        weights: &SpatialWeights,
    ) -> Result<RegressionReport, SpatialError> {
        let y = frame.column(&self.response)?.to_vec();
        let predictors: Vec<String> = match &self.predictors {
            Some(p) => p.clone(),
            None => frame
                .names()
                .iter()
                .filter(|n| **n != self.response)
                .cloned()
                .collect(),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        analyse(
            &y,
            frame.clone(),
            &predictors,
            weights,
            &self.settings,
            &mut rng,
        )
    }

    /// Build KNN weights from flattened coordinates, then fit.
    pub fn fit_with_coordinates(
        &self,
        frame: &ModelFrame,
        coords: &[f64],
        k: usize,
        metric: DistanceMetric,
    ) -> Result<RegressionReport, SpatialError> {
        let n = Validator::validate_coordinates(coords)?;
        if n != frame.n_rows() {
            return Err(SpatialError::MismatchedInputs {
                what: "coordinate pairs",
                expected: frame.n_rows(),
                got: n,
            });
        }
        Validator::validate_neighbor_count(k, n)?;
        let weights = SpatialWeights::knn(coords, k, metric, WeightStyle::RowStandardized)?;
        self.fit(frame, &weights)
    }
}
