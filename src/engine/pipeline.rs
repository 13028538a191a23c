//! Sequential execution of the spatial regression pipeline.
//!
//! ## Purpose
//!
//! This module runs the stages in their fixed order: generate data, build
//! the weights relation, simulate the outcome, fit OLS and the spatial models,
//! test residuals for autocorrelation, and append residual columns to the frame.
//!
//! ## Design notes
//!
//! * **Single stream**: A simulation run owns one `ChaCha8Rng`; the permutation
//!   test continues the same stream after the outcome noise.
//! * **Fail-fast**: The first failing stage aborts the run with its error.
//! * **Logging**: Each stage emits a `tracing` debug event.
//!
//! ## Non-goals
//!
//! * Stages never run concurrently and are never retried.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::algorithms::autoregressive::FitOptions;
use crate::algorithms::ols::OlsFit;
use crate::algorithms::simulation::{OutcomeSimulator, SyntheticGenerator};
use crate::algorithms::spatial_error::SpatialErrorFit;
use crate::algorithms::spatial_lag::SpatialLagFit;
use crate::algorithms::weights::SpatialWeights;
use crate::engine::config::SimulationConfig;
use crate::engine::output::{RegressionReport, SimulationReport};
use crate::evaluation::moran::{MoranPermutationTest, MoranTest, VarianceAssumption};
use crate::evaluation::residual_moran::ResidualMoranTest;
use crate::math::normal::Alternative;
use crate::primitives::errors::SpatialError;
use crate::primitives::frame::ModelFrame;

// ============================================================================
// Analysis Settings
// ============================================================================

/// Settings of the model-fitting and testing stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    /// Likelihood fitter options, including the interval level.
    pub fit: FitOptions,
    /// Variance assumption of the Moran's I tests.
    pub assumption: VarianceAssumption,
    /// Alternative hypothesis of the Moran's I tests.
    pub alternative: Alternative,
    /// Number of permutations; `None` skips the permutation test.
    pub permutations: Option<usize>,
    /// Also fit the spatial lag model.
    pub fit_spatial_lag: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fit: FitOptions::default(),
            assumption: VarianceAssumption::default(),
            alternative: Alternative::default(),
            permutations: None,
            fit_spatial_lag: false,
        }
    }
}

impl From<&SimulationConfig> for AnalysisSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            fit: FitOptions {
                level: config.level,
                optimizer: config.optimizer(),
                log_det: config.log_det,
            },
            assumption: config.assumption,
            alternative: config.alternative,
            permutations: config.permutations,
            fit_spatial_lag: config.fit_spatial_lag,
        }
    }
}

// ============================================================================
// Regression Stages
// ============================================================================

/// Fit every model to `y` on the named predictors of `frame` and test the residuals.
///
/// The returned report owns `frame`, extended with the OLS residuals and their spatial lag.
pub fn analyse<S, R>(
    y: &[f64],
    mut frame: ModelFrame,
    predictors: &[S],
    weights: &SpatialWeights,
    settings: &AnalysisSettings,
    rng: &mut R,
) -> Result<RegressionReport, SpatialError>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let design = frame.design_matrix(predictors, true)?;
    debug!(n = design.n(), p = design.p(), "assembled design matrix");

    let ols = OlsFit::fit(y, &design, settings.fit.level)?;
    let spatial_error = SpatialErrorFit::fit(y, &design, weights, &settings.fit)?;
    let spatial_lag = if settings.fit_spatial_lag {
        Some(SpatialLagFit::fit(y, &design, weights, &settings.fit)?)
    } else {
        None
    };

    let ols_moran = MoranTest::compute(
        &ols.residuals,
        weights,
        settings.assumption,
        settings.alternative,
    )?;
    let ols_residual_moran =
        ResidualMoranTest::compute(&ols.residuals, &design, weights, settings.alternative)?;
    let spatial_error_moran = MoranTest::compute(
        &spatial_error.filtered_residuals,
        weights,
        settings.assumption,
        settings.alternative,
    )?;
    let permutation = match settings.permutations {
        Some(nsim) => Some(MoranPermutationTest::compute(
            &ols.residuals,
            weights,
            nsim,
            settings.alternative,
            rng,
        )?),
        None => None,
    };
    debug!(
        ols_moran = ols_moran.statistic,
        ols_moran_p = ols_moran.p_value,
        sem_moran = spatial_error_moran.statistic,
        "tested residual autocorrelation"
    );

    weights.augment_frame(&mut frame, &ols.residuals)?;

    Ok(RegressionReport {
        ols,
        spatial_error,
        spatial_lag,
        ols_moran,
        ols_residual_moran,
        spatial_error_moran,
        permutation,
        weights: weights.constants(),
        frame,
    })
}

// ============================================================================
// Simulation Pipeline
// ============================================================================

/// A validated simulation run, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPipeline {
    config: SimulationConfig,
}

impl SimulationPipeline {
    /// Validate `config` and wrap it.
    pub fn new(config: SimulationConfig) -> Result<Self, SpatialError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Execute every stage with a fresh stream seeded from the configuration.
    pub fn run(&self) -> Result<SimulationReport, SpatialError> {
        let config = &self.config;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let data = SyntheticGenerator {
            sample_size: config.sample_size,
            extent: config.extent,
            covariates: &config.covariates,
        }
        .generate(&mut rng)?;

        let weights = SpatialWeights::knn(&data.coords, config.k, config.metric, config.style)?;
        debug!(k = config.k, links = weights.n_links(), "built spatial weights");

        let outcome = OutcomeSimulator {
            coefficients: &config.coefficients,
            rho: config.rho,
            noise_sd: config.noise_sd,
        }
        .simulate(&data.covariates, &weights, &mut rng)?;

        let predictors = config.covariate_names();
        let regression = analyse(
            &outcome.y,
            data.covariates,
            &predictors,
            &weights,
            &AnalysisSettings::from(config),
            &mut rng,
        )?;

        debug!(seed = config.seed, "simulation run complete");
        Ok(SimulationReport {
            seed: config.seed,
            coords: data.coords,
            outcome,
            true_coefficients: config.coefficients.clone(),
            regression,
        })
    }
}
