//! Report types for regression and simulation runs.
//!
//! ## Purpose
//!
//! This module defines the structures returned by the pipeline: every fitted
//! model, every autocorrelation test, and the augmented data frame, together
//! with a human-readable `Display` rendering.
//!
//! ## Design notes
//!
//! * **Optional outputs**: Results of optional stages use `Option`.
//! * **Serde**: Reports serialize so a caller can export a run to JSON.
//!
//! ## Non-goals
//!
//! * This module does not perform calculations; it only stores results.

use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::algorithms::autoregressive::AutoregressiveEstimate;
use crate::algorithms::ols::OlsFit;
use crate::algorithms::simulation::SimulatedOutcome;
use crate::algorithms::spatial_error::SpatialErrorFit;
use crate::algorithms::spatial_lag::SpatialLagFit;
use crate::algorithms::weights::WeightsConstants;
use crate::evaluation::moran::{MoranPermutationTest, MoranTest};
use crate::evaluation::residual_moran::ResidualMoranTest;
use crate::primitives::frame::ModelFrame;

// ============================================================================
// Regression Report
// ============================================================================

/// Fitted models and autocorrelation tests for one data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Ordinary least squares fit.
    pub ols: OlsFit,
    /// Spatial error fit.
    pub spatial_error: SpatialErrorFit,
    /// Spatial lag fit, when requested.
    pub spatial_lag: Option<SpatialLagFit>,
    /// Moran's I of the OLS residuals, treated as a plain variable.
    pub ols_moran: MoranTest,
    /// Moran's I of the OLS residuals with regression-adjusted moments.
    pub ols_residual_moran: ResidualMoranTest,
    /// Moran's I of the spatial error model's filtered residuals.
    pub spatial_error_moran: MoranTest,
    /// Permutation test of the OLS residuals, when requested.
    pub permutation: Option<MoranPermutationTest>,
    /// Summary constants of the weights relation.
    pub weights: WeightsConstants,
    /// Input frame with `residuals` and `lag_residuals` appended.
    pub frame: ModelFrame,
}

fn write_parameter(f: &mut Formatter<'_>, name: &str, est: &AutoregressiveEstimate) -> Result {
    writeln!(
        f,
        "  {name}: {:.6} (SE {:.6}, z {:.3}, p {:.4e})",
        est.estimate, est.std_error, est.z_value, est.p_value
    )
}

fn write_moran(f: &mut Formatter<'_>, label: &str, test: &MoranTest) -> Result {
    writeln!(
        f,
        "  {label:<24} I = {:>9.6}  E[I] = {:>9.6}  Var = {:.6e}  z = {:>7.3}  p = {:.4e}",
        test.statistic, test.expectation, test.variance, test.std_deviate, test.p_value
    )
}

impl Display for RegressionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Units:        {}", self.weights.n)?;
        writeln!(f, "  Isolates:     {}", self.weights.isolates)?;
        writeln!(f, "  S0:           {:.4}", self.weights.s0)?;
        writeln!(f)?;

        writeln!(f, "OLS:")?;
        write!(f, "{}", self.ols.coefficients)?;
        writeln!(
            f,
            "  sigma^2: {:.6}  R^2: {:.4}  adj. R^2: {:.4}  logLik: {:.3}  AIC: {:.3}",
            self.ols.sigma2,
            self.ols.r_squared,
            self.ols.adj_r_squared,
            self.ols.log_likelihood,
            self.ols.aic
        )?;
        writeln!(f)?;

        let sem = &self.spatial_error;
        writeln!(f, "Spatial error model:")?;
        write!(f, "{}", sem.coefficients)?;
        write_parameter(f, "lambda", &sem.lambda)?;
        writeln!(
            f,
            "  sigma^2: {:.6}  logLik: {:.3}  AIC: {:.3}  LR: {:.3} (p {:.4e})",
            sem.sigma2, sem.log_likelihood, sem.aic, sem.lr_test.statistic, sem.lr_test.p_value
        )?;
        writeln!(f)?;

        if let Some(slm) = &self.spatial_lag {
            writeln!(f, "Spatial lag model:")?;
            write!(f, "{}", slm.coefficients)?;
            write_parameter(f, "rho", &slm.rho)?;
            writeln!(
                f,
                "  sigma^2: {:.6}  logLik: {:.3}  AIC: {:.3}  LR: {:.3} (p {:.4e})",
                slm.sigma2, slm.log_likelihood, slm.aic, slm.lr_test.statistic, slm.lr_test.p_value
            )?;
            writeln!(f)?;
        }

        writeln!(f, "Moran's I:")?;
        write_moran(f, "OLS residuals", &self.ols_moran)?;
        let r = &self.ols_residual_moran;
        writeln!(
            f,
            "  {:<24} I = {:>9.6}  E[I] = {:>9.6}  Var = {:.6e}  z = {:>7.3}  p = {:.4e}",
            "OLS residuals (lm)", r.statistic, r.expectation, r.variance, r.std_deviate, r.p_value
        )?;
        write_moran(f, "SEM filtered residuals", &self.spatial_error_moran)?;
        if let Some(perm) = &self.permutation {
            writeln!(
                f,
                "  {:<24} I = {:>9.6}  rank = {}/{}  p = {:.4}",
                "OLS residuals (perm)",
                perm.statistic,
                perm.rank,
                perm.permutations + 1,
                perm.p_value
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Simulation Report
// ============================================================================

/// Output of a synthetic walkthrough run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Seed the run was drawn from.
    pub seed: u64,
    /// Flattened coordinates `[x0, y0, x1, y1, ...]`.
    pub coords: Vec<f64>,
    /// Simulated outcome and its noise components.
    pub outcome: SimulatedOutcome,
    /// True coefficients, intercept first.
    pub true_coefficients: Vec<f64>,
    /// Fitted models and tests.
    pub regression: RegressionReport,
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Simulation:")?;
        writeln!(f, "  Seed:         {}", self.seed)?;
        writeln!(f, "  Data points:  {}", self.coords.len() / 2)?;
        write!(f, "  True coefs:  ")?;
        for b in &self.true_coefficients {
            write!(f, " {b}")?;
        }
        writeln!(f)?;
        writeln!(f)?;
        write!(f, "{}", self.regression)
    }
}
