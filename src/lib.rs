//! # spatialreg-rs — Spatial Regression and Autocorrelation Tests for Rust
//!
//! A strongly typed toolkit for the classic spatial regression workflow:
//! simulate spatially autocorrelated data, build a neighbour relation, fit
//! non-spatial and spatial models, and test the residuals with Moran's I.
//!
//! ## What is spatial regression?
//!
//! Observations tied to places are rarely independent: nearby units tend to
//! share unobserved influences. Ordinary least squares ignores this, so its
//! residuals stay spatially autocorrelated and its standard errors are off.
//! Spatial simultaneous autoregressive (SAR) models add one parameter that
//! captures the dependence through a spatial weights matrix `W`:
//!
//! - **Spatial error model**: `y = Xβ + u`, `u = λWu + ε`
//! - **Spatial lag model**: `y = ρWy + Xβ + ε`
//!
//! **Moran's I** measures whether neighbouring values are more alike than
//! chance would predict; it is the standard diagnostic for regression residuals.
//!
//! **Workflow:**
//!
//! 1. Generate N random locations and independent covariates (seeded)
//! 2. Link each location to its k nearest neighbours and row-standardise
//! 3. Simulate `y = Xβ + ρ·W·ε + ε` so the errors are spatially correlated
//! 4. Fit OLS and the spatial error model (optionally the spatial lag model)
//! 5. Test OLS residuals and spatially filtered residuals with Moran's I
//! 6. Append the residuals and their spatial lag to the data frame
//!
//! ## Quick Start
//!
//! ### Synthetic Walkthrough
//!
//! ```rust
//! use spatialreg_rs::prelude::*;
//!
//! let report = Simulation::new()
//!     .sample_size(100)   // 100 random locations in the unit square
//!     .neighbors(15)      // 15 nearest neighbours per unit
//!     .rho(30.0)          // Strength of the noise filter
//!     .seed(7)            // Reproducible stream
//!     .run()?;
//!
//! println!("{}", report);
//! # Result::<(), SpatialError>::Ok(())
//! ```
//!
//! ### Your Own Data
//!
//! ```rust
//! use spatialreg_rs::prelude::*;
//!
//! // Six units on a line, each adjacent to the next
//! let frame = ModelFrame::from_columns([
//!     ("y", vec![1.2, 1.9, 3.2, 3.8, 5.1, 6.3]),
//!     ("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
//! ])?;
//! let weights = SpatialWeights::from_neighbors(
//!     vec![vec![1], vec![0, 2], vec![1, 3], vec![2, 4], vec![3, 5], vec![4]],
//!     RowStandardized,
//!     ZeroRow,
//! )?;
//!
//! let model = Regression::new().response("y").build()?;
//! match model.fit(&frame, &weights) {
//!     Ok(report) => println!("{}", report.ols.coefficients),
//!     Err(e) => eprintln!("Fitting failed: {}", e),
//! }
//! # Result::<(), SpatialError>::Ok(())
//! ```
//!
//! ## Parameters
//!
//! | Parameter               | Default          | Range/Options                     | Description                               |
//! |-------------------------|------------------|-----------------------------------|-------------------------------------------|
//! | **sample_size**         | 100              | [1, ∞)                            | Number of synthetic units                 |
//! | **extent**              | unit square      | finite, non-empty                 | Coordinate range                          |
//! | **covariates**          | treatment, x1, x2| Normal, Uniform, Bernoulli        | Covariate distributions                   |
//! | **coefficients**        | 2.0, 0.1, 0.05, 0.03 | one per covariate + intercept | True coefficients                         |
//! | **neighbors**           | 15               | [1, N)                            | k nearest neighbours                      |
//! | **distance_metric**     | `Euclidean`      | `Euclidean`, `GreatCircle`        | Neighbour search distance                 |
//! | **weight_style**        | `RowStandardized`| `RowStandardized`, `Binary`       | Link weights                              |
//! | **rho**                 | 30.0             | finite                            | Noise filter strength                     |
//! | **noise_sd**            | 1.0              | (0, ∞)                            | Raw noise standard deviation              |
//! | **seed**                | 42               | any u64                           | Random stream seed                        |
//! | **confidence_level**    | 0.95             | (0, 1)                            | Wald interval level                       |
//! | **variance_assumption** | `Randomisation`  | `Normality`, `Randomisation`      | Moran's I variance                        |
//! | **alternative**         | `TwoSided`       | `TwoSided`, `Greater`, `Less`     | Moran's I alternative                     |
//! | **permutations**        | None             | [1, ∞)                            | Moran's I permutation test                |
//! | **spatial_lag**         | false            | flag                              | Also fit the spatial lag model            |
//! | **tolerance**           | 1e-8             | (0, ∞)                            | Autoregressive parameter search tolerance |
//! | **max_iterations**      | 200              | [1, 10000]                        | Autoregressive parameter search cap       |
//!
//! ## Neighbour Policies
//!
//! - **Ties**: equidistant candidates are ranked by index, lowest first. Coincident
//!   points are ordinary neighbours at distance zero; a unit never neighbours itself.
//! - **k ≥ N**: rejected with `InvalidNeighborCount`, never clamped.
//! - **Isolates** (contiguity only): `ZeroRow` keeps an all-zero row, `Reject` fails.
//!   Moran's I moments use N minus the number of isolates.
//!
//! ## Logging
//!
//! Pipeline stages emit `tracing` events at `debug` level and the optimiser
//! emits one `trace` event per step. Install any subscriber to see them.
//!
//! ## References
//!
//! - Moran, P. A. P. (1950). "Notes on Continuous Stochastic Phenomena"
//! - Cliff, A. D. & Ord, J. K. (1981). "Spatial Processes: Models and Applications"
//! - Anselin, L. (1988). "Spatial Econometrics: Methods and Models"
//!
//! ## License
//!
//! See the repository for license information and contribution guidelines.

#![deny(missing_docs)]

// ============================================================================
// Internal Modules
// ============================================================================

// Layer 1: Primitives - data structures and basic utilities.
//
// Contains the error type, neighbour search buffers, and the named-column
// `ModelFrame` with its design matrices.
mod primitives;

// Layer 2: Math - pure mathematical functions.
//
// Contains distance metrics, the KD-tree, dense linear algebra, normal and
// chi-square tails, and Brent's minimiser.
mod math;

// Layer 3: Algorithms - core spatial statistics.
//
// Contains spatial weights, the synthetic generator and outcome simulator,
// OLS, and the spatial error and spatial lag fitters.
mod algorithms;

// Layer 4: Evaluation - post-fit diagnostics.
//
// Contains Moran's I (analytic and permutation) and the regression-adjusted
// Moran's I for OLS residuals.
mod evaluation;

// Layer 5: Engine - orchestration and execution control.
//
// Contains validation, run configuration, the sequential pipeline, and reports.
mod engine;

// High-level fluent API.
//
// Provides the `Simulation` and `Regression` builders.
mod api;

// ============================================================================
// Prelude
// ============================================================================

/// Standard spatial regression prelude.
///
/// This module is intended to be wildcard-imported for convenient access
/// to the most commonly used types:
///
/// ```
/// use spatialreg_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{
        Alternative::{Greater, Less, TwoSided},
        CoefficientTable, CovariateDistribution, CovariateSpec,
        DistanceMetric::{Euclidean, GreatCircle},
        Extent,
        IsolatePolicy::{Reject, ZeroRow},
        LogDetMethod,
        ModelFrame, MoranPermutationTest, MoranTest, OlsFit, RegressionBuilder as Regression,
        RegressionModel, RegressionReport, ResidualMoranTest, SimulationBuilder as Simulation,
        SimulationPipeline, SimulationReport, SpatialError, SpatialErrorFit, SpatialLagFit, SpatialWeights,
        VarianceAssumption::{Normality, Randomisation},
        WeightStyle::{Binary, RowStandardized},
    };
    pub use crate::engine::config::SimulationConfig;
}

// ============================================================================
// Testing re-exports
// ============================================================================

/// Internal modules for development and testing.
///
/// This module re-exports internal modules for development and testing purposes.
///
/// **Warning**: These are internal implementation details and may change without notice.
/// Do not use in production code.
#[doc(hidden)]
pub mod internals {
    /// Internal primitive types and utilities.
    pub mod primitives {
        pub use crate::primitives::*;
    }
    /// Internal math functions.
    pub mod math {
        pub use crate::math::*;
    }
    /// Internal core algorithms.
    pub mod algorithms {
        pub use crate::algorithms::*;
    }
    /// Internal execution engine.
    pub mod engine {
        pub use crate::engine::*;
    }
    /// Internal evaluation and diagnostics.
    pub mod evaluation {
        pub use crate::evaluation::*;
    }
    /// Internal API.
    pub mod api {
        pub use crate::api::*;
    }
}
