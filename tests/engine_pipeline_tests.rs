//! Tests for the execution engine.
//!
//! ## Test Organization
//!
//! 1. **Configuration** - Defaults, validation, serde round trips
//! 2. **Simulation Pipeline** - End-to-end walkthrough runs
//! 3. **Analysis** - Fitting user data with given weights

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use spatialreg_rs::internals::algorithms::simulation::CovariateSpec;
use spatialreg_rs::internals::algorithms::weights::{IsolatePolicy, SpatialWeights, WeightStyle};
use spatialreg_rs::internals::engine::config::SimulationConfig;
use spatialreg_rs::internals::engine::output::SimulationReport;
use spatialreg_rs::internals::engine::pipeline::{AnalysisSettings, SimulationPipeline, analyse};
use spatialreg_rs::internals::evaluation::moran::VarianceAssumption;
use spatialreg_rs::internals::math::linalg::LogDetMethod;
use spatialreg_rs::internals::math::normal::Alternative;
use spatialreg_rs::internals::primitives::errors::SpatialError;
use spatialreg_rs::internals::primitives::frame::{
    LAG_RESIDUALS_COLUMN, ModelFrame, RESIDUALS_COLUMN,
};

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = SimulationConfig::default();
    assert_eq!(config.sample_size, 100);
    assert_eq!(config.k, 15);
    assert_eq!(config.rho, 30.0);
    assert_eq!(config.coefficients, vec![2.0, 0.1, 0.05, 0.03]);
    assert_eq!(config.covariate_names(), vec!["treatment", "x1", "x2"]);
    assert_eq!(config.assumption, VarianceAssumption::Randomisation);
    assert_eq!(config.alternative, Alternative::TwoSided);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_json_round_trip() {
    let config = SimulationConfig {
        seed: 7,
        permutations: Some(99),
        fit_spatial_lag: true,
        log_det: LogDetMethod::Eigen {
            max_iterations: 3000,
        },
        ..SimulationConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: SimulationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_config_partial_json_uses_defaults() {
    let config: SimulationConfig =
        serde_json::from_str(r#"{ "sample_size": 50, "k": 5 }"#).unwrap();
    assert_eq!(config.sample_size, 50);
    assert_eq!(config.k, 5);
    assert_eq!(config.seed, 42);
    assert_eq!(config.covariates.len(), 3);
    assert_eq!(config.log_det, LogDetMethod::Auto);
}

#[test]
fn test_config_validation_errors() {
    let too_many_neighbours = SimulationConfig {
        sample_size: 10,
        k: 10,
        ..SimulationConfig::default()
    };
    assert_eq!(
        too_many_neighbours.validate(),
        Err(SpatialError::InvalidNeighborCount { k: 10, n: 10 })
    );

    let duplicate_names = SimulationConfig {
        covariates: vec![
            CovariateSpec::normal("x", 0.0, 1.0),
            CovariateSpec::normal("x", 0.0, 1.0),
        ],
        coefficients: vec![1.0, 1.0, 1.0],
        ..SimulationConfig::default()
    };
    assert_eq!(
        duplicate_names.validate(),
        Err(SpatialError::DuplicateColumn("x".into()))
    );

    let bad_noise = SimulationConfig {
        noise_sd: -1.0,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        bad_noise.validate(),
        Err(SpatialError::InvalidDistribution { .. })
    ));

    let zero_permutations = SimulationConfig {
        permutations: Some(0),
        ..SimulationConfig::default()
    };
    assert_eq!(
        zero_permutations.validate(),
        Err(SpatialError::InvalidPermutations(0))
    );

    let zero_eigen_cap = SimulationConfig {
        log_det: LogDetMethod::Eigen { max_iterations: 0 },
        ..SimulationConfig::default()
    };
    assert_eq!(
        zero_eigen_cap.validate(),
        Err(SpatialError::InvalidIterations(0))
    );

    assert!(SimulationPipeline::new(SimulationConfig {
        coefficients: vec![1.0],
        ..SimulationConfig::default()
    })
    .is_err());
}

// ============================================================================
// Simulation Pipeline Tests
// ============================================================================

#[test]
fn test_walkthrough_detects_autocorrelation() {
    let pipeline = SimulationPipeline::new(SimulationConfig::default()).unwrap();
    let report = pipeline.run().unwrap();
    let regression = &report.regression;

    assert_eq!(report.seed, 42);
    assert_eq!(report.coords.len(), 200);
    assert_eq!(report.outcome.y.len(), 100);
    assert_eq!(regression.ols.coefficients.len(), 4);
    assert_eq!(regression.weights.n, 100);
    assert_relative_eq!(regression.weights.s0, 100.0, epsilon = 1e-9);

    // Strongly filtered noise leaves OLS residuals autocorrelated.
    assert!(regression.ols_moran.statistic > regression.ols_moran.expectation);
    assert!(regression.ols_moran.p_value < 0.05);
    assert!(regression.ols_residual_moran.p_value < 0.05);
    assert!(regression.spatial_error.lambda.estimate > 0.0);
    assert!(regression.spatial_lag.is_none());
    assert!(regression.permutation.is_none());
}

#[test]
fn test_walkthrough_finishes_with_every_model() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let config = SimulationConfig {
            fit_spatial_lag: true,
            ..SimulationConfig::default()
        };
        let _ = tx.send(SimulationPipeline::new(config).and_then(|p| p.run()));
    });

    let report = rx
        .recv_timeout(Duration::from_secs(180))
        .expect("walkthrough did not finish")
        .unwrap();
    assert!(report.regression.ols_moran.p_value < 0.05);
    assert!(report.regression.spatial_lag.is_some());
}

#[test]
fn test_walkthrough_appends_residual_columns() {
    let report = SimulationPipeline::new(SimulationConfig::default())
        .unwrap()
        .run()
        .unwrap();
    let frame = &report.regression.frame;

    assert_eq!(frame.n_cols(), 5);
    let residuals = frame.column(RESIDUALS_COLUMN).unwrap();
    assert_eq!(residuals, report.regression.ols.residuals.as_slice());
    assert_eq!(frame.column(LAG_RESIDUALS_COLUMN).unwrap().len(), 100);
}

#[test]
fn test_walkthrough_is_reproducible() {
    let config = SimulationConfig {
        sample_size: 60,
        k: 5,
        permutations: Some(49),
        ..SimulationConfig::default()
    };
    let a = SimulationPipeline::new(config.clone()).unwrap().run().unwrap();
    let b = SimulationPipeline::new(config.clone()).unwrap().run().unwrap();
    assert_eq!(a, b);

    let c = SimulationPipeline::new(SimulationConfig { seed: 43, ..config })
        .unwrap()
        .run()
        .unwrap();
    assert_ne!(a.coords, c.coords);
}

#[test]
fn test_walkthrough_with_all_stages() {
    let config = SimulationConfig {
        sample_size: 80,
        k: 6,
        rho: 0.8,
        permutations: Some(99),
        fit_spatial_lag: true,
        ..SimulationConfig::default()
    };
    let report = SimulationPipeline::new(config).unwrap().run().unwrap();
    let slm = report.regression.spatial_lag.as_ref().unwrap();
    assert_eq!(slm.coefficients.len(), 4);
    let perm = report.regression.permutation.as_ref().unwrap();
    assert_eq!(perm.permutations, 99);

    let rendered = report.to_string();
    assert!(rendered.starts_with("Simulation:"));
    assert!(rendered.contains("Spatial error model:"));
    assert!(rendered.contains("Spatial lag model:"));
    assert!(rendered.contains("OLS residuals (perm)"));
}

#[test]
fn test_report_json_export() {
    let config = SimulationConfig {
        sample_size: 40,
        k: 4,
        ..SimulationConfig::default()
    };
    let report = SimulationPipeline::new(config).unwrap().run().unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["seed"], 42);
    assert!(json["regression"]["spatial_error"]["lambda"]["estimate"].is_number());
    assert_eq!(json["regression"]["frame"]["names"][3], RESIDUALS_COLUMN);

    let back: SimulationReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.regression.frame.names(), report.regression.frame.names());
    assert_eq!(back.coords.len(), report.coords.len());
}

// ============================================================================
// Analysis Tests
// ============================================================================

#[test]
fn test_analyse_user_data() {
    let n = 12;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 0.5 + 1.5 * i as f64 + if i % 3 == 0 { 0.4 } else { -0.2 })
        .collect();
    let frame = ModelFrame::from_columns([("x", x)]).unwrap();
    let lists = (0..n)
        .map(|i| {
            let mut l = Vec::new();
            if i > 0 {
                l.push(i - 1);
            }
            if i + 1 < n {
                l.push(i + 1);
            }
            l
        })
        .collect();
    let weights =
        SpatialWeights::from_neighbors(lists, WeightStyle::RowStandardized, IsolatePolicy::ZeroRow)
            .unwrap();

    let report = analyse(
        &y,
        frame,
        &["x"],
        &weights,
        &AnalysisSettings::default(),
        &mut ChaCha8Rng::seed_from_u64(0),
    )
    .unwrap();

    assert_relative_eq!(report.ols.coefficients.estimate("x").unwrap(), 1.5, epsilon = 0.05);
    assert_eq!(report.frame.n_cols(), 3);
    let summary = report.to_string();
    assert!(summary.starts_with("Summary:"));
    assert!(summary.contains("OLS:"));
}

#[test]
fn test_analyse_unknown_predictor() {
    let frame = ModelFrame::from_columns([("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])]).unwrap();
    let weights = SpatialWeights::from_neighbors(
        vec![vec![1], vec![0, 2], vec![1, 3], vec![2, 4], vec![3]],
        WeightStyle::RowStandardized,
        IsolatePolicy::ZeroRow,
    )
    .unwrap();
    let result = analyse(
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        frame,
        &["z"],
        &weights,
        &AnalysisSettings::default(),
        &mut ChaCha8Rng::seed_from_u64(0),
    );
    assert_eq!(result.unwrap_err(), SpatialError::UnknownColumn("z".into()));
}
