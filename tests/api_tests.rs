//! Tests for the high-level builders.
//!
//! ## Test Organization
//!
//! 1. **Simulation Builder** - Defaults, overrides, duplicate detection
//! 2. **Regression Builder** - Validation and fitting user data

use approx::assert_relative_eq;
use spatialreg_rs::internals::primitives::frame::{LAG_RESIDUALS_COLUMN, RESIDUALS_COLUMN};
use spatialreg_rs::prelude::*;

fn line_weights(n: usize) -> SpatialWeights {
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
    SpatialWeights::from_neighbors(lists, RowStandardized, ZeroRow).unwrap()
}

fn line_frame(n: usize) -> ModelFrame {
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let z: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 1.0 + 0.5 * x[i] - 0.3 * z[i] + (i as f64 * 1.3).sin() * 0.2)
        .collect();
    ModelFrame::from_columns([("y", y), ("x", x), ("z", z)]).unwrap()
}

// ============================================================================
// Simulation Builder Tests
// ============================================================================

#[test]
fn test_simulation_builder_defaults_match_config() {
    let builder = Simulation::new();
    assert_eq!(builder.to_config(), SimulationConfig::default());
}

#[test]
fn test_simulation_builder_overrides() {
    let pipeline = Simulation::new()
        .sample_size(60)
        .neighbors(5)
        .rho(2.0)
        .noise_sd(0.5)
        .seed(11)
        .extent(0.0, 10.0, 0.0, 5.0)
        .covariates(vec![CovariateSpec::uniform("u", 0.0, 1.0)])
        .coefficients(vec![1.0, 3.0])
        .weight_style(Binary)
        .distance_metric(Euclidean)
        .confidence_level(0.9)
        .variance_assumption(Normality)
        .alternative(Greater)
        .permutations(19)
        .spatial_lag()
        .tolerance(1e-6)
        .max_iterations(100)
        .build()
        .unwrap();

    let config = pipeline.config();
    assert_eq!(config.sample_size, 60);
    assert_eq!(config.k, 5);
    assert_eq!(config.covariate_names(), vec!["u"]);
    assert_eq!(config.level, 0.9);
    assert_eq!(config.permutations, Some(19));
    assert!(config.fit_spatial_lag);

    let report = pipeline.run().unwrap();
    assert_eq!(report.coords.len(), 120);
    for point in report.coords.chunks_exact(2) {
        assert!((0.0..10.0).contains(&point[0]));
        assert!((0.0..5.0).contains(&point[1]));
    }
    assert!(report.regression.spatial_lag.is_some());
    assert_eq!(report.regression.ols_moran.alternative, Greater);
    assert_eq!(report.regression.ols.coefficients.level, 0.9);
}

#[test]
fn test_simulation_builder_duplicate_parameter() {
    let result = Simulation::new().seed(1).seed(2).build();
    assert_eq!(
        result.unwrap_err(),
        SpatialError::DuplicateParameter { parameter: "seed" }
    );

    let result = Simulation::new().spatial_lag().spatial_lag().run();
    assert!(matches!(
        result,
        Err(SpatialError::DuplicateParameter {
            parameter: "spatial_lag"
        })
    ));
}

#[test]
fn test_simulation_builder_validation() {
    assert_eq!(
        Simulation::new().sample_size(10).neighbors(10).build().unwrap_err(),
        SpatialError::InvalidNeighborCount { k: 10, n: 10 }
    );
    assert!(matches!(
        Simulation::new().coefficients(vec![1.0, 2.0]).build(),
        Err(SpatialError::CoefficientCountMismatch { .. })
    ));
    assert!(matches!(
        Simulation::new().extent(1.0, 0.0, 0.0, 1.0).build(),
        Err(SpatialError::InvalidExtent { .. })
    ));
    assert!(matches!(
        Simulation::new().confidence_level(1.5).build(),
        Err(SpatialError::InvalidIntervals(_))
    ));
}

#[test]
fn test_simulation_builder_from_config() {
    let config = SimulationConfig {
        sample_size: 30,
        k: 3,
        ..SimulationConfig::default()
    };
    let builder = Simulation::from_config(config.clone());
    assert_eq!(builder.to_config(), config);
    assert!(builder.build().is_ok());
}

#[test]
fn test_simulation_run_matches_pipeline() {
    let a = Simulation::new().sample_size(40).neighbors(4).run().unwrap();
    let b = Simulation::new()
        .sample_size(40)
        .neighbors(4)
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Regression Builder Tests
// ============================================================================

#[test]
fn test_regression_requires_response() {
    assert!(matches!(
        Regression::new().build(),
        Err(SpatialError::InvalidInput(_))
    ));
}

#[test]
fn test_regression_rejects_response_as_predictor() {
    assert_eq!(
        Regression::new()
            .response("y")
            .predictors(["x", "y"])
            .build()
            .unwrap_err(),
        SpatialError::DuplicateColumn("y".into())
    );
    assert_eq!(
        Regression::new()
            .response("y")
            .predictors(["x", "x"])
            .build()
            .unwrap_err(),
        SpatialError::DuplicateColumn("x".into())
    );
}

#[test]
fn test_regression_builder_validation() {
    assert!(matches!(
        Regression::new().response("y").tolerance(-1.0).build(),
        Err(SpatialError::InvalidTolerance(_))
    ));
    assert!(matches!(
        Regression::new().response("y").permutations(0).build(),
        Err(SpatialError::InvalidPermutations(0))
    ));
    assert!(matches!(
        Regression::new().response("y").response("z").build(),
        Err(SpatialError::DuplicateParameter {
            parameter: "response"
        })
    ));
}

#[test]
fn test_regression_fit_defaults_to_all_other_columns() {
    let frame = line_frame(30);
    let weights = line_weights(30);
    let model = Regression::new().response("y").build().unwrap();
    let report = model.fit(&frame, &weights).unwrap();

    assert_eq!(report.ols.coefficients.names, vec!["(Intercept)", "x", "z"]);
    assert_relative_eq!(report.ols.coefficients.estimate("x").unwrap(), 0.5, epsilon = 0.05);
    assert_relative_eq!(report.ols.coefficients.estimate("z").unwrap(), -0.3, epsilon = 0.1);
    assert!(report.frame.contains(RESIDUALS_COLUMN));
    assert!(report.frame.contains(LAG_RESIDUALS_COLUMN));
    // The caller's frame is untouched.
    assert_eq!(frame.n_cols(), 3);
}

#[test]
fn test_regression_fit_selected_predictors() {
    let frame = line_frame(30);
    let weights = line_weights(30);
    let model = Regression::new()
        .response("y")
        .predictors(["x"])
        .spatial_lag()
        .permutations(49)
        .seed(3)
        .build()
        .unwrap();
    let report = model.fit(&frame, &weights).unwrap();

    assert_eq!(report.ols.coefficients.len(), 2);
    assert!(report.spatial_lag.is_some());
    assert_eq!(report.permutation.as_ref().unwrap().permutations, 49);

    // Same seed, same permutation result.
    let again = model.fit(&frame, &weights).unwrap();
    assert_eq!(report.permutation, again.permutation);
}

#[test]
fn test_regression_fit_errors() {
    let frame = line_frame(10);
    let model = Regression::new().response("missing").build().unwrap();
    assert_eq!(
        model.fit(&frame, &line_weights(10)).unwrap_err(),
        SpatialError::UnknownColumn("missing".into())
    );

    let model = Regression::new().response("y").build().unwrap();
    assert!(matches!(
        model.fit(&frame, &line_weights(12)),
        Err(SpatialError::MismatchedInputs { .. })
    ));
}

#[test]
fn test_regression_fit_with_coordinates() {
    let frame = line_frame(25);
    let coords: Vec<f64> = (0..25).flat_map(|i| [i as f64, (i % 4) as f64]).collect();
    let model = Regression::new().response("y").build().unwrap();

    let report = model
        .fit_with_coordinates(&frame, &coords, 4, Euclidean)
        .unwrap();
    assert_eq!(report.weights.n, 25);
    assert_relative_eq!(report.weights.s0, 25.0, epsilon = 1e-9);

    assert!(matches!(
        model.fit_with_coordinates(&frame, &coords[..10], 4, Euclidean),
        Err(SpatialError::MismatchedInputs { .. })
    ));
    assert_eq!(
        model
            .fit_with_coordinates(&frame, &coords, 25, Euclidean)
            .unwrap_err(),
        SpatialError::InvalidNeighborCount { k: 25, n: 25 }
    );
}

#[test]
fn test_regression_log_determinant_methods_agree() {
    let frame = line_frame(30);
    let weights = line_weights(30);
    let auto = Regression::new().response("y").build().unwrap();
    let dense = Regression::new()
        .response("y")
        .log_determinant(LogDetMethod::Dense)
        .build()
        .unwrap();

    let a = auto.fit(&frame, &weights).unwrap();
    let d = dense.fit(&frame, &weights).unwrap();
    assert_relative_eq!(
        a.spatial_error.lambda.estimate,
        d.spatial_error.lambda.estimate,
        epsilon = 1e-4
    );
    assert_relative_eq!(
        a.spatial_error.log_likelihood,
        d.spatial_error.log_likelihood,
        epsilon = 1e-6
    );

    assert_eq!(
        Regression::new()
            .response("y")
            .log_determinant(LogDetMethod::Dense)
            .log_determinant(LogDetMethod::Auto)
            .build()
            .unwrap_err(),
        SpatialError::DuplicateParameter {
            parameter: "log_determinant"
        }
    );
    assert_eq!(
        Regression::new()
            .response("y")
            .log_determinant(LogDetMethod::Eigen { max_iterations: 0 })
            .build()
            .unwrap_err(),
        SpatialError::InvalidIterations(0)
    );
}

#[test]
fn test_simulation_builder_log_determinant() {
    let builder = Simulation::new().log_determinant(LogDetMethod::Dense);
    assert_eq!(builder.to_config().log_det, LogDetMethod::Dense);
    assert!(matches!(
        Simulation::new()
            .log_determinant(LogDetMethod::Eigen { max_iterations: 0 })
            .build(),
        Err(SpatialError::InvalidIterations(0))
    ));
}
