//! Tests for synthetic data generation and outcome simulation.
//!
//! ## Test Organization
//!
//! 1. **Generator** - Shapes, ranges, reproducibility
//! 2. **Validation** - Rejected parameters
//! 3. **Outcome** - Filtered noise and linear predictor

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use spatialreg_rs::internals::algorithms::simulation::{
    CovariateDistribution, CovariateSpec, Extent, OutcomeSimulator, SyntheticGenerator,
};
use spatialreg_rs::internals::algorithms::weights::{IsolatePolicy, SpatialWeights, WeightStyle};
use spatialreg_rs::internals::math::distance::DistanceMetric;
use spatialreg_rs::internals::primitives::errors::SpatialError;
use spatialreg_rs::internals::primitives::frame::ModelFrame;

fn default_covariates() -> Vec<CovariateSpec> {
    vec![
        CovariateSpec::bernoulli("treatment", 0.5),
        CovariateSpec::normal("x1", 0.0, 1.0),
        CovariateSpec::uniform("x2", -1.0, 1.0),
    ]
}

// ============================================================================
// Generator Tests
// ============================================================================

#[test]
fn test_generate_shapes_and_ranges() {
    let covariates = default_covariates();
    let extent = Extent {
        x_min: -2.0,
        x_max: 2.0,
        y_min: 10.0,
        y_max: 11.0,
    };
    let generator = SyntheticGenerator {
        sample_size: 250,
        extent,
        covariates: &covariates,
    };
    let data = generator
        .generate(&mut ChaCha8Rng::seed_from_u64(42))
        .unwrap();

    assert_eq!(data.len(), 250);
    assert_eq!(data.coords.len(), 500);
    assert_eq!(data.covariates.n_rows(), 250);
    assert_eq!(data.covariates.n_cols(), 3);

    for point in data.coords.chunks_exact(2) {
        assert!((-2.0..2.0).contains(&point[0]));
        assert!((10.0..11.0).contains(&point[1]));
    }
    for &t in data.covariates.column("treatment").unwrap() {
        assert!(t == 0.0 || t == 1.0);
    }
    for &v in data.covariates.column("x2").unwrap() {
        assert!((-1.0..1.0).contains(&v));
    }
}

#[test]
fn test_generate_is_reproducible() {
    let covariates = default_covariates();
    let generator = SyntheticGenerator {
        sample_size: 50,
        extent: Extent::default(),
        covariates: &covariates,
    };

    let a = generator.generate(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();
    let b = generator.generate(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();
    let c = generator.generate(&mut ChaCha8Rng::seed_from_u64(8)).unwrap();

    assert_eq!(a, b);
    assert_ne!(a.coords, c.coords);
}

#[test]
fn test_generate_covariate_moments() {
    let covariates = vec![
        CovariateSpec::normal("x", 3.0, 2.0),
        CovariateSpec::bernoulli("d", 0.3),
    ];
    let data = SyntheticGenerator {
        sample_size: 20_000,
        extent: Extent::default(),
        covariates: &covariates,
    }
    .generate(&mut ChaCha8Rng::seed_from_u64(1))
    .unwrap();

    let x = data.covariates.column("x").unwrap();
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (x.len() - 1) as f64;
    assert_relative_eq!(mean, 3.0, epsilon = 0.1);
    assert_relative_eq!(var.sqrt(), 2.0, epsilon = 0.1);

    let d = data.covariates.column("d").unwrap();
    let share = d.iter().sum::<f64>() / d.len() as f64;
    assert_relative_eq!(share, 0.3, epsilon = 0.02);
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_generator_rejects_zero_sample_size() {
    let covariates = default_covariates();
    let generator = SyntheticGenerator {
        sample_size: 0,
        extent: Extent::default(),
        covariates: &covariates,
    };
    assert_eq!(
        generator.validate().unwrap_err(),
        SpatialError::InvalidSampleSize(0)
    );
}

#[test]
fn test_generator_rejects_bad_extent() {
    let extent = Extent {
        x_min: 1.0,
        x_max: 0.0,
        y_min: 0.0,
        y_max: 1.0,
    };
    assert!(matches!(
        extent.validate(),
        Err(SpatialError::InvalidExtent { .. })
    ));
    let infinite = Extent {
        y_max: f64::INFINITY,
        ..Extent::default()
    };
    assert!(infinite.validate().is_err());
}

#[test]
fn test_distribution_validation() {
    let cases = [
        CovariateDistribution::Normal { mean: 0.0, sd: 0.0 },
        CovariateDistribution::Normal {
            mean: f64::NAN,
            sd: 1.0,
        },
        CovariateDistribution::Uniform {
            low: 1.0,
            high: 1.0,
        },
        CovariateDistribution::Bernoulli { p: 1.5 },
    ];
    for dist in cases {
        match dist.validate("x") {
            Err(SpatialError::InvalidDistribution { name, .. }) => assert_eq!(name, "x"),
            other => panic!("expected InvalidDistribution, got {other:?}"),
        }
    }
    assert!(CovariateDistribution::Bernoulli { p: 0.0 }.validate("x").is_ok());
}

#[test]
fn test_generator_validates_before_drawing() {
    let covariates = vec![CovariateSpec::normal("x", 0.0, -1.0)];
    let generator = SyntheticGenerator {
        sample_size: 10,
        extent: Extent::default(),
        covariates: &covariates,
    };
    assert!(matches!(
        generator.generate(&mut ChaCha8Rng::seed_from_u64(0)),
        Err(SpatialError::InvalidDistribution { .. })
    ));
}

// ============================================================================
// Outcome Tests
// ============================================================================

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
    SpatialWeights::from_neighbors(lists, WeightStyle::RowStandardized, IsolatePolicy::ZeroRow)
        .unwrap()
}

#[test]
fn test_outcome_decomposition() {
    let n = 40;
    let frame = ModelFrame::from_columns([
        ("a", (0..n).map(|i| i as f64).collect()),
        ("b", (0..n).map(|i| (i % 3) as f64).collect()),
    ])
    .unwrap();
    let weights = line_weights(n);
    let coefficients = [1.0, 0.5, -2.0];

    let outcome = OutcomeSimulator {
        coefficients: &coefficients,
        rho: 3.0,
        noise_sd: 0.7,
    }
    .simulate(&frame, &weights, &mut ChaCha8Rng::seed_from_u64(9))
    .unwrap();

    let lagged = weights.lag(&outcome.noise).unwrap();
    let a = frame.column("a").unwrap();
    let b = frame.column("b").unwrap();
    for i in 0..n {
        let filtered = 3.0 * lagged[i] + outcome.noise[i];
        assert_relative_eq!(outcome.filtered_noise[i], filtered, epsilon = 1e-12);
        let linear = 1.0 + 0.5 * a[i] - 2.0 * b[i];
        assert_relative_eq!(outcome.y[i], linear + filtered, epsilon = 1e-12);
    }
}

#[test]
fn test_outcome_without_filter_is_plain_noise() {
    let frame = ModelFrame::from_columns([("x", vec![0.0; 5])]).unwrap();
    let outcome = OutcomeSimulator {
        coefficients: &[2.0, 1.0],
        rho: 0.0,
        noise_sd: 1.0,
    }
    .simulate(&frame, &line_weights(5), &mut ChaCha8Rng::seed_from_u64(1))
    .unwrap();
    assert_eq!(outcome.noise, outcome.filtered_noise);
}

#[test]
fn test_outcome_validation() {
    let frame = ModelFrame::from_columns([("x", vec![0.0; 5])]).unwrap();
    let weights = line_weights(5);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let wrong_count = OutcomeSimulator {
        coefficients: &[1.0],
        rho: 1.0,
        noise_sd: 1.0,
    };
    assert_eq!(
        wrong_count.simulate(&frame, &weights, &mut rng).unwrap_err(),
        SpatialError::CoefficientCountMismatch {
            expected: 2,
            got: 1
        }
    );

    let bad_noise = OutcomeSimulator {
        coefficients: &[1.0, 1.0],
        rho: 1.0,
        noise_sd: 0.0,
    };
    assert!(matches!(
        bad_noise.simulate(&frame, &weights, &mut rng),
        Err(SpatialError::InvalidDistribution { .. })
    ));

    let mismatched = OutcomeSimulator {
        coefficients: &[1.0, 1.0],
        rho: 1.0,
        noise_sd: 1.0,
    };
    assert!(matches!(
        mismatched.simulate(&frame, &line_weights(6), &mut rng),
        Err(SpatialError::MismatchedInputs { .. })
    ));
}
