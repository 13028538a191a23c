use spatialreg_rs::internals::engine::validator::Validator;
use spatialreg_rs::internals::primitives::errors::SpatialError;

// ============================================================================
// Input Validation Tests
// ============================================================================

#[test]
fn test_validate_coordinates() {
    assert_eq!(Validator::validate_coordinates(&[0.0, 1.0, 2.0, 3.0]), Ok(2));
    assert_eq!(
        Validator::validate_coordinates(&[]),
        Err(SpatialError::EmptyInput)
    );
    assert!(matches!(
        Validator::validate_coordinates(&[0.0, 1.0, 2.0]),
        Err(SpatialError::InvalidInput(_))
    ));
    assert!(matches!(
        Validator::validate_coordinates(&[0.0, f64::NAN]),
        Err(SpatialError::InvalidNumericValue(_))
    ));
}

#[test]
fn test_validate_scalar() {
    assert!(Validator::validate_scalar(1.5, "rho").is_ok());
    assert_eq!(
        Validator::validate_scalar(f64::INFINITY, "rho"),
        Err(SpatialError::InvalidNumericValue("rho=inf".into()))
    );
}

// ============================================================================
// Parameter Validation Tests
// ============================================================================

#[test]
fn test_validate_sample_size() {
    assert!(Validator::validate_sample_size(1).is_ok());
    assert_eq!(
        Validator::validate_sample_size(0),
        Err(SpatialError::InvalidSampleSize(0))
    );
}

#[test]
fn test_validate_neighbor_count() {
    assert!(Validator::validate_neighbor_count(1, 2).is_ok());
    assert!(Validator::validate_neighbor_count(15, 100).is_ok());
    assert_eq!(
        Validator::validate_neighbor_count(0, 10),
        Err(SpatialError::InvalidNeighborCount { k: 0, n: 10 })
    );
    assert_eq!(
        Validator::validate_neighbor_count(10, 10),
        Err(SpatialError::InvalidNeighborCount { k: 10, n: 10 })
    );
}

#[test]
fn test_validate_coefficients() {
    assert!(Validator::validate_coefficients(&[2.0, 0.1, 0.05, 0.03], 3).is_ok());
    assert_eq!(
        Validator::validate_coefficients(&[2.0, 0.1], 3),
        Err(SpatialError::CoefficientCountMismatch {
            expected: 4,
            got: 2
        })
    );
    assert!(matches!(
        Validator::validate_coefficients(&[2.0, f64::NAN], 1),
        Err(SpatialError::InvalidNumericValue(_))
    ));
}

#[test]
fn test_validate_interval_level() {
    assert!(Validator::validate_interval_level(0.95).is_ok());
    for level in [0.0, 1.0, -0.5, f64::NAN] {
        assert!(matches!(
            Validator::validate_interval_level(level),
            Err(SpatialError::InvalidIntervals(_))
        ));
    }
}

#[test]
fn test_validate_optimizer_settings() {
    assert!(Validator::validate_tolerance(1e-8).is_ok());
    assert_eq!(
        Validator::validate_tolerance(0.0),
        Err(SpatialError::InvalidTolerance(0.0))
    );
    assert!(Validator::validate_iterations(200).is_ok());
    assert!(Validator::validate_iterations(10_000).is_ok());
    assert_eq!(
        Validator::validate_iterations(0),
        Err(SpatialError::InvalidIterations(0))
    );
    assert_eq!(
        Validator::validate_iterations(10_001),
        Err(SpatialError::InvalidIterations(10_001))
    );
}

#[test]
fn test_validate_permutations() {
    assert!(Validator::validate_permutations(99).is_ok());
    assert_eq!(
        Validator::validate_permutations(0),
        Err(SpatialError::InvalidPermutations(0))
    );
}

#[test]
fn test_validate_unique_names() {
    assert!(Validator::validate_unique_names(["a", "b", "c"]).is_ok());
    assert_eq!(
        Validator::validate_unique_names(["a", "b", "a"]),
        Err(SpatialError::DuplicateColumn("a".into()))
    );
}

#[test]
fn test_validate_no_duplicates() {
    assert!(Validator::validate_no_duplicates(None).is_ok());
    assert_eq!(
        Validator::validate_no_duplicates(Some("seed")),
        Err(SpatialError::DuplicateParameter { parameter: "seed" })
    );
}
