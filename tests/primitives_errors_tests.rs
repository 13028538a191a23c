use spatialreg_rs::internals::primitives::errors::SpatialError;

#[test]
fn test_spatial_error_display() {
    // EmptyInput
    let err = SpatialError::EmptyInput;
    assert_eq!(format!("{}", err), "Input arrays are empty");

    // InvalidInput
    let err = SpatialError::InvalidInput("test error".to_string());
    assert_eq!(format!("{}", err), "Invalid input: test error");

    // MismatchedInputs
    let err = SpatialError::MismatchedInputs {
        what: "response length",
        expected: 10,
        got: 5,
    };
    assert_eq!(
        format!("{}", err),
        "Length mismatch: expected 10 values for response length, got 5"
    );

    // InvalidNumericValue
    let err = SpatialError::InvalidNumericValue("NaN detected".to_string());
    assert_eq!(format!("{}", err), "Invalid numeric value: NaN detected");

    // TooFewPoints
    let err = SpatialError::TooFewPoints { got: 3, min: 4 };
    assert_eq!(format!("{}", err), "Too few points: got 3, need at least 4");

    // InvalidNeighborCount
    let err = SpatialError::InvalidNeighborCount { k: 10, n: 10 };
    assert_eq!(
        format!("{}", err),
        "Invalid neighbor count: k=10 for 10 points (must be in [1, 10))"
    );

    // NonConvergence
    let err = SpatialError::NonConvergence {
        model: "spatial error",
        iterations: 200,
    };
    assert_eq!(
        format!("{}", err),
        "spatial error fit did not converge after 200 iterations"
    );

    // InvalidIntervals
    let err = SpatialError::InvalidIntervals(1.5);
    assert_eq!(
        format!("{}", err),
        "Invalid interval level: 1.5 (must be > 0 and < 1)"
    );

    // InvalidTolerance
    let err = SpatialError::InvalidTolerance(-1.0);
    assert_eq!(
        format!("{}", err),
        "Invalid tolerance: -1 (must be > 0 and finite)"
    );

    // InvalidIterations
    let err = SpatialError::InvalidIterations(0);
    assert_eq!(
        format!("{}", err),
        "Invalid iterations: 0 (must be in [1, 10000])"
    );

    // UnknownColumn
    let err = SpatialError::UnknownColumn("income".to_string());
    assert_eq!(format!("{}", err), "Unknown column: 'income'");

    // SelfNeighbor
    let err = SpatialError::SelfNeighbor(3);
    assert_eq!(format!("{}", err), "Unit 3 lists itself as a neighbor");

    // DuplicateParameter
    let err = SpatialError::DuplicateParameter { parameter: "seed" };
    assert_eq!(
        format!("{}", err),
        "Parameter 'seed' was set multiple times. Each parameter can only be configured once."
    );
}

#[test]
fn test_spatial_error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    let err = SpatialError::SingularDesign("X'X is rank deficient".into());
    assert_error(&err);
    assert!(err.to_string().starts_with("Singular design matrix"));
}

#[test]
fn test_spatial_error_equality_and_clone() {
    let err = SpatialError::IsolatedUnits { count: 2, first: 5 };
    assert_eq!(err.clone(), err);
    assert_ne!(err, SpatialError::IsolatedUnits { count: 1, first: 5 });
}
