//! Tests for k-nearest neighbour search.
//!
//! ## Test Organization
//!
//! 1. **KD-tree Search** - Correctness against brute force
//! 2. **Tie-breaking** - Equidistant and coincident candidates
//! 3. **Edge Cases** - Self exclusion and small inputs

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use spatialreg_rs::internals::math::distance::{DistanceMetric, EuclideanCalculator};
use spatialreg_rs::internals::math::neighborhood::{
    KDTree, Neighborhood, brute_force_k_nearest,
};
use spatialreg_rs::internals::primitives::buffer::NeighborhoodSearchBuffer;

fn tree_search(points: &[f64], i: usize, k: usize) -> Neighborhood<f64> {
    let tree = KDTree::new(points, 2);
    let mut buffer = NeighborhoodSearchBuffer::new(k);
    let mut nbh = Neighborhood::with_capacity(k);
    tree.find_k_nearest(
        &points[2 * i..2 * i + 2],
        k,
        &EuclideanCalculator,
        Some(i),
        &mut buffer,
        &mut nbh,
    );
    nbh
}

// ============================================================================
// KD-tree Search Tests
// ============================================================================

#[test]
fn test_kdtree_simple_grid() {
    // 3x3 grid with unit spacing; the centre is index 4.
    let mut points = Vec::new();
    for y in 0..3 {
        for x in 0..3 {
            points.push(x as f64);
            points.push(y as f64);
        }
    }

    let nbh = tree_search(&points, 4, 4);
    assert_eq!(nbh.indices.len(), 4);
    // Rook neighbours, ordered by index on equal distance.
    assert_eq!(nbh.indices, vec![1, 3, 5, 7]);
    for d in &nbh.distances {
        assert_relative_eq!(*d, 1.0);
    }
    assert_relative_eq!(*nbh.distances.last().unwrap(), 1.0);
}

#[test]
fn test_kdtree_matches_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let n = 200;
    let points: Vec<f64> = (0..2 * n).map(|_| rng.random::<f64>()).collect();
    let k = 7;

    for i in [0, 17, 99, 150, 199] {
        let tree = tree_search(&points, i, k);
        let mut brute = Neighborhood::with_capacity(k);
        brute_force_k_nearest(&points, 2, i, k, DistanceMetric::euclidean, &mut brute);

        assert_eq!(tree.indices, brute.indices, "query {i}");
        for (a, b) in tree.distances.iter().zip(&brute.distances) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_distances_are_sorted() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let points: Vec<f64> = (0..100).map(|_| rng.random::<f64>()).collect();
    let nbh = tree_search(&points, 5, 10);
    for pair in nbh.distances.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

// ============================================================================
// Tie-breaking Tests
// ============================================================================

#[test]
fn test_ties_broken_by_lowest_index() {
    // Query at the origin, four candidates at distance 1, k = 2.
    let points = vec![
        0.0, 0.0, // 0 query
        0.0, 1.0, // 1
        1.0, 0.0, // 2
        0.0, -1.0, // 3
        -1.0, 0.0, // 4
    ];
    let nbh = tree_search(&points, 0, 2);
    assert_eq!(nbh.indices, vec![1, 2]);

    let mut brute = Neighborhood::with_capacity(2);
    brute_force_k_nearest(&points, 2, 0, 2, DistanceMetric::euclidean, &mut brute);
    assert_eq!(brute.indices, vec![1, 2]);
}

#[test]
fn test_coincident_points_are_neighbors() {
    let points = vec![0.5, 0.5, 0.5, 0.5, 0.9, 0.9];
    let nbh = tree_search(&points, 0, 1);
    assert_eq!(nbh.indices, vec![1]);
    assert_relative_eq!(nbh.distances[0], 0.0);
}

// ============================================================================
// Edge Case Tests
// ============================================================================

#[test]
fn test_self_is_excluded() {
    let points = vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0];
    for i in 0..3 {
        let nbh = tree_search(&points, i, 2);
        assert_eq!(nbh.indices.len(), 2);
        assert!(!nbh.indices.contains(&i));
    }
}

#[test]
fn test_brute_force_great_circle() {
    // Longitude/latitude points; Paris is closer to London than to Madrid.
    let points = vec![
        -0.13, 51.51, // 0 London
        2.35, 48.86, // 1 Paris
        -3.70, 40.42, // 2 Madrid
    ];
    let mut nbh = Neighborhood::with_capacity(1);
    brute_force_k_nearest(&points, 2, 1, 1, DistanceMetric::great_circle, &mut nbh);
    assert_eq!(nbh.indices, vec![0]);
    assert!(nbh.distances[0] > 300.0 && nbh.distances[0] < 400.0);
}

#[test]
fn test_zero_k_returns_empty() {
    let points = vec![0.0, 0.0, 1.0, 1.0];
    let nbh = tree_search(&points, 0, 0);
    assert!(nbh.indices.is_empty());
}
