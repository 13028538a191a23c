//! Distance metrics for spatial neighbour search.
//!
//! ## Purpose
//!
//! This module provides the distances used to rank candidate neighbours:
//! planar Euclidean distance for projected or synthetic coordinates, and
//! great-circle (haversine) distance for longitude/latitude coordinates.
//!
//! ## Design notes
//!
//! * **Decoupling**: Distance calculation is separated from the search structure.
//! * **Squared comparison**: Euclidean search compares squared distances and only
//!   takes the square root for reported values.
//!
//! ## Key concepts
//!
//! * **Metric**: Defines how "closeness" is measured.
//! * **Geodesic coordinates**: `GreatCircle` expects `[longitude, latitude]` in degrees
//!   and reports kilometres.
//!
//! ## Invariants
//!
//! * Distance is always non-negative.
//! * Distance is zero for coincident points.
//!
//! ## Non-goals
//!
//! * This module does not weight neighbours by distance.

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::math::neighborhood::PointDistance;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ============================================================================
// Distance Metric Enum
// ============================================================================

/// Distance metric for 2D neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Standard Euclidean distance: √(Σ(xᵢ - yᵢ)²)
    #[default]
    Euclidean,

    /// Great-circle distance in kilometres between `[lon, lat]` points in degrees.
    GreatCircle,
}

// ============================================================================
// Distance Computation Functions
// ============================================================================

impl DistanceMetric {
    /// Distance between two points under this metric.
    #[inline]
    pub fn distance<T: Float>(&self, a: &[T], b: &[T]) -> T {
        match self {
            Self::Euclidean => Self::euclidean(a, b),
            Self::GreatCircle => Self::great_circle(a, b),
        }
    }

    /// Compute Euclidean distance between two nD points.
    #[inline]
    pub fn euclidean<T: Float>(a: &[T], b: &[T]) -> T {
        Self::euclidean_squared(a, b).sqrt()
    }

    /// Compute squared Euclidean distance between two nD points.
    #[inline]
    pub fn euclidean_squared<T: Float>(a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len(), "Points must have same dimension");
        a.iter()
            .zip(b.iter())
            .map(|(&ai, &bi)| {
                let diff = ai - bi;
                diff * diff
            })
            .fold(T::zero(), |acc, x| acc + x)
    }

    /// Haversine distance in kilometres between `[lon, lat]` points given in degrees.
    #[inline]
    pub fn great_circle<T: Float>(a: &[T], b: &[T]) -> T {
        debug_assert!(a.len() >= 2 && b.len() >= 2);
        let two = T::one() + T::one();
        let radius = T::from(EARTH_RADIUS_KM).unwrap_or_else(T::one);

        let (lon1, lat1) = (a[0].to_radians(), a[1].to_radians());
        let (lon2, lat2) = (b[0].to_radians(), b[1].to_radians());

        let half_dlat = (lat2 - lat1) / two;
        let half_dlon = (lon2 - lon1) / two;
        let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);

        // Rounding can push h marginally above 1 for antipodal points.
        let h = h.min(T::one()).max(T::zero());
        two * radius * h.sqrt().asin()
    }
}

// ============================================================================
// KD-tree Distance Adapter
// ============================================================================

/// Euclidean distance calculator for the KD-tree.
///
/// The tree prunes on per-axis splits, which is only valid for metrics that
/// decompose over coordinates; great-circle searches use brute force instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanCalculator;

impl<T: Float> PointDistance<T> for EuclideanCalculator {
    #[inline]
    fn distance_squared(&self, a: &[T], b: &[T]) -> T {
        DistanceMetric::euclidean_squared(a, b)
    }

    #[inline]
    fn split_distance_squared(&self, _dim: usize, split_val: T, query_val: T) -> T {
        let diff = query_val - split_val;
        diff * diff
    }

    #[inline]
    fn post_process_distance(&self, d: T) -> T {
        d.sqrt()
    }
}
