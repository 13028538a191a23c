//! Spatial weights: KNN and contiguity neighbour relations.
//!
//! ## Purpose
//!
//! This module builds the sparse spatial weights relation `W` consumed by the
//! outcome simulator, the spatial regression fitters and Moran's I. Entry
//! `w_ij` is nonzero iff unit `j` is a neighbour of unit `i`.
//!
//! ## Design notes
//!
//! * **Storage**: Compressed sparse rows (offsets, neighbour indices, weights).
//! * **KNN**: Exact search via the KD-tree (Euclidean) or brute force (great circle).
//! * **Tie-breaking**: Equidistant candidates are ranked by index, lowest first.
//!   Coincident points are ordinary candidates at distance zero.
//! * **Contiguity**: Caller-supplied adjacency lists (e.g. polygon neighbours).
//!
//! ## Key concepts
//!
//! * **Row standardisation**: Each neighbour of `i` gets weight `1 / |N(i)|`.
//! * **Isolates**: Units with no neighbours get an all-zero row, or are rejected.
//! * **Spatial lag**: `(Wx)_i = Σ_j w_ij x_j`.
//!
//! ## Invariants
//!
//! * The diagonal is always zero.
//! * Under `RowStandardized`, rows sum to 1 except isolate rows, which sum to 0.
//! * Neighbour indices within a row are unique.
//!
//! ## Non-goals
//!
//! * Symmetry is not enforced; KNN relations are generally asymmetric.
//! * Isolated units are never dropped from the relation.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::distance::{DistanceMetric, EuclideanCalculator};
use crate::math::neighborhood::{KDTree, Neighborhood, NodeDistance, brute_force_k_nearest};
use crate::primitives::buffer::NeighborhoodSearchBuffer;
use crate::primitives::errors::SpatialError;
use crate::primitives::frame::ModelFrame;

// ============================================================================
// Configuration Enums
// ============================================================================

/// How raw neighbour links are turned into weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightStyle {
    /// Each neighbour gets `1 / |N(i)|`.
    #[default]
    RowStandardized,

    /// Each neighbour gets weight 1.
    Binary,
}

/// Policy for units without any neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolatePolicy {
    /// Keep the unit with an all-zero row.
    #[default]
    ZeroRow,

    /// Fail with `SpatialError::IsolatedUnits`.
    Reject,
}

// ============================================================================
// Summary Constants
// ============================================================================

/// Global constants of a weights relation used by Moran's I moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsConstants {
    /// Number of units.
    pub n: usize,
    /// Number of isolated units.
    pub isolates: usize,
    /// S0 = Σ_ij w_ij
    pub s0: f64,
    /// S1 = ½ Σ_ij (w_ij + w_ji)²
    pub s1: f64,
    /// S2 = Σ_i (w_i. + w_.i)²
    pub s2: f64,
}

// ============================================================================
// Spatial Weights
// ============================================================================

/// Sparse row-compressed spatial weights relation.
///
/// Serializes as neighbour lists plus style; deserialization rebuilds the
/// weights through [`SpatialWeights::from_neighbors`], so every invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "NeighborLists", try_from = "NeighborLists")]
pub struct SpatialWeights {
    row_offsets: Vec<usize>,
    neighbors: Vec<usize>,
    weights: Vec<f64>,
    style: WeightStyle,
}

/// Serialized form of [`SpatialWeights`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborLists {
    /// Neighbour indices of each unit.
    pub neighbors: Vec<Vec<usize>>,
    /// Weighting style.
    #[serde(default)]
    pub style: WeightStyle,
}

impl From<SpatialWeights> for NeighborLists {
    fn from(weights: SpatialWeights) -> Self {
        Self {
            neighbors: (0..weights.n())
                .map(|i| weights.neighbors(i).to_vec())
                .collect(),
            style: weights.style,
        }
    }
}

impl TryFrom<NeighborLists> for SpatialWeights {
    type Error = SpatialError;

    fn try_from(lists: NeighborLists) -> Result<Self, Self::Error> {
        Self::from_neighbors(lists.neighbors, lists.style, IsolatePolicy::ZeroRow)
    }
}

impl SpatialWeights {
    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Build k-nearest-neighbour weights over flattened 2D coordinates `[x0, y0, x1, y1, ...]`.
    ///
    /// `k` must satisfy `1 <= k < n`; it is never clamped.
    pub fn knn(
        coords: &[f64],
        k: usize,
        metric: DistanceMetric,
        style: WeightStyle,
    ) -> Result<Self, SpatialError> {
        const DIMS: usize = 2;

        if coords.is_empty() {
            return Err(SpatialError::EmptyInput);
        }
        if coords.len() % DIMS != 0 {
            return Err(SpatialError::InvalidInput(format!(
                "coordinate array length {} is not a multiple of {DIMS}",
                coords.len()
            )));
        }
        if let Some((i, v)) = coords.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SpatialError::InvalidNumericValue(format!("coords[{i}]={v}")));
        }

        let n = coords.len() / DIMS;
        if k == 0 || k >= n {
            return Err(SpatialError::InvalidNeighborCount { k, n });
        }

        let mut lists: Vec<Vec<usize>> = Vec::with_capacity(n);
        let mut neighborhood = Neighborhood::with_capacity(k);
        let mut max_kth_distance = 0.0_f64;

        match metric {
            DistanceMetric::Euclidean => {
                let tree = KDTree::new(coords, DIMS);
                let mut buffer = NeighborhoodSearchBuffer::<NodeDistance<f64>>::new(k);
                for i in 0..n {
                    let query = &coords[i * DIMS..(i + 1) * DIMS];
                    tree.find_k_nearest(
                        query,
                        k,
                        &EuclideanCalculator,
                        Some(i),
                        &mut buffer,
                        &mut neighborhood,
                    );
                    if let Some(&d) = neighborhood.distances.last() {
                        max_kth_distance = max_kth_distance.max(d);
                    }
                    lists.push(neighborhood.indices.clone());
                }
            }
            DistanceMetric::GreatCircle => {
                for i in 0..n {
                    brute_force_k_nearest(
                        coords,
                        DIMS,
                        i,
                        k,
                        DistanceMetric::great_circle::<f64>,
                        &mut neighborhood,
                    );
                    if let Some(&d) = neighborhood.distances.last() {
                        max_kth_distance = max_kth_distance.max(d);
                    }
                    lists.push(neighborhood.indices.clone());
                }
            }
        }

        debug!(n, k, ?metric, max_kth_distance, "built knn neighbour lists");
        Self::from_validated_lists(lists, style)
    }

    /// Build weights from adjacency lists, one list of neighbour indices per unit.
    ///
    /// Duplicate entries are collapsed. Self-references and out-of-range indices are errors.
    pub fn from_neighbors(
        lists: Vec<Vec<usize>>,
        style: WeightStyle,
        policy: IsolatePolicy,
    ) -> Result<Self, SpatialError> {
        let n = lists.len();
        if n == 0 {
            return Err(SpatialError::EmptyInput);
        }

        let mut cleaned = Vec::with_capacity(n);
        for (unit, mut list) in lists.into_iter().enumerate() {
            for &neighbor in &list {
                if neighbor >= n {
                    return Err(SpatialError::InvalidNeighborIndex { unit, neighbor, n });
                }
                if neighbor == unit {
                    return Err(SpatialError::SelfNeighbor(unit));
                }
            }
            list.sort_unstable();
            list.dedup();
            cleaned.push(list);
        }

        let isolates: Vec<usize> = cleaned
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_empty())
            .map(|(i, _)| i)
            .collect();
        if policy == IsolatePolicy::Reject {
            if let Some(&first) = isolates.first() {
                return Err(SpatialError::IsolatedUnits {
                    count: isolates.len(),
                    first,
                });
            }
        }

        debug!(n, isolates = isolates.len(), "built contiguity neighbour lists");
        Self::from_validated_lists(cleaned, style)
    }

    fn from_validated_lists(lists: Vec<Vec<usize>>, style: WeightStyle) -> Result<Self, SpatialError> {
        let nnz: usize = lists.iter().map(Vec::len).sum();
        let mut row_offsets = Vec::with_capacity(lists.len() + 1);
        let mut neighbors = Vec::with_capacity(nnz);
        let mut weights = Vec::with_capacity(nnz);

        row_offsets.push(0);
        for list in lists {
            let w = match style {
                WeightStyle::RowStandardized if !list.is_empty() => 1.0 / list.len() as f64,
                _ => 1.0,
            };
            weights.extend(std::iter::repeat_n(w, list.len()));
            neighbors.extend(list);
            row_offsets.push(neighbors.len());
        }

        Ok(Self {
            row_offsets,
            neighbors,
            weights,
            style,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Number of units.
    #[inline]
    pub fn n(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Weighting style.
    pub fn style(&self) -> WeightStyle {
        self.style
    }

    /// Total number of nonzero links.
    pub fn n_links(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbour indices of unit `i`.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[self.row_offsets[i]..self.row_offsets[i + 1]]
    }

    /// Weights of unit `i`, aligned with [`Self::neighbors`].
    #[inline]
    pub fn row_weights(&self, i: usize) -> &[f64] {
        &self.weights[self.row_offsets[i]..self.row_offsets[i + 1]]
    }

    /// Number of neighbours of unit `i`.
    #[inline]
    pub fn cardinality(&self, i: usize) -> usize {
        self.row_offsets[i + 1] - self.row_offsets[i]
    }

    /// Weight `w_ij` (zero when `j` is not a neighbour of `i`).
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.neighbors(i)
            .iter()
            .position(|&nb| nb == j)
            .map_or(0.0, |pos| self.row_weights(i)[pos])
    }

    /// Sum of row `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row_weights(i).iter().sum()
    }

    /// Indices of units without neighbours.
    pub fn isolates(&self) -> Vec<usize> {
        (0..self.n()).filter(|&i| self.cardinality(i) == 0).collect()
    }

    /// Returns true if `w_ij == w_ji` for every pair.
    pub fn is_symmetric(&self) -> bool {
        (0..self.n()).all(|i| {
            self.neighbors(i)
                .iter()
                .zip(self.row_weights(i))
                .all(|(&j, &w)| (self.weight(j, i) - w).abs() <= f64::EPSILON)
        })
    }

    /// Returns true if `j ∈ N(i)` exactly when `i ∈ N(j)`.
    pub fn has_symmetric_links(&self) -> bool {
        (0..self.n()).all(|i| {
            self.neighbors(i)
                .iter()
                .all(|&j| self.neighbors(j).contains(&i))
        })
    }

    /// Dense symmetric matrix with the same eigenvalues as `W`, if one exists.
    ///
    /// Requires symmetric links. Binary weights are symmetric already; row-standardised
    /// weights `D⁻¹B` are similar to `D^-½ B D^-½`.
    pub fn symmetric_similar(&self) -> Option<DMatrix<f64>> {
        if !self.has_symmetric_links() {
            return None;
        }
        let n = self.n();
        let mut m = DMatrix::zeros(n, n);
        for i in 0..n {
            for &j in self.neighbors(i) {
                m[(i, j)] = match self.style {
                    WeightStyle::Binary => 1.0,
                    WeightStyle::RowStandardized => {
                        1.0 / ((self.cardinality(i) * self.cardinality(j)) as f64).sqrt()
                    }
                };
            }
        }
        Some(m)
    }

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------

    /// Spatial lag `Wx`.
    pub fn lag(&self, x: &[f64]) -> Result<Vec<f64>, SpatialError> {
        if x.len() != self.n() {
            return Err(SpatialError::MismatchedInputs {
                what: "spatial lag input",
                expected: self.n(),
                got: x.len(),
            });
        }
        Ok((0..self.n())
            .map(|i| {
                self.neighbors(i)
                    .iter()
                    .zip(self.row_weights(i))
                    .map(|(&j, &w)| w * x[j])
                    .sum()
            })
            .collect())
    }

    /// Dense n x n copy of the relation.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.n();
        let mut m = DMatrix::zeros(n, n);
        for i in 0..n {
            for (&j, &w) in self.neighbors(i).iter().zip(self.row_weights(i)) {
                m[(i, j)] = w;
            }
        }
        m
    }

    /// Summary constants S0, S1, S2.
    pub fn constants(&self) -> WeightsConstants {
        let n = self.n();
        let mut links: HashMap<(usize, usize), f64> = HashMap::with_capacity(self.n_links());
        let mut col_sums = vec![0.0; n];
        let mut s0 = 0.0;

        for i in 0..n {
            for (&j, &w) in self.neighbors(i).iter().zip(self.row_weights(i)) {
                links.insert((i, j), w);
                col_sums[j] += w;
                s0 += w;
            }
        }

        // Pairs present in both directions are visited twice, one-sided pairs once.
        let mut s1 = 0.0;
        for i in 0..n {
            for (&j, &w_ij) in self.neighbors(i).iter().zip(self.row_weights(i)) {
                match links.get(&(j, i)) {
                    Some(&w_ji) => s1 += (w_ij + w_ji).powi(2),
                    None => s1 += 2.0 * w_ij * w_ij,
                }
            }
        }
        s1 *= 0.5;

        let s2 = (0..n)
            .map(|i| (self.row_sum(i) + col_sums[i]).powi(2))
            .sum();

        WeightsConstants {
            n,
            isolates: (0..n).filter(|&i| self.cardinality(i) == 0).count(),
            s0,
            s1,
            s2,
        }
    }

    /// Append `residuals` and their spatial lag to a frame as two derived columns.
    pub fn augment_frame(
        &self,
        frame: &mut ModelFrame,
        residuals: &[f64],
    ) -> Result<(), SpatialError> {
        let lagged = self.lag(residuals)?;
        frame.append_residual_columns(residuals.to_vec(), lagged)
    }
}
