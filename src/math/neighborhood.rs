//! KD-Tree for exact k-nearest neighbour search in 2D (and nD) space.
//!
//! ## Purpose
//!
//! This module implements a KD-tree used to build KNN spatial weights.
//! By organizing points in a spatial hierarchy, the search time per query drops
//! from O(n) to approximately O(log n).
//!
//! ## Design notes
//!
//! * **Static Construction**: The tree is built once and then used for queries.
//! * **Eytzinger Layout**: Tree nodes are stored in a left-complete binary tree (array) layout.
//! * **Trait-based Distance**: Supports any metric that decomposes over axes.
//! * **Deterministic ties**: Candidates are ranked by `(distance, index)`, so among
//!   equidistant points the lower index always wins, independent of tree shape.
//!
//! ## Key concepts
//!
//! * **Splitting Plane**: The dimension and value used to split points at each node.
//! * **Implicit Navigation**: Child nodes are accessed via arithmetic ($2i+1$, $2i+2$).
//! * **Pruning**: Skipping branches that cannot contain nearer (or tied lower-index) neighbours.
//!
//! ## Invariants
//!
//! * Queries always return the exact nearest neighbours (no approximation).
//! * Returned neighbours are sorted by `(distance, index)`.
//!
//! ## Non-goals
//!
//! * This module does not support dynamic insertions or deletions.
//! * This module does not support approximate nearest neighbour search.

use std::cmp::Ordering::{self, Equal};

use num_traits::Float;

use crate::primitives::buffer::NeighborhoodSearchBuffer;

// ============================================================================
// Helper Types
// ============================================================================

/// Candidate entry for the max-heap used during search.
///
/// Orders by distance (the second field), then by point index.
#[derive(Debug, Clone, Copy)]
pub struct NodeDistance<T>(pub usize, pub T);

impl<T: PartialOrd> PartialEq for NodeDistance<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Equal
    }
}
impl<T: PartialOrd> Eq for NodeDistance<T> {}

impl<T: PartialOrd> PartialOrd for NodeDistance<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: PartialOrd> Ord for NodeDistance<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.1
            .partial_cmp(&other.1)
            .unwrap_or(Equal)
            .then(self.0.cmp(&other.0))
    }
}

/// Trait for distance calculations used in KD-tree search.
pub trait PointDistance<T: Float> {
    /// Compute squared distance between two points (avoids sqrt in the hot loop).
    fn distance_squared(&self, a: &[T], b: &[T]) -> T;

    /// Compute squared distance along a single dimension (for pruning).
    fn split_distance_squared(&self, dim: usize, split_val: T, query_val: T) -> T;

    /// Convert a distance from the comparison space (squared) to the metric space.
    fn post_process_distance(&self, d: T) -> T;
}

// ============================================================================
// Neighborhood Structure
// ============================================================================

/// Result container for k-nearest neighbour search.
#[derive(Debug, Clone)]
pub struct Neighborhood<T> {
    /// Indices of the k nearest neighbours, nearest first.
    pub indices: Vec<usize>,
    /// Distances to each neighbour (corresponding to indices).
    pub distances: Vec<T>,
}

impl<T: Float> Neighborhood<T> {
    /// Create a new empty neighborhood.
    pub fn new() -> Self {
        Self {
            indices: Vec::new(),
            distances: Vec::new(),
        }
    }

    /// Pre-allocate buffers for a neighborhood of size k.
    pub fn with_capacity(k: usize) -> Self {
        Self {
            indices: Vec::with_capacity(k),
            distances: Vec::with_capacity(k),
        }
    }

    fn clear(&mut self) {
        self.indices.clear();
        self.distances.clear();
    }
}

impl<T: Float> Default for Neighborhood<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// KD-Tree Implementation
// ============================================================================

/// Node in the Eytzinger layout: the index of the point in the input array.
#[derive(Debug, Clone, Copy, Default)]
pub struct KDNode {
    /// Index of the point in the original flattened data array.
    pub index: usize,
}

/// KD-tree for spatial indexing of nD points.
#[derive(Debug, Clone)]
pub struct KDTree<T: Float> {
    /// The implicit Eytzinger tree nodes.
    nodes: Vec<KDNode>,
    /// Permuted points aligned with the nodes.
    points: Vec<T>,
    /// Dimensionality of the data.
    dimensions: usize,
}

impl<T: Float> KDTree<T> {
    // ------------------------------------------------------------------------
    // Public API
    // ------------------------------------------------------------------------

    /// Build a KD-tree from a flattened data array.
    pub fn new(points: &[T], dimensions: usize) -> Self {
        let n = points.len() / dimensions;
        let mut indices: Vec<usize> = (0..n).collect();

        let mut nodes = vec![KDNode::default(); n];
        let mut permuted_points = vec![T::zero(); n * dimensions];

        Self::build_recursive(
            points,
            dimensions,
            &mut indices,
            0,
            &mut nodes,
            &mut permuted_points,
            0,
        );

        Self {
            nodes,
            points: permuted_points,
            dimensions,
        }
    }

    /// Search for the k nearest neighbours of `query`.
    ///
    /// `exclude_self` removes one point by index (not by distance), so coincident
    /// points still count as neighbours of each other.
    pub fn find_k_nearest<D: PointDistance<T>>(
        &self,
        query: &[T],
        k: usize,
        dist_calc: &D,
        exclude_self: Option<usize>,
        buffer: &mut NeighborhoodSearchBuffer<NodeDistance<T>>,
        neighborhood: &mut Neighborhood<T>,
    ) {
        neighborhood.clear();
        if k == 0 || self.nodes.is_empty() {
            return;
        }

        buffer.clear();
        self.search_iterative(query, k, dist_calc, exclude_self, buffer);

        let mut found: Vec<NodeDistance<T>> = buffer.heap.drain().collect();
        found.sort_unstable();

        for NodeDistance(idx, dist) in found {
            neighborhood.indices.push(idx);
            neighborhood
                .distances
                .push(dist_calc.post_process_distance(dist));
        }
    }

    // ------------------------------------------------------------------------
    // Private Helpers & Algorithms
    // ------------------------------------------------------------------------

    /// Recursively builds the tree in Eytzinger layout.
    fn build_recursive(
        points: &[T],
        dims: usize,
        indices: &mut [usize],
        depth: usize,
        nodes: &mut [KDNode],
        permuted_points: &mut [T],
        curr_idx: usize,
    ) {
        if indices.is_empty() {
            return;
        }

        let axis = depth % dims;
        let n = indices.len();

        // Pivot rank for a left-complete tree keeps the Eytzinger property
        let median_idx = Self::calculate_left_subtree_size(n);

        if median_idx < n {
            indices.select_nth_unstable_by(median_idx, |&a, &b| {
                points[a * dims + axis]
                    .partial_cmp(&points[b * dims + axis])
                    .unwrap_or(Equal)
            });
        }

        let point_idx = indices[median_idx];
        nodes[curr_idx] = KDNode { index: point_idx };

        let src_start = point_idx * dims;
        let dest_start = curr_idx * dims;
        permuted_points[dest_start..dest_start + dims]
            .copy_from_slice(&points[src_start..src_start + dims]);

        let (left_part, right_part_with_median) = indices.split_at_mut(median_idx);
        let right_part = &mut right_part_with_median[1..];

        Self::build_recursive(
            points,
            dims,
            left_part,
            depth + 1,
            nodes,
            permuted_points,
            2 * curr_idx + 1,
        );
        Self::build_recursive(
            points,
            dims,
            right_part,
            depth + 1,
            nodes,
            permuted_points,
            2 * curr_idx + 2,
        );
    }

    /// Iterative search using an explicit stack of `(node_idx << 8) | axis` entries.
    fn search_iterative<D: PointDistance<T>>(
        &self,
        query: &[T],
        k: usize,
        dist_calc: &D,
        exclude_self: Option<usize>,
        buffer: &mut NeighborhoodSearchBuffer<NodeDistance<T>>,
    ) {
        let d = self.dimensions;
        let heap = &mut buffer.heap;
        let stack = &mut buffer.stack;
        let nodes_len = self.nodes.len();

        stack.push(0);

        while let Some(packed) = stack.pop() {
            let axis = packed & 0xFF;
            let node_idx = packed >> 8;

            let node = self.nodes[node_idx];
            let offset = node_idx * d;
            let node_point = &self.points[offset..offset + d];

            // 1. Process current node
            if exclude_self != Some(node.index) {
                let candidate = NodeDistance(node.index, dist_calc.distance_squared(query, node_point));
                if heap.len() < k {
                    heap.push(candidate);
                } else if let Some(mut top) = heap.peek_mut() {
                    if candidate < *top {
                        *top = candidate;
                    }
                }
            }

            // 2. Leaf check: implicit left child is at 2*i + 1
            let left_child = 2 * node_idx + 1;
            if left_child >= nodes_len {
                continue;
            }

            let split_val = node_point[axis];
            let diff = query[axis] - split_val;

            let right_child = left_child + 1;
            let has_right = right_child < nodes_len;
            let next_axis = if axis + 1 == d { 0 } else { axis + 1 };

            let packed_left = (left_child << 8) | next_axis;
            let packed_right = (right_child << 8) | next_axis;

            let (near_packed, far_packed, near_exists, far_exists) = if diff <= T::zero() {
                (packed_left, packed_right, true, has_right)
            } else {
                (packed_right, packed_left, has_right, true)
            };

            // 3. Pruning: the far side may still hold closer points or exact ties
            if far_exists {
                let dist_to_plane = dist_calc.split_distance_squared(axis, split_val, query[axis]);
                let bound = if heap.len() < k {
                    T::infinity()
                } else {
                    heap.peek().map(|nd| nd.1).unwrap_or_else(T::infinity)
                };
                if dist_to_plane <= bound {
                    stack.push(far_packed);
                }
            }

            // 4. Near child is pushed last so it is explored first
            if near_exists {
                stack.push(near_packed);
            }
        }
    }

    /// Calculate number of nodes in the left subtree of a left-complete binary tree of size N.
    pub fn calculate_left_subtree_size(n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let h = (usize::BITS - n.leading_zeros() - 1) as usize;
        if h == 0 {
            return 0;
        }

        let max_leaf_capacity = 1 << h;
        let total_nodes_above_leaf = max_leaf_capacity - 1;
        let r = n - total_nodes_above_leaf;
        let left_part_leaves = r.min(max_leaf_capacity / 2);
        let left_subtree_capacity_full = (max_leaf_capacity / 2) - 1;
        left_subtree_capacity_full + left_part_leaves
    }
}

// ============================================================================
// Brute-force Search
// ============================================================================

/// Exact k-nearest search by scanning every point.
///
/// Used for metrics the tree cannot prune on (great-circle distance). Ties are
/// broken by index exactly as in the tree search.
pub fn brute_force_k_nearest<T: Float, F>(
    points: &[T],
    dimensions: usize,
    query_idx: usize,
    k: usize,
    distance: F,
    neighborhood: &mut Neighborhood<T>,
) where
    F: Fn(&[T], &[T]) -> T,
{
    neighborhood.clear();
    let query = &points[query_idx * dimensions..(query_idx + 1) * dimensions];

    let mut candidates: Vec<NodeDistance<T>> = points
        .chunks_exact(dimensions)
        .enumerate()
        .filter(|&(j, _)| j != query_idx)
        .map(|(j, p)| NodeDistance(j, distance(query, p)))
        .collect();

    let k = k.min(candidates.len());
    if k == 0 {
        return;
    }
    if k < candidates.len() {
        candidates.select_nth_unstable(k - 1);
        candidates.truncate(k);
    }
    candidates.sort_unstable();

    for NodeDistance(idx, dist) in candidates {
        neighborhood.indices.push(idx);
        neighborhood.distances.push(dist);
    }
}
