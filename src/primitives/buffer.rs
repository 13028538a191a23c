//! Reusable scratch buffers for nearest-neighbour search.
//!
//! ## Purpose
//!
//! Building KNN weights runs one k-nearest query per point. This module holds
//! the heap and traversal stack that those queries share, so a weights build
//! allocates them once instead of once per point.
//!
//! ## Design notes
//!
//! * **Explicit ownership**: Buffers are passed into each query by the caller.
//! * **Logical clearing**: Buffers are cleared between queries, never shrunk.
//!
//! ## Invariants
//!
//! * After `clear()` both the heap and the stack are empty.
//!
//! ## Non-goals
//!
//! * Thread-local automatic caching.

use std::collections::BinaryHeap;

// ============================================================================
// Search Buffer
// ============================================================================

/// Persistent buffers for KD-tree search to avoid allocations.
#[derive(Debug)]
pub struct NeighborhoodSearchBuffer<N> {
    pub(crate) heap: BinaryHeap<N>,
    pub(crate) stack: Vec<usize>,
}

impl<N: Ord> NeighborhoodSearchBuffer<N> {
    /// Create a new search buffer with capacity k.
    pub fn new(k: usize) -> Self {
        // Stack depth is bounded by tree height; 32 covers a few million points.
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            stack: Vec::with_capacity(32),
        }
    }

    /// Clear all internal buffers for reuse.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.stack.clear();
    }
}
