//! Layer 2: Math
//!
//! # Purpose
//!
//! This layer provides pure mathematical building blocks used throughout the crate:
//! - Distance metrics and exact k-nearest neighbour search
//! - Dense linear algebra (solves, inverses, eigenvalue log-determinants)
//! - Normal and chi-square tail probabilities
//! - Bounded scalar minimisation
//!
//! These are reusable mathematical building blocks with no model-specific logic.
//!
//! # Architecture
//!
//! ```text
//! Layer 6: API
//!   ↓
//! Layer 5: Engine
//!   ↓
//! Layer 4: Evaluation
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math ← You are here
//!   ↓
//! Layer 1: Primitives
//! ```

/// Distance metrics.
pub mod distance;

/// KD-tree and brute-force nearest neighbour search.
pub mod neighborhood;

/// nalgebra-backed linear algebra.
pub mod linalg;

/// Normal and chi-square distribution tails.
pub mod normal;

/// Brent's bounded minimiser.
pub mod optimize;
