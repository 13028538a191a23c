//! Layer 4: Evaluation
//!
//! # Purpose
//!
//! This layer provides post-fit diagnostics:
//! - Moran's I with analytic moments (normality or randomisation)
//! - Moran's I permutation test
//! - Moran's I for OLS residuals with regression-adjusted moments
//!
//! # Architecture
//!
//! ```text
//! Layer 6: API
//!   ↓
//! Layer 5: Engine
//!   ↓
//! Layer 4: Evaluation ← You are here
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Moran's I tests.
pub mod moran;

/// Moran's I for regression residuals.
pub mod residual_moran;
