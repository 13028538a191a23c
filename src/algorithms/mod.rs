//! Layer 3: Algorithms
//!
//! # Purpose
//!
//! This layer implements the spatial statistics proper:
//! - Spatial weights relations (KNN and contiguity)
//! - Synthetic data generation and outcome simulation
//! - Ordinary least squares
//! - Spatial error and spatial lag models by maximum likelihood
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
//! Layer 3: Algorithms ← You are here
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Spatial weights relations.
pub mod weights;

/// Synthetic point sets, covariates and outcomes.
pub mod simulation;

/// Wald coefficient tables.
pub mod coefficients;

/// Ordinary least squares.
pub mod ols;

/// Shared maximum likelihood machinery for SAR models.
pub mod autoregressive;

/// Spatial error model.
pub mod spatial_error;

/// Spatial lag model.
pub mod spatial_lag;
