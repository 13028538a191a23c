//! Layer 5: Engine
//!
//! # Purpose
//!
//! This layer orchestrates complete runs:
//! - Input and configuration validation
//! - Serializable run configuration
//! - The sequential simulate, fit and test pipeline
//! - Report structures and their text rendering
//!
//! # Architecture
//!
//! ```text
//! Layer 6: API
//!   ↓
//! Layer 5: Engine ← You are here
//!   ↓
//! Layer 4: Evaluation
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Input validation.
pub mod validator;

/// Run configuration.
pub mod config;

/// Pipeline execution.
pub mod pipeline;

/// Report types.
pub mod output;
