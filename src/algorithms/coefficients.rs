//! Wald inference tables for fitted coefficients.
//!
//! ## Purpose
//!
//! Every model fitter reports its coefficients the same way: estimate,
//! standard error, z value, p-value and a normal-theory confidence interval.
//! This module builds that table from estimates and a covariance diagonal.
//!
//! ## Key concepts
//!
//! * **z value**: `estimate / std_error`.
//! * **p-value**: Two-sided normal tail `2·(1 − Φ(|z|))`.
//! * **Interval**: `estimate ± z_{(1+level)/2} · std_error`.
//!
//! ## Invariants
//!
//! * All columns have one entry per coefficient name.
//! * Standard errors are non-negative; a negative variance is reported as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::normal::{Alternative, critical_value};
use crate::primitives::errors::SpatialError;

/// Per-coefficient Wald statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    /// Coefficient names, in design order.
    pub names: Vec<String>,
    /// Point estimates.
    pub estimates: Vec<f64>,
    /// Standard errors.
    pub std_errors: Vec<f64>,
    /// Wald z values.
    pub z_values: Vec<f64>,
    /// Two-sided p-values.
    pub p_values: Vec<f64>,
    /// Lower confidence bounds.
    pub ci_lower: Vec<f64>,
    /// Upper confidence bounds.
    pub ci_upper: Vec<f64>,
    /// Confidence level of the interval columns.
    pub level: f64,
}

impl CoefficientTable {
    /// Build the table from estimates and their variances.
    pub fn from_variances(
        names: Vec<String>,
        estimates: Vec<f64>,
        variances: &[f64],
        level: f64,
    ) -> Result<Self, SpatialError> {
        let p = names.len();
        if estimates.len() != p || variances.len() != p {
            return Err(SpatialError::MismatchedInputs {
                what: "coefficient estimates",
                expected: p,
                got: estimates.len().min(variances.len()),
            });
        }
        if !(level > 0.0 && level < 1.0) {
            return Err(SpatialError::InvalidIntervals(level));
        }

        let crit = critical_value(level);
        let mut std_errors = Vec::with_capacity(p);
        let mut z_values = Vec::with_capacity(p);
        let mut p_values = Vec::with_capacity(p);
        let mut ci_lower = Vec::with_capacity(p);
        let mut ci_upper = Vec::with_capacity(p);

        for ((name, &b), &var) in names.iter().zip(&estimates).zip(variances) {
            if !var.is_finite() || var < 0.0 {
                return Err(SpatialError::DegenerateStatistic(format!(
                    "variance of '{name}' is {var}"
                )));
            }
            let se = var.sqrt();
            let z = b / se;
            std_errors.push(se);
            z_values.push(z);
            p_values.push(Alternative::TwoSided.p_value(z));
            ci_lower.push(b - crit * se);
            ci_upper.push(b + crit * se);
        }

        Ok(Self {
            names,
            estimates,
            std_errors,
            z_values,
            p_values,
            ci_lower,
            ci_upper,
            level,
        })
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Row index of a named coefficient.
    pub fn position(&self, name: &str) -> Result<usize, SpatialError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SpatialError::UnknownColumn(name.to_string()))
    }

    /// Estimate of a named coefficient.
    pub fn estimate(&self, name: &str) -> Result<f64, SpatialError> {
        Ok(self.estimates[self.position(name)?])
    }

    /// Confidence interval of a named coefficient.
    pub fn interval(&self, name: &str) -> Result<(f64, f64), SpatialError> {
        let i = self.position(name)?;
        Ok((self.ci_lower[i], self.ci_upper[i]))
    }
}

impl fmt::Display for CoefficientTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.names.iter().map(String::len).max().unwrap_or(0).max(11);
        let pct = self.level * 100.0;
        writeln!(
            f,
            "{:<width$} {:>12} {:>12} {:>9} {:>10} {:>12} {:>12}",
            "Coefficient",
            "Estimate",
            "Std. Error",
            "z value",
            "Pr(>|z|)",
            format!("{:.1}% lo", pct),
            format!("{:.1}% hi", pct),
        )?;
        writeln!(f, "{:-<1$}", "", width + 73)?;
        for i in 0..self.len() {
            writeln!(
                f,
                "{:<width$} {:>12.6} {:>12.6} {:>9.3} {:>10.4e} {:>12.6} {:>12.6}",
                self.names[i],
                self.estimates[i],
                self.std_errors[i],
                self.z_values[i],
                self.p_values[i],
                self.ci_lower[i],
                self.ci_upper[i],
            )?;
        }
        Ok(())
    }
}
