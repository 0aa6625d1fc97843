//! Parameter metadata for signal engines
//!
//! This module provides metadata about engine parameters, enabling:
//! - Grid search optimization
//! - Parameter documentation
//! - Automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use dowsig::params::{ParamMeta, ParamType, ParameterizedSignal};
//! use dowsig::prelude::*;
//!
//! // Get parameter metadata for an engine
//! let params = DowntrendLineBreak::param_meta();
//! for param in params {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{Percent, Period, Result, SignalError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Percentage value (finite, >= 0; e.g. a 2.0% tolerance)
  Percent,
  /// Period value (positive integer)
  Period,
}

/// Metadata for a single engine parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "break_threshold_pct")
  pub name: &'static str,
  /// Parameter type (Percent or Period)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Percent parameter
  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Percent, default, range, description }
  }

  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(SignalError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Percent => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(SignalError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED SIGNAL TRAIT
// ============================================================

/// Trait for signal engines that support parameterization
///
/// Implementing this trait enables:
/// - Discovery of available parameters
/// - Creation of engines with custom parameter values
/// - Grid search optimization
pub trait ParameterizedSignal: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates an engine with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Returns the signal ID string
  fn signal_id_str() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Percent from params with default fallback
pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Percent> {
  let value = params.get(key).copied().unwrap_or(default);
  Percent::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_percent() {
    let meta = ParamMeta::percent("test_pct", 2.0, (0.5, 5.0, 0.5), "Test percent parameter");

    assert_eq!(meta.name, "test_pct");
    assert_eq!(meta.param_type, ParamType::Percent);
    assert_eq!(meta.default, 2.0);
  }

  #[test]
  fn test_param_meta_period() {
    let meta = ParamMeta::period("test_period", 52.0, (13.0, 104.0, 13.0), "Test period parameter");

    assert_eq!(meta.name, "test_period");
    assert_eq!(meta.param_type, ParamType::Period);
    assert_eq!(meta.default, 52.0);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::percent("test", 2.0, (1.0, 3.0, 1.0), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 1.0).abs() < f64::EPSILON);
    assert!((grid[1] - 2.0).abs() < f64::EPSILON);
    assert!((grid[2] - 3.0).abs() < f64::EPSILON);
  }

  #[test]
  fn test_validate_percent() {
    let meta = ParamMeta::percent("test", 2.0, (0.5, 5.0, 0.5), "Test");

    assert!(meta.validate(2.0).is_ok());
    assert!(meta.validate(0.5).is_ok());
    assert!(meta.validate(5.0).is_ok());
    assert!(meta.validate(0.1).is_err());
    assert!(meta.validate(6.0).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 52.0, (13.0, 104.0, 13.0), "Test");

    assert!(meta.validate(52.0).is_ok());
    assert!(meta.validate(13.0).is_ok());
    assert!(meta.validate(104.0).is_ok());
    assert!(meta.validate(5.0).is_err());
    assert!(meta.validate(26.5).is_err());
  }

  #[test]
  fn test_get_percent_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 3.0);

    assert!((get_percent(&params, "key1", 2.0).unwrap().get() - 3.0).abs() < f64::EPSILON);
    assert!((get_percent(&params, "key2", 2.0).unwrap().get() - 2.0).abs() < f64::EPSILON);
  }

  #[test]
  fn test_get_period_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 26.0);

    assert_eq!(get_period(&params, "key1", 52).unwrap().get(), 26);
    assert_eq!(get_period(&params, "key2", 52).unwrap().get(), 52);
  }
}
