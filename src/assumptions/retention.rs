//! Retention model: students continuing from grade G in year Y to grade G+1 in Y+1

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Global retention rate used when nothing else is configured
pub const DEFAULT_RETENTION_RATE: f64 = 0.96;

/// Rounding applied when a fractional student count becomes whole students
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties rounded up (away from zero)
    #[default]
    HalfUp,
    /// Ties rounded to the even neighbour
    HalfEven,
}

impl RoundingMode {
    /// Round a non-negative student count to whole students
    ///
    /// The value is first snapped to 9 decimals so that products such as
    /// `100 * 0.965` land on the intended tie instead of just below it.
    pub fn round_students(&self, value: f64) -> u32 {
        if !value.is_finite() || value <= 0.0 {
            return 0;
        }
        let snapped = (value * 1e9).round() / 1e9;
        let rounded = match self {
            RoundingMode::HalfUp => snapped.round(),
            RoundingMode::HalfEven => snapped.round_ties_even(),
        };
        rounded.min(u32::MAX as f64) as u32
    }
}

/// Reject rates outside [0, 1]
pub fn validate_retention_rate(rate: f64, context: &str) -> Result<(), EngineError> {
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(EngineError::validation(format!(
            "{context}: retention rate {rate} is outside [0, 1]"
        )));
    }
    Ok(())
}

/// Retained students from a prior-grade count, rounded half-up
pub fn apply_retention_model(
    prior_grade_count: u32,
    effective_retention_rate: f64,
) -> Result<u32, EngineError> {
    apply_retention_model_with(prior_grade_count, effective_retention_rate, RoundingMode::HalfUp)
}

/// Retained students from a prior-grade count with an explicit rounding mode
pub fn apply_retention_model_with(
    prior_grade_count: u32,
    effective_retention_rate: f64,
    rounding: RoundingMode,
) -> Result<u32, EngineError> {
    validate_retention_rate(effective_retention_rate, "retention model")?;
    Ok(rounding.round_students(prior_grade_count as f64 * effective_retention_rate))
}
