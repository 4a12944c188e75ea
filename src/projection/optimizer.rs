//! Capacity-aware lateral-entry optimizer
//!
//! Turns lateral demand for a grade into admitted students given the divisions
//! already in use and the grade's class-size limits. Every outcome is one of five
//! decisions, evaluated in a fixed order; the first match wins:
//!
//! 1. `ACCEPT_ALL`          demand <= fill_to_target
//! 2. `ACCEPT_FILL_MAX`     demand <= fill_to_max
//! 3. `RESTRICT`            demand <  new_class_threshold, capped at fill_to_max
//! 4. `NEW_CLASS`           a spare division exists, divisions are added
//! 5. `RESTRICT_AT_CEILING` no spare division, capped at fill_to_max

use crate::error::EngineError;
use crate::school::ClassSizeConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome class of a lateral-entry computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationDecision {
    /// All demand fits within target class sizes
    AcceptAll,
    /// All demand fits, existing divisions filled beyond target up to max
    AcceptFillMax,
    /// Demand exceeds max capacity but cannot fill a new division
    Restrict,
    /// One or more divisions opened to take the demand
    NewClass,
    /// A new division is justified but the grade is at max divisions
    RestrictAtCeiling,
}

impl OptimizationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationDecision::AcceptAll => "ACCEPT_ALL",
            OptimizationDecision::AcceptFillMax => "ACCEPT_FILL_MAX",
            OptimizationDecision::Restrict => "RESTRICT",
            OptimizationDecision::NewClass => "NEW_CLASS",
            OptimizationDecision::RestrictAtCeiling => "RESTRICT_AT_CEILING",
        }
    }

    /// Whether part of the demand was turned away
    pub fn is_restricted(&self) -> bool {
        matches!(
            self,
            OptimizationDecision::Restrict | OptimizationDecision::RestrictAtCeiling
        )
    }
}

impl fmt::Display for OptimizationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for one grade/year decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerInput {
    /// Expected lateral entrants after scenario scaling
    pub demand: u32,
    /// Students already seated in the grade (retained)
    pub current_enrolled: u32,
    /// Divisions already in use
    pub base_classes: u32,
    pub class_size: ClassSizeConfig,
}

/// Result of one grade/year decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub demand: u32,
    pub admitted: u32,
    pub rejected: u32,
    pub decision: OptimizationDecision,
    /// Divisions the grade runs after admission (0 for an empty grade)
    pub divisions_used: u32,
    pub fill_to_target: u32,
    pub fill_to_max: u32,
    pub new_class_threshold: u32,
}

/// Lateral-entry optimizer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LateralEntryOptimizer {
    /// Fraction of `max_class_size` a new division must be able to take before it is
    /// opened; `None` means the division must reach `target_class_size`
    new_class_fraction: Option<f64>,
}

impl LateralEntryOptimizer {
    pub fn new(new_class_fraction: Option<f64>) -> Self {
        Self { new_class_fraction }
    }

    /// A configured fraction must lie in (0, 1]
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(fraction) = self.new_class_fraction {
            if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
                return Err(EngineError::validation(format!(
                    "new_class_fraction {fraction} must be in (0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Students beyond existing max capacity needed to justify one more division
    pub fn new_class_intake(&self, class_size: &ClassSizeConfig) -> u32 {
        match self.new_class_fraction {
            None => class_size.target_class_size,
            Some(fraction) => {
                let raw = class_size.max_class_size as f64 * fraction;
                let snapped = (raw * 1e9).round() / 1e9;
                (snapped.ceil() as u32).max(1)
            }
        }
    }

    /// Decide admission for a grade with students already seated
    pub fn optimize(&self, input: &OptimizerInput) -> OptimizationOutcome {
        self.decide(
            input.demand,
            input.current_enrolled,
            input.base_classes,
            &input.class_size,
        )
    }

    /// Decide intake for the school's earliest grade
    ///
    /// The earliest grade has no retention and no partial enrollment to subtract, so
    /// demand is compared against the raw capacity of its divisions.
    pub fn optimize_ps_entry(
        &self,
        demand: u32,
        base_classes: u32,
        class_size: &ClassSizeConfig,
    ) -> OptimizationOutcome {
        self.decide(demand, 0, base_classes, class_size)
    }

    fn decide(
        &self,
        demand: u32,
        current_enrolled: u32,
        base_classes: u32,
        class_size: &ClassSizeConfig,
    ) -> OptimizationOutcome {
        let max_divisions = class_size.max_divisions.max(1);
        let base = base_classes.clamp(1, max_divisions);
        let max_size = class_size.max_class_size;

        let fill_to_target = base
            .saturating_mul(class_size.target_class_size)
            .saturating_sub(current_enrolled);
        let fill_to_max = base.saturating_mul(max_size).saturating_sub(current_enrolled);
        let new_class_threshold = fill_to_max.saturating_add(self.new_class_intake(class_size));

        let (decision, admitted, divisions) = if demand <= fill_to_target {
            (OptimizationDecision::AcceptAll, demand, base)
        } else if demand <= fill_to_max {
            (OptimizationDecision::AcceptFillMax, demand, base)
        } else if demand < new_class_threshold {
            (OptimizationDecision::Restrict, fill_to_max, base)
        } else if base < max_divisions {
            let overflow = demand - fill_to_max;
            let added = overflow.div_ceil(max_size.max(1)).min(max_divisions - base);
            let divisions = base + added;
            let capacity = divisions
                .saturating_mul(max_size)
                .saturating_sub(current_enrolled);
            (OptimizationDecision::NewClass, demand.min(capacity), divisions)
        } else {
            (OptimizationDecision::RestrictAtCeiling, fill_to_max, base)
        };

        let divisions_used = if current_enrolled == 0 && admitted == 0 {
            0
        } else {
            divisions
        };

        OptimizationOutcome {
            demand,
            admitted,
            rejected: demand - admitted,
            decision,
            divisions_used,
            fill_to_target,
            fill_to_max,
            new_class_threshold,
        }
    }
}
