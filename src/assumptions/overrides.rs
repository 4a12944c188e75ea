//! Layered parameter overrides and their resolution
//!
//! A parameter can be set at four explicit layers (global, academic level, grade,
//! grade+year manual). Resolution walks an ordered list of optional sources and
//! returns the first value present together with the layer that supplied it.

use crate::calendar::SchoolYear;
use crate::error::EngineError;
use crate::school::Grade;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Layer that supplied a resolved parameter, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// Manual override for one grade in one school year
    Manual,
    /// Override for one grade, all years
    Grade,
    /// Default for every grade of an academic level
    Level,
    /// School-wide override
    Global,
    /// Estimated from the two most recent years of actuals
    Historical,
    /// Engine configuration default
    Default,
}

impl ParameterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterSource::Manual => "manual",
            ParameterSource::Grade => "grade",
            ParameterSource::Level => "level",
            ParameterSource::Historical => "historical",
            ParameterSource::Global => "global",
            ParameterSource::Default => "default",
        }
    }
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value and the layer it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ParameterSource,
}

/// First present value in an ordered list of optional sources
pub fn resolve<T>(
    candidates: impl IntoIterator<Item = (ParameterSource, Option<T>)>,
) -> Option<Resolved<T>> {
    candidates
        .into_iter()
        .find_map(|(source, value)| value.map(|value| Resolved { value, source }))
}

/// Expected lateral demand for a grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateralDemand {
    /// Absolute number of expected new students
    Students(f64),
    /// Fraction of the feeding cohort's prior-year total
    Rate(f64),
}

impl LateralDemand {
    /// Expected new students given the feeding cohort size
    pub fn expected_students(&self, cohort_base: u32) -> f64 {
        match *self {
            LateralDemand::Students(students) => students,
            LateralDemand::Rate(rate) => rate * cohort_base as f64,
        }
    }

    pub fn validate(&self, context: &str) -> Result<(), EngineError> {
        let (kind, value) = match *self {
            LateralDemand::Students(v) => ("student count", v),
            LateralDemand::Rate(v) => ("rate", v),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::validation(format!(
                "{context}: lateral {kind} {value} must be a non-negative number"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LateralDemand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LateralDemand::Students(v) => write!(f, "{v:.1} students"),
            LateralDemand::Rate(v) => write!(f, "{:.1}% of cohort", v * 100.0),
        }
    }
}

/// One parameter's explicit override layers
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredParameter<T> {
    pub global: Option<T>,
    /// Keyed by academic level code
    pub levels: BTreeMap<String, T>,
    /// Keyed by grade code
    pub grades: BTreeMap<String, T>,
    /// Keyed by (grade code, school year)
    pub manual: BTreeMap<(String, SchoolYear), T>,
}

impl<T> Default for LayeredParameter<T> {
    fn default() -> Self {
        Self {
            global: None,
            levels: BTreeMap::new(),
            grades: BTreeMap::new(),
            manual: BTreeMap::new(),
        }
    }
}

impl<T: Copy> LayeredParameter<T> {
    pub fn set_global(&mut self, value: T) -> &mut Self {
        self.global = Some(value);
        self
    }

    pub fn set_level(&mut self, level: &str, value: T) -> &mut Self {
        self.levels.insert(level.to_string(), value);
        self
    }

    pub fn set_grade(&mut self, grade: &str, value: T) -> &mut Self {
        self.grades.insert(grade.to_string(), value);
        self
    }

    pub fn set_manual(&mut self, grade: &str, school_year: SchoolYear, value: T) -> &mut Self {
        self.manual.insert((grade.to_string(), school_year), value);
        self
    }

    /// Grade-specific layers, most specific first: manual, grade, level
    pub fn explicit_layers(
        &self,
        grade: &Grade,
        school_year: SchoolYear,
    ) -> [(ParameterSource, Option<T>); 3] {
        [
            (
                ParameterSource::Manual,
                self.manual.get(&(grade.code.clone(), school_year)).copied(),
            ),
            (ParameterSource::Grade, self.grades.get(&grade.code).copied()),
            (ParameterSource::Level, self.levels.get(&grade.level).copied()),
        ]
    }

    /// Every configured value with a label describing its scope
    pub fn entries(&self) -> Vec<(String, T)> {
        let mut entries = Vec::new();
        if let Some(value) = self.global {
            entries.push(("global".to_string(), value));
        }
        entries.extend(self.levels.iter().map(|(k, v)| (format!("level {k}"), *v)));
        entries.extend(self.grades.iter().map(|(k, v)| (format!("grade {k}"), *v)));
        entries.extend(
            self.manual
                .iter()
                .map(|((g, y), v)| (format!("grade {g} in {y}"), *v)),
        );
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_none()
            && self.levels.is_empty()
            && self.grades.is_empty()
            && self.manual.is_empty()
    }
}

/// Overrides applied to one projection request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    pub retention: LayeredParameter<f64>,
    pub lateral: LayeredParameter<LateralDemand>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }
}
