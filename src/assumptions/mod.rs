//! Projection assumptions: retention, lateral demand, and their override layers

mod historical;
mod overrides;
mod retention;
pub mod loader;

pub use historical::{weighted_rate, HistoricalRateEstimator, PRIOR_YEAR_WEIGHT, RECENT_YEAR_WEIGHT};
pub use overrides::{
    resolve, LateralDemand, LayeredParameter, OverrideSet, ParameterSource, Resolved,
};
pub use retention::{
    apply_retention_model, apply_retention_model_with, validate_retention_rate, RoundingMode,
    DEFAULT_RETENTION_RATE,
};

use crate::calendar::SchoolYear;
use crate::error::EngineError;
use crate::school::SchoolData;

/// Resolves effective retention rates and lateral demand for each (grade, year)
///
/// Precedence, most specific first: manual grade+year, grade, academic level, global
/// override, historical estimate, engine default. Every explicit override beats history.
#[derive(Debug, Clone, Copy)]
pub struct ParameterResolver<'a> {
    school: &'a SchoolData,
    overrides: &'a OverrideSet,
    estimator: HistoricalRateEstimator<'a>,
    /// Most recent completed school year (N-1 for the estimator)
    recent_year: SchoolYear,
    default_retention_rate: f64,
    default_lateral: Option<LateralDemand>,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(
        school: &'a SchoolData,
        overrides: &'a OverrideSet,
        recent_year: SchoolYear,
        default_retention_rate: f64,
        default_lateral: Option<LateralDemand>,
    ) -> Self {
        Self {
            school,
            overrides,
            estimator: HistoricalRateEstimator::new(school),
            recent_year,
            default_retention_rate,
            default_lateral,
        }
    }

    /// Effective retention rate into the grade at `index` for `school_year`
    pub fn retention(
        &self,
        index: usize,
        school_year: SchoolYear,
    ) -> Result<Resolved<f64>, EngineError> {
        let grade = &self.school.grades()[index];
        let layers = &self.overrides.retention;

        let resolved = resolve(
            layers.explicit_layers(grade, school_year).into_iter().chain([
                (ParameterSource::Global, layers.global),
                (
                    ParameterSource::Historical,
                    self.estimator.retention_default(index, self.recent_year),
                ),
                (ParameterSource::Default, Some(self.default_retention_rate)),
            ]),
        )
        .ok_or_else(|| EngineError::ConfigurationMissing {
            parameter: "retention rate",
            grade: grade.code.clone(),
            school_year: school_year.to_string(),
        })?;

        validate_retention_rate(
            resolved.value,
            &format!("grade {} in {} ({} layer)", grade.code, school_year, resolved.source),
        )?;
        Ok(resolved)
    }

    /// Effective lateral demand for the grade at `index` for `school_year`
    pub fn lateral(
        &self,
        index: usize,
        school_year: SchoolYear,
    ) -> Result<Resolved<LateralDemand>, EngineError> {
        let grade = &self.school.grades()[index];
        let layers = &self.overrides.lateral;

        let resolved = resolve(
            layers.explicit_layers(grade, school_year).into_iter().chain([
                (ParameterSource::Global, layers.global),
                (
                    ParameterSource::Historical,
                    self.estimator
                        .lateral_default(index, self.recent_year)
                        .map(LateralDemand::Students),
                ),
                (ParameterSource::Default, self.default_lateral),
            ]),
        )
        .ok_or_else(|| EngineError::ConfigurationMissing {
            parameter: "lateral-entry demand",
            grade: grade.code.clone(),
            school_year: school_year.to_string(),
        })?;

        resolved.value.validate(&format!(
            "grade {} in {} ({} layer)",
            grade.code, school_year, resolved.source
        ))?;
        Ok(resolved)
    }
}
