//! Core projection engine for grade-by-grade, year-by-year enrollment projections

use super::optimizer::{LateralEntryOptimizer, OptimizerInput};
use super::results::{ProjectionResult, ProjectionRow};
use super::state::CohortState;
use crate::assumptions::{
    apply_retention_model_with, validate_retention_rate, LateralDemand, OverrideSet,
    ParameterResolver, ParameterSource, Resolved, RoundingMode, DEFAULT_RETENTION_RATE,
};
use crate::calendar::SchoolYear;
use crate::error::{EngineError, LoadError};
use crate::scenario::{Scenario, ScenarioMultipliers};
use crate::school::SchoolData;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Years projected after the base school year unless configured otherwise
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Longest horizon accepted
pub const MAX_HORIZON_YEARS: u32 = 30;

fn default_horizon_years() -> u32 {
    DEFAULT_HORIZON_YEARS
}

fn default_retention_rate() -> f64 {
    DEFAULT_RETENTION_RATE
}

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Number of school years to project after the base year
    #[serde(default = "default_horizon_years")]
    pub horizon_years: u32,

    /// Retention rate used when no override or history exists
    #[serde(default = "default_retention_rate")]
    pub default_retention_rate: f64,

    /// Lateral demand used when no override or history exists
    #[serde(default)]
    pub global_lateral_default: Option<LateralDemand>,

    /// Share of `max_class_size` a new division must be able to take before it opens
    #[serde(default)]
    pub new_class_fraction: Option<f64>,

    #[serde(default)]
    pub rounding: RoundingMode,

    #[serde(default)]
    pub scenario_multipliers: ScenarioMultipliers,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
            default_retention_rate: DEFAULT_RETENTION_RATE,
            global_lateral_default: None,
            new_class_fraction: None,
            rounding: RoundingMode::HalfUp,
            scenario_multipliers: ScenarioMultipliers::default(),
        }
    }
}

impl ProjectionConfig {
    /// Load a JSON config file; absent fields take their defaults
    pub fn from_json_path(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.horizon_years == 0 || self.horizon_years > MAX_HORIZON_YEARS {
            return Err(EngineError::validation(format!(
                "horizon_years {} must be between 1 and {MAX_HORIZON_YEARS}",
                self.horizon_years
            )));
        }
        validate_retention_rate(self.default_retention_rate, "default_retention_rate")?;
        if let Some(lateral) = &self.global_lateral_default {
            lateral.validate("global_lateral_default")?;
        }
        LateralEntryOptimizer::new(self.new_class_fraction).validate()?;
        self.scenario_multipliers.validate()
    }
}

/// One projection to run
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    /// Fiscal year Y; the base school year is `(Y-1)/Y`
    pub fiscal_year: i32,
    pub scenario: Scenario,
    pub overrides: OverrideSet,
}

impl ProjectionRequest {
    pub fn new(fiscal_year: i32, scenario: Scenario) -> Self {
        Self {
            fiscal_year,
            scenario,
            overrides: OverrideSet::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideSet) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn base_school_year(&self) -> SchoolYear {
        SchoolYear::new(self.fiscal_year - 1)
    }
}

/// Parameters resolved for one (grade, year) before any arithmetic runs
#[derive(Debug, Clone, Copy)]
struct CellPlan {
    /// `None` for grades that retain nobody
    retention: Option<Resolved<f64>>,
    lateral: Resolved<LateralDemand>,
}

/// Main projection engine
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    school: SchoolData,
    config: ProjectionConfig,
}

impl ProjectionEngine {
    pub fn new(school: SchoolData, config: ProjectionConfig) -> Self {
        Self { school, config }
    }

    pub fn school(&self) -> &SchoolData {
        &self.school
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Project every grade over the configured horizon
    ///
    /// All parameters are validated and resolved for every year before the first
    /// year is computed, so a failure never leaves a partial result behind.
    pub fn project(&self, request: &ProjectionRequest) -> Result<ProjectionResult, EngineError> {
        self.config.validate()?;
        let optimizer = LateralEntryOptimizer::new(self.config.new_class_fraction);
        let base_year = request.base_school_year();

        info!(
            "Projecting FY{} ({} scenario): base {}, {} years, {} grades",
            request.fiscal_year,
            request.scenario,
            base_year,
            self.config.horizon_years,
            self.school.grades().len()
        );

        self.warn_unknown_overrides(&request.overrides);
        for (scope, rate) in request.overrides.retention.entries() {
            debug!("Retention override for {scope}: {rate}");
        }
        for (scope, demand) in request.overrides.lateral.entries() {
            debug!("Lateral override for {scope}: {demand}");
        }
        let base_totals = self.base_totals(base_year)?;

        let resolver = ParameterResolver::new(
            &self.school,
            &request.overrides,
            base_year,
            self.config.default_retention_rate,
            self.config.global_lateral_default,
        );
        let plan = (1..=self.config.horizon_years as i32)
            .map(|k| self.resolve_year(&resolver, base_year.offset(k)))
            .collect::<Result<Vec<_>, _>>()?;

        let multiplier = self
            .config
            .scenario_multipliers
            .for_scenario(request.scenario);

        let mut result = ProjectionResult::new(
            request.fiscal_year,
            request.scenario,
            base_year,
            base_totals.clone(),
        );
        let mut state = CohortState::seed(base_year, base_totals);

        for cells in &plan {
            let (rows, next) = self.project_year(&state, cells, multiplier, &optimizer)?;
            result.rows.extend(rows);
            state = next;
        }

        info!(
            "FY{} {}: {} students projected for {}",
            request.fiscal_year,
            request.scenario,
            state.grand_total(),
            state.school_year()
        );

        Ok(result)
    }

    /// Base-year totals per grade, actual enrollment preferred
    fn base_totals(&self, base_year: SchoolYear) -> Result<BTreeMap<String, u32>, EngineError> {
        let snapshots = self.school.snapshots();
        let mut totals = BTreeMap::new();
        let mut found = 0;

        for grade in self.school.grades() {
            let total = match snapshots.get(&grade.code, base_year) {
                Some(snapshot) => {
                    if !snapshot.is_actual() {
                        warn!(
                            "No actual enrollment for {} in {}, using planned figure {}",
                            grade.code, base_year, snapshot.total
                        );
                    }
                    found += 1;
                    snapshot.total
                }
                None => {
                    warn!(
                        "Grade {} has no enrollment in {}, starting from 0",
                        grade.code, base_year
                    );
                    0
                }
            };
            totals.insert(grade.code.clone(), total);
        }

        if found == 0 {
            return Err(EngineError::validation(format!(
                "no enrollment recorded for base school year {base_year}"
            )));
        }
        Ok(totals)
    }

    fn resolve_year(
        &self,
        resolver: &ParameterResolver<'_>,
        school_year: SchoolYear,
    ) -> Result<Vec<CellPlan>, EngineError> {
        self.school
            .grades()
            .iter()
            .enumerate()
            .map(|(index, grade)| -> Result<CellPlan, EngineError> {
                let retention = if index == 0 || grade.is_entry_point {
                    None
                } else {
                    Some(resolver.retention(index, school_year)?)
                };
                Ok(CellPlan {
                    retention,
                    lateral: resolver.lateral(index, school_year)?,
                })
            })
            .collect()
    }

    /// Compute one school year from the state of the year before
    fn project_year(
        &self,
        prior: &CohortState,
        cells: &[CellPlan],
        multiplier: f64,
        optimizer: &LateralEntryOptimizer,
    ) -> Result<(Vec<ProjectionRow>, CohortState), EngineError> {
        let school_year = prior.school_year().next();
        let rounding = self.config.rounding;
        let mut rows = Vec::with_capacity(cells.len());
        let mut totals = BTreeMap::new();

        for (index, (grade, cell)) in self.school.grades().iter().zip(cells).enumerate() {
            let class_size = grade.class_size;
            let own_prior = prior.total(&grade.code);
            let feeder_prior = match (cell.retention, self.school.feeder(index)) {
                (Some(_), Some(feeder)) => Some(prior.total(&feeder.code)),
                _ => None,
            };

            let retained = match (cell.retention, feeder_prior) {
                (Some(rate), Some(count)) => {
                    apply_retention_model_with(count, rate.value, rounding)?
                }
                _ => 0,
            };

            // manual per-cell demand is taken as entered
            let demand_multiplier = if cell.lateral.source == ParameterSource::Manual {
                1.0
            } else {
                multiplier
            };
            let cohort_base = feeder_prior.unwrap_or(own_prior);
            let demand = rounding.round_students(
                cell.lateral.value.expected_students(cohort_base) * demand_multiplier,
            );

            let outcome = if index == 0 {
                let base_classes = class_size.divisions_for(own_prior);
                optimizer.optimize_ps_entry(demand, base_classes, &class_size)
            } else {
                let base_classes = if cell.retention.is_some() {
                    class_size.divisions_for(retained)
                } else {
                    class_size.divisions_for(own_prior)
                };
                optimizer.optimize(&OptimizerInput {
                    demand,
                    current_enrolled: retained,
                    base_classes,
                    class_size,
                })
            };

            let projected = retained.saturating_add(outcome.admitted);
            debug!(
                "{} {}: R={} L={}/{} T={} {} (retention {}, lateral {})",
                grade.code,
                school_year,
                retained,
                outcome.admitted,
                demand,
                projected,
                outcome.decision,
                cell.retention
                    .map(|r| r.source.as_str())
                    .unwrap_or("none"),
                cell.lateral.source
            );

            totals.insert(grade.code.clone(), projected);
            rows.push(ProjectionRow {
                grade: grade.code.clone(),
                school_year,
                retained_students: retained,
                lateral_students: outcome.admitted,
                projected_students: projected,
                lateral_demand: demand,
                rejected_students: outcome.rejected,
                decision: outcome.decision,
                divisions_used: outcome.divisions_used,
                retention_rate: cell.retention.map(|r| r.value),
                retention_source: cell.retention.map(|r| r.source),
                lateral_parameter: cell.lateral.value,
                lateral_source: cell.lateral.source,
                demand_multiplier,
            });
        }

        Ok((rows, prior.advance(totals)))
    }

    /// Overrides naming grades or levels the school does not have are ignored
    fn warn_unknown_overrides(&self, overrides: &OverrideSet) {
        let school = &self.school;
        let check = |kind: &str, levels: Vec<&String>, grades: Vec<&String>| {
            for level in levels.into_iter().filter(|l| !school.has_level(l)) {
                warn!("Ignoring {kind} override for unknown level {level}");
            }
            for grade in grades.into_iter().filter(|g| !school.has_grade(g)) {
                warn!("Ignoring {kind} override for unknown grade {grade}");
            }
        };

        let retention = &overrides.retention;
        check(
            "retention",
            retention.levels.keys().collect(),
            retention
                .grades
                .keys()
                .chain(retention.manual.keys().map(|(g, _)| g))
                .collect(),
        );
        let lateral = &overrides.lateral;
        check(
            "lateral",
            lateral.levels.keys().collect(),
            lateral
                .grades
                .keys()
                .chain(lateral.manual.keys().map(|(g, _)| g))
                .collect(),
        );
    }
}
