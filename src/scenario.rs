//! Demand scenarios and a runner for projecting several of them at once
//!
//! Each scenario scales lateral-entry demand by a multiplier. Projections are pure
//! functions of their inputs, so the runner evaluates scenarios in parallel.

use crate::assumptions::OverrideSet;
use crate::error::EngineError;
use crate::projection::{ProjectionConfig, ProjectionEngine, ProjectionRequest, ProjectionResult};
use crate::school::SchoolData;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named lateral-demand preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Worst,
    Base,
    Best,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Worst, Scenario::Base, Scenario::Best];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Worst => "worst",
            Scenario::Base => "base",
            Scenario::Best => "best",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a scenario name is not recognised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown scenario '{0}' (expected worst, base or best)")]
pub struct ParseScenarioError(String);

impl FromStr for Scenario {
    type Err = ParseScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worst" => Ok(Scenario::Worst),
            "base" => Ok(Scenario::Base),
            "best" => Ok(Scenario::Best),
            _ => Err(ParseScenarioError(s.trim().to_string())),
        }
    }
}

fn default_worst() -> f64 {
    0.90
}

fn default_base() -> f64 {
    1.00
}

fn default_best() -> f64 {
    1.10
}

/// Lateral-demand multiplier per scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMultipliers {
    #[serde(default = "default_worst")]
    pub worst: f64,
    #[serde(default = "default_base")]
    pub base: f64,
    #[serde(default = "default_best")]
    pub best: f64,
}

impl Default for ScenarioMultipliers {
    fn default() -> Self {
        Self {
            worst: default_worst(),
            base: default_base(),
            best: default_best(),
        }
    }
}

impl ScenarioMultipliers {
    pub fn for_scenario(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Worst => self.worst,
            Scenario::Base => self.base,
            Scenario::Best => self.best,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for scenario in Scenario::ALL {
            let multiplier = self.for_scenario(scenario);
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(EngineError::validation(format!(
                    "{scenario} scenario multiplier {multiplier} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}

/// Runs projections for one school under one configuration
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(school, ProjectionConfig::default());
/// let results = runner.run_all(2026, &overrides)?;
/// for result in &results {
///     println!("{}: {}", result.scenario, result.summary().len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    engine: ProjectionEngine,
}

impl ScenarioRunner {
    pub fn new(school: SchoolData, config: ProjectionConfig) -> Self {
        Self {
            engine: ProjectionEngine::new(school, config),
        }
    }

    /// Project a single scenario
    pub fn run(
        &self,
        fiscal_year: i32,
        scenario: Scenario,
        overrides: &OverrideSet,
    ) -> Result<ProjectionResult, EngineError> {
        let request =
            ProjectionRequest::new(fiscal_year, scenario).with_overrides(overrides.clone());
        self.engine.project(&request)
    }

    /// Project worst, base and best in parallel, returned in that order
    pub fn run_all(
        &self,
        fiscal_year: i32,
        overrides: &OverrideSet,
    ) -> Result<Vec<ProjectionResult>, EngineError> {
        Scenario::ALL
            .par_iter()
            .map(|&scenario| self.run(fiscal_year, scenario, overrides))
            .collect()
    }

    /// Project a batch of independent requests in parallel
    pub fn run_batch(
        &self,
        requests: &[ProjectionRequest],
    ) -> Vec<Result<ProjectionResult, EngineError>> {
        requests
            .par_iter()
            .map(|request| self.engine.project(request))
            .collect()
    }

    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::SchoolYear;
    use crate::school::{ClassSizeConfig, EnrollmentSnapshot, Grade, SnapshotBook};

    fn runner() -> ScenarioRunner {
        let config = ClassSizeConfig::new(20, 25, 4);
        let y = SchoolYear::new;
        let school = SchoolData::new(
            vec![
                Grade::new("PS", "maternelle", 1, true, config),
                Grade::new("MS", "maternelle", 2, false, config),
            ],
            SnapshotBook::from_snapshots(vec![
                EnrollmentSnapshot::actual("PS", y(2024), 40),
                EnrollmentSnapshot::actual("PS", y(2025), 40),
                EnrollmentSnapshot::actual("MS", y(2025), 38).with_breakdown(36, 2),
            ])
            .unwrap(),
        )
        .unwrap();
        ScenarioRunner::new(school, ProjectionConfig::default())
    }

    #[test]
    fn test_scenario_parse_and_display() {
        assert_eq!("Worst".parse::<Scenario>().unwrap(), Scenario::Worst);
        assert_eq!(" best ".parse::<Scenario>().unwrap(), Scenario::Best);
        let err = "optimistic".parse::<Scenario>().unwrap_err();
        assert_eq!(err, ParseScenarioError("optimistic".to_string()));
        assert!(err.to_string().contains("worst, base or best"));
        assert_eq!(Scenario::Base.to_string(), "base");
    }

    #[test]
    fn test_multipliers_validation() {
        let multipliers = ScenarioMultipliers::default();
        assert_eq!(multipliers.for_scenario(Scenario::Best), 1.10);
        assert!(multipliers.validate().is_ok());

        let bad = ScenarioMultipliers {
            worst: -0.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_run_all_orders_scenarios() {
        let runner = runner();
        let results = runner.run_all(2026, &OverrideSet::new()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].scenario, Scenario::Worst);
        assert_eq!(results[1].scenario, Scenario::Base);
        assert_eq!(results[2].scenario, Scenario::Best);

        // more demand never projects fewer students
        let first_year = SchoolYear::new(2026);
        let ps = |r: &ProjectionResult| r.row("PS", first_year).unwrap().projected_students;
        assert!(ps(&results[0]) <= ps(&results[1]));
        assert!(ps(&results[1]) <= ps(&results[2]));
    }

    #[test]
    fn test_run_batch_matches_single_runs() {
        let runner = runner();
        let requests = vec![
            ProjectionRequest::new(2026, Scenario::Base),
            ProjectionRequest::new(2026, Scenario::Best),
        ];
        let batch = runner.run_batch(&requests);
        let single = runner.run(2026, Scenario::Best, &OverrideSet::new()).unwrap();
        assert_eq!(batch[1].as_ref().unwrap(), &single);
    }

    #[test]
    fn test_sample_school_all_scenarios() {
        use crate::assumptions::loader::load_overrides;
        use std::path::Path;

        let school = SchoolData::from_csv().expect("Failed to load sample school");
        let overrides = load_overrides(Path::new("data/sample")).unwrap();
        let config = ProjectionConfig::from_json_path(Path::new("data/config.json")).unwrap();
        let runner = ScenarioRunner::new(school, config);

        let results = runner.run_all(2026, &overrides).unwrap();
        let totals: Vec<u32> = results
            .iter()
            .map(|r| r.totals_by_year()[&SchoolYear::new(2026)])
            .collect();
        assert!(totals[0] <= totals[1] && totals[1] <= totals[2]);

        // the manual CP intake is used as entered in every scenario
        for result in &results {
            let cp = result.row("CP", SchoolYear::new(2026)).unwrap();
            assert_eq!(cp.lateral_demand, 88);
        }
    }
}
