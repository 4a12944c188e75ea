//! Projection output rows and summaries

use super::optimizer::OptimizationDecision;
use crate::assumptions::{LateralDemand, ParameterSource};
use crate::calendar::SchoolYear;
use crate::proration::{calculate_proration_by_grade, GradeProration};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One projected (grade, school year) cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub grade: String,
    pub school_year: SchoolYear,
    /// R: students continuing from the grade below
    pub retained_students: u32,
    /// L: lateral entrants admitted by the optimizer
    pub lateral_students: u32,
    /// T = R + L
    pub projected_students: u32,
    /// Lateral demand after scenario scaling, in whole students
    pub lateral_demand: u32,
    pub rejected_students: u32,
    pub decision: OptimizationDecision,
    pub divisions_used: u32,
    /// `None` for the earliest grade and entry points, which retain nobody
    pub retention_rate: Option<f64>,
    pub retention_source: Option<ParameterSource>,
    pub lateral_parameter: LateralDemand,
    pub lateral_source: ParameterSource,
    /// Scenario multiplier applied to the demand (1.0 for manual cells)
    pub demand_multiplier: f64,
}

impl ProjectionRow {
    pub fn is_at_ceiling(&self) -> bool {
        self.decision == OptimizationDecision::RestrictAtCeiling
    }
}

/// Aggregates for one projected school year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    pub school_year: SchoolYear,
    pub retained_students: u32,
    pub lateral_students: u32,
    pub projected_students: u32,
    pub lateral_demand: u32,
    pub rejected_students: u32,
    pub divisions_used: u32,
    /// Grades where demand was turned away
    pub restricted_grades: usize,
}

/// Full output of one projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub fiscal_year: i32,
    pub scenario: Scenario,
    pub base_school_year: SchoolYear,
    /// Per-grade totals of the base school year that seeded the projection
    pub base_totals: BTreeMap<String, u32>,
    /// Rows ordered by school year, then by grade order
    pub rows: Vec<ProjectionRow>,
}

impl ProjectionResult {
    pub fn new(
        fiscal_year: i32,
        scenario: Scenario,
        base_school_year: SchoolYear,
        base_totals: BTreeMap<String, u32>,
    ) -> Self {
        Self {
            fiscal_year,
            scenario,
            base_school_year,
            base_totals,
            rows: Vec::new(),
        }
    }

    pub fn row(&self, grade: &str, school_year: SchoolYear) -> Option<&ProjectionRow> {
        self.rows
            .iter()
            .find(|r| r.grade == grade && r.school_year == school_year)
    }

    /// Projected school years in ascending order
    pub fn school_years(&self) -> Vec<SchoolYear> {
        let mut years: Vec<SchoolYear> = self.rows.iter().map(|r| r.school_year).collect();
        years.dedup();
        years
    }

    /// Per-grade totals of one year; the base year answers from `base_totals`
    pub fn totals_for_year(&self, school_year: SchoolYear) -> Option<BTreeMap<String, u32>> {
        if school_year == self.base_school_year {
            return Some(self.base_totals.clone());
        }
        let totals: BTreeMap<String, u32> = self
            .rows
            .iter()
            .filter(|r| r.school_year == school_year)
            .map(|r| (r.grade.clone(), r.projected_students))
            .collect();
        (!totals.is_empty()).then_some(totals)
    }

    /// School-wide projected total per school year
    pub fn totals_by_year(&self) -> BTreeMap<SchoolYear, u32> {
        let mut totals = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.school_year).or_insert(0) += row.projected_students;
        }
        totals
    }

    pub fn summary(&self) -> Vec<YearSummary> {
        let mut by_year: BTreeMap<SchoolYear, YearSummary> = BTreeMap::new();
        for row in &self.rows {
            let entry = by_year.entry(row.school_year).or_insert_with(|| YearSummary {
                school_year: row.school_year,
                retained_students: 0,
                lateral_students: 0,
                projected_students: 0,
                lateral_demand: 0,
                rejected_students: 0,
                divisions_used: 0,
                restricted_grades: 0,
            });
            entry.retained_students += row.retained_students;
            entry.lateral_students += row.lateral_students;
            entry.projected_students += row.projected_students;
            entry.lateral_demand += row.lateral_demand;
            entry.rejected_students += row.rejected_students;
            entry.divisions_used += row.divisions_used;
            if row.decision.is_restricted() {
                entry.restricted_grades += 1;
            }
        }
        by_year.into_values().collect()
    }

    /// Rows where a new division was justified but the grade had none left
    pub fn ceiling_alerts(&self) -> Vec<&ProjectionRow> {
        self.rows.iter().filter(|r| r.is_at_ceiling()).collect()
    }

    /// Prorate the two school years overlapping `fiscal_year`
    ///
    /// `None` when either school year lies outside the base year and the projected range.
    pub fn fiscal_year_proration(
        &self,
        fiscal_year: i32,
    ) -> Option<BTreeMap<String, GradeProration>> {
        let (prev, curr) = SchoolYear::pair_for_fiscal_year(fiscal_year);
        let prev_totals = self.totals_for_year(prev)?;
        let curr_totals = self.totals_for_year(curr)?;
        Some(calculate_proration_by_grade(&prev_totals, &curr_totals, fiscal_year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn row(
        grade: &str,
        year: i32,
        retained: u32,
        lateral: u32,
        decision: OptimizationDecision,
    ) -> ProjectionRow {
        ProjectionRow {
            grade: grade.to_string(),
            school_year: SchoolYear::new(year),
            retained_students: retained,
            lateral_students: lateral,
            projected_students: retained + lateral,
            lateral_demand: lateral + 2,
            rejected_students: 2,
            decision,
            divisions_used: 2,
            retention_rate: Some(0.96),
            retention_source: Some(ParameterSource::Default),
            lateral_parameter: LateralDemand::Students(5.0),
            lateral_source: ParameterSource::Grade,
            demand_multiplier: 1.0,
        }
    }

    fn result() -> ProjectionResult {
        let mut result = ProjectionResult::new(
            2026,
            Scenario::Base,
            SchoolYear::new(2025),
            BTreeMap::from([("CP".to_string(), 100)]),
        );
        result.rows = vec![
            row("CP", 2026, 0, 60, OptimizationDecision::Restrict),
            row("CE1", 2026, 50, 10, OptimizationDecision::AcceptAll),
            row("CP", 2027, 0, 55, OptimizationDecision::RestrictAtCeiling),
            row("CE1", 2027, 58, 4, OptimizationDecision::AcceptFillMax),
        ];
        result
    }

    #[test]
    fn test_row_lookup_and_totals() {
        let result = result();
        assert_eq!(result.row("CE1", SchoolYear::new(2027)).unwrap().projected_students, 62);
        assert!(result.row("CM1", SchoolYear::new(2027)).is_none());
        assert_eq!(
            result.school_years(),
            vec![SchoolYear::new(2026), SchoolYear::new(2027)]
        );

        let totals = result.totals_by_year();
        assert_eq!(totals[&SchoolYear::new(2026)], 120);
        assert_eq!(totals[&SchoolYear::new(2027)], 117);
    }

    #[test]
    fn test_summary_aggregates_each_year() {
        let summary = result().summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].retained_students, 50);
        assert_eq!(summary[0].lateral_students, 70);
        assert_eq!(summary[0].rejected_students, 4);
        assert_eq!(summary[0].restricted_grades, 1);
        assert_eq!(summary[1].restricted_grades, 1);
    }

    #[test]
    fn test_ceiling_alerts() {
        let result = result();
        let alerts = result.ceiling_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].grade, "CP");
        assert_eq!(alerts[0].school_year, SchoolYear::new(2027));
    }

    #[test]
    fn test_fiscal_year_proration_blends_base_and_first_year() {
        let result = result();
        let proration = result.fiscal_year_proration(2026).unwrap();
        // CP: (100 * 8 + 60 * 4) / 12
        assert_abs_diff_eq!(proration["CP"].weighted_enrollment, 86.7, epsilon = 1e-9);
        // CE1 absent from the base year counts as zero
        assert_abs_diff_eq!(proration["CE1"].weighted_enrollment, 20.0, epsilon = 1e-9);

        assert!(result.fiscal_year_proration(2027).is_some());
        assert!(result.fiscal_year_proration(2030).is_none());
    }
}
