//! Default retention and lateral-entry rates estimated from two years of actuals
//!
//! default = 0.70 * observation(N-1) + 0.30 * observation(N-2), where N-1 is the most
//! recent completed school year. With one year of history it is used at weight 1.0.

use crate::calendar::SchoolYear;
use crate::school::SchoolData;
use log::warn;

/// Weight of the most recent completed year
pub const RECENT_YEAR_WEIGHT: f64 = 0.70;

/// Weight of the year before that
pub const PRIOR_YEAR_WEIGHT: f64 = 0.30;

/// Blend two optional observations with the 70/30 weighting
pub fn weighted_rate(recent: Option<f64>, prior: Option<f64>) -> Option<f64> {
    match (recent, prior) {
        (Some(r), Some(p)) => Some(RECENT_YEAR_WEIGHT * r + PRIOR_YEAR_WEIGHT * p),
        (Some(r), None) => Some(r),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

/// Derives per-grade default rates from actual enrollment snapshots
#[derive(Debug, Clone, Copy)]
pub struct HistoricalRateEstimator<'a> {
    school: &'a SchoolData,
}

impl<'a> HistoricalRateEstimator<'a> {
    pub fn new(school: &'a SchoolData) -> Self {
        Self { school }
    }

    /// Grades whose whole intake is lateral: the earliest grade and entry points
    fn has_no_feeder(&self, index: usize) -> bool {
        index == 0 || self.school.grades()[index].is_entry_point
    }

    /// Observed retention rate into the grade at `index` during `school_year`
    ///
    /// `retained(g, N) / total(g-1, N-1)`, from actuals only.
    pub fn retention_observation(&self, index: usize, school_year: SchoolYear) -> Option<f64> {
        if self.has_no_feeder(index) {
            return None;
        }
        let grade = &self.school.grades()[index];
        let feeder = self.school.feeder(index)?;
        let snapshots = self.school.snapshots();

        let retained = snapshots.actual(&grade.code, school_year)?.retained_count()?;
        let feeder_total = snapshots.actual(&feeder.code, school_year.previous())?.total;
        if feeder_total == 0 {
            return None;
        }

        let rate = retained as f64 / feeder_total as f64;
        if rate > 1.0 {
            warn!(
                "Observed retention into {} for {} is {:.3} (> 1), capping at 1.0",
                grade.code, school_year, rate
            );
            return Some(1.0);
        }
        Some(rate)
    }

    /// Observed lateral entrants into the grade at `index` during `school_year`
    pub fn lateral_observation(&self, index: usize, school_year: SchoolYear) -> Option<f64> {
        let grade = &self.school.grades()[index];
        let snapshot = self.school.snapshots().actual(&grade.code, school_year)?;
        if self.has_no_feeder(index) {
            return Some(snapshot.total as f64);
        }
        snapshot.lateral_count().map(f64::from)
    }

    /// Default retention rate for the grade, given the most recent completed year
    pub fn retention_default(&self, index: usize, recent_year: SchoolYear) -> Option<f64> {
        weighted_rate(
            self.retention_observation(index, recent_year),
            self.retention_observation(index, recent_year.previous()),
        )
    }

    /// Default expected lateral entrants for the grade, given the most recent completed year
    pub fn lateral_default(&self, index: usize, recent_year: SchoolYear) -> Option<f64> {
        weighted_rate(
            self.lateral_observation(index, recent_year),
            self.lateral_observation(index, recent_year.previous()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::school::{ClassSizeConfig, EnrollmentSnapshot, Grade, SnapshotBook};
    use approx::assert_abs_diff_eq;

    fn school(snapshots: Vec<EnrollmentSnapshot>) -> SchoolData {
        let config = ClassSizeConfig::new(25, 28, 4);
        SchoolData::new(
            vec![
                Grade::new("PS", "maternelle", 1, true, config),
                Grade::new("MS", "maternelle", 2, false, config),
                Grade::new("CP", "elementaire", 3, true, config),
            ],
            SnapshotBook::from_snapshots(snapshots).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_rate() {
        assert_abs_diff_eq!(weighted_rate(Some(0.9), Some(0.8)).unwrap(), 0.87, epsilon = 1e-12);
        assert_eq!(weighted_rate(Some(0.9), None), Some(0.9));
        assert_eq!(weighted_rate(None, Some(0.8)), Some(0.8));
        assert_eq!(weighted_rate(None, None), None);
    }

    #[test]
    fn test_two_years_of_history() {
        let y = SchoolYear::new;
        let school = school(vec![
            EnrollmentSnapshot::actual("PS", y(2022), 50),
            EnrollmentSnapshot::actual("PS", y(2023), 40),
            EnrollmentSnapshot::actual("PS", y(2024), 60),
            // 2023: 45 of PS 2022's 50 continued -> 0.90, plus 5 lateral
            EnrollmentSnapshot::actual("MS", y(2023), 50).with_breakdown(45, 5),
            // 2024: 32 of PS 2023's 40 continued -> 0.80, plus 10 lateral
            EnrollmentSnapshot::actual("MS", y(2024), 42).with_breakdown(32, 10),
        ]);
        let estimator = HistoricalRateEstimator::new(&school);

        // 0.7 * 0.80 + 0.3 * 0.90
        let retention = estimator.retention_default(1, y(2024)).unwrap();
        assert_abs_diff_eq!(retention, 0.83, epsilon = 1e-12);
        // 0.7 * 10 + 0.3 * 5
        assert_abs_diff_eq!(estimator.lateral_default(1, y(2024)).unwrap(), 8.5, epsilon = 1e-12);
        // PS intake is its whole total: 0.7 * 60 + 0.3 * 40
        assert_abs_diff_eq!(estimator.lateral_default(0, y(2024)).unwrap(), 54.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_year_uses_full_weight() {
        let y = SchoolYear::new;
        let school = school(vec![
            EnrollmentSnapshot::actual("PS", y(2023), 40),
            EnrollmentSnapshot::actual("MS", y(2024), 42).with_breakdown(36, 6),
        ]);
        let estimator = HistoricalRateEstimator::new(&school);
        assert_abs_diff_eq!(estimator.retention_default(1, y(2024)).unwrap(), 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.lateral_default(1, y(2024)).unwrap(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_history() {
        let school = school(vec![]);
        let estimator = HistoricalRateEstimator::new(&school);
        assert!(estimator.retention_default(1, SchoolYear::new(2024)).is_none());
        assert!(estimator.lateral_default(1, SchoolYear::new(2024)).is_none());
    }

    #[test]
    fn test_entry_point_has_no_retention_observation() {
        let y = SchoolYear::new;
        let school = school(vec![
            EnrollmentSnapshot::actual("MS", y(2023), 50),
            EnrollmentSnapshot::actual("CP", y(2024), 70).with_breakdown(45, 25),
        ]);
        let estimator = HistoricalRateEstimator::new(&school);
        assert!(estimator.retention_observation(2, y(2024)).is_none());
        // every CP student counts as intake
        assert_eq!(estimator.lateral_observation(2, y(2024)), Some(70.0));
    }

    #[test]
    fn test_planned_snapshots_are_ignored() {
        let y = SchoolYear::new;
        let school = school(vec![
            EnrollmentSnapshot::actual("PS", y(2023), 40),
            EnrollmentSnapshot::planned("MS", y(2024), 42).with_breakdown(36, 6),
        ]);
        let estimator = HistoricalRateEstimator::new(&school);
        assert!(estimator.retention_default(1, y(2024)).is_none());
    }

    #[test]
    fn test_observed_rate_above_one_is_capped() {
        let y = SchoolYear::new;
        let school = school(vec![
            EnrollmentSnapshot::actual("PS", y(2023), 30),
            EnrollmentSnapshot::actual("MS", y(2024), 33).with_breakdown(33, 0),
        ]);
        let estimator = HistoricalRateEstimator::new(&school);
        assert_eq!(estimator.retention_observation(1, y(2024)), Some(1.0));
    }
}
