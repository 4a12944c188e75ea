//! Fiscal-year proration of school-year enrollment
//!
//! Fiscal year Y is weighted 8/12 on school year `(Y-1)/Y` and 4/12 on `Y/(Y+1)`.
//! Weighted figures are rounded to one decimal, half-up, using integer arithmetic so
//! that results like 106.7 are exact rather than subject to binary rounding.

use crate::calendar::{SchoolYear, CURRENT_SCHOOL_YEAR_MONTHS, PRIOR_SCHOOL_YEAR_MONTHS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proration of one grade across the two school years of a fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeProration {
    pub fiscal_year: i32,
    pub prev_school_year: SchoolYear,
    pub curr_school_year: SchoolYear,
    /// Enrollment in `(Y-1)/Y`, zero when the grade was absent
    pub prev_enrollment: u32,
    /// Enrollment in `Y/(Y+1)`, zero when the grade is absent
    pub curr_enrollment: u32,
    pub weighted_enrollment: f64,
}

/// School-year labels overlapped by fiscal year Y: `("Y-1/Y", "Y/Y+1")`
pub fn get_school_years_for_fiscal_year(fiscal_year: i32) -> (String, String) {
    let (prev, curr) = SchoolYear::pair_for_fiscal_year(fiscal_year);
    (prev.to_string(), curr.to_string())
}

/// Month-weighted enrollment for a fiscal year
///
/// `round((prev * 8 + curr * 4) / 12, 1)`, ties rounded up.
pub fn calculate_fiscal_year_weighted_enrollment(prev_count: u32, curr_count: u32) -> f64 {
    const MONTHS: u64 = (PRIOR_SCHOOL_YEAR_MONTHS + CURRENT_SCHOOL_YEAR_MONTHS) as u64;

    let student_months = prev_count as u64 * PRIOR_SCHOOL_YEAR_MONTHS as u64
        + curr_count as u64 * CURRENT_SCHOOL_YEAR_MONTHS as u64;
    // floor(x * 10 + 0.5) expressed over the integer denominator
    let tenths = (student_months * 10 + MONTHS / 2) / MONTHS;
    tenths as f64 / 10.0
}

/// Prorate every grade of two school-year enrollment maps into a fiscal year
///
/// The result covers the union of both key sets. A grade missing from one map is
/// counted as zero for that school year, never dropped.
pub fn calculate_proration_by_grade(
    prev_map: &BTreeMap<String, u32>,
    curr_map: &BTreeMap<String, u32>,
    fiscal_year: i32,
) -> BTreeMap<String, GradeProration> {
    let (prev_school_year, curr_school_year) = SchoolYear::pair_for_fiscal_year(fiscal_year);

    prev_map
        .keys()
        .chain(curr_map.keys())
        .map(|grade| {
            let prev_enrollment = prev_map.get(grade).copied().unwrap_or(0);
            let curr_enrollment = curr_map.get(grade).copied().unwrap_or(0);
            let proration = GradeProration {
                fiscal_year,
                prev_school_year,
                curr_school_year,
                prev_enrollment,
                curr_enrollment,
                weighted_enrollment: calculate_fiscal_year_weighted_enrollment(
                    prev_enrollment,
                    curr_enrollment,
                ),
            };
            (grade.clone(), proration)
        })
        .collect()
}

/// Sum of weighted enrollment across grades, rounded to one decimal
pub fn total_weighted_enrollment(prorations: &BTreeMap<String, GradeProration>) -> f64 {
    let prev: u32 = prorations.values().map(|p| p.prev_enrollment).sum();
    let curr: u32 = prorations.values().map(|p| p.curr_enrollment).sum();
    calculate_fiscal_year_weighted_enrollment(prev, curr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn map(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_school_year_labels() {
        assert_eq!(
            get_school_years_for_fiscal_year(2026),
            ("2025/2026".to_string(), "2026/2027".to_string())
        );
    }

    #[test]
    fn test_weighted_enrollment_exact() {
        assert_eq!(calculate_fiscal_year_weighted_enrollment(120, 150), 130.0);
        assert_eq!(calculate_fiscal_year_weighted_enrollment(0, 0), 0.0);
        assert_eq!(calculate_fiscal_year_weighted_enrollment(12, 12), 12.0);
    }

    #[test]
    fn test_weighted_enrollment_rounds_half_up() {
        // (1*8 + 0*4) / 12 = 0.6666.. -> 0.7
        assert_eq!(calculate_fiscal_year_weighted_enrollment(1, 0), 0.7);
        // (0*8 + 1*4) / 12 = 0.3333.. -> 0.3
        assert_eq!(calculate_fiscal_year_weighted_enrollment(0, 1), 0.3);
        // (3*8 + 0*4) / 12 = 2.0 ; (0*8 + 3*4)/12 = 1.0
        assert_eq!(calculate_fiscal_year_weighted_enrollment(3, 0), 2.0);
        assert_eq!(calculate_fiscal_year_weighted_enrollment(0, 3), 1.0);
    }

    #[test]
    fn test_proration_worked_example() {
        let prev = map(&[("CP", 100)]);
        let curr = map(&[("CP", 120), ("CE1", 110)]);

        let result = calculate_proration_by_grade(&prev, &curr, 2026);

        assert_eq!(result.len(), 2);
        assert_abs_diff_eq!(result["CP"].weighted_enrollment, 106.7, epsilon = 1e-9);
        assert_abs_diff_eq!(result["CE1"].weighted_enrollment, 36.7, epsilon = 1e-9);
        assert_eq!(result["CE1"].prev_enrollment, 0);
        assert_eq!(result["CE1"].curr_enrollment, 110);
        assert_eq!(result["CP"].prev_school_year.to_string(), "2025/2026");
        assert_eq!(result["CP"].curr_school_year.to_string(), "2026/2027");
    }

    #[test]
    fn test_proration_key_set_is_union() {
        let prev = map(&[("PS", 40), ("MS", 45), ("CM2", 60)]);
        let curr = map(&[("MS", 42), ("GS", 50)]);

        let result = calculate_proration_by_grade(&prev, &curr, 2027);
        let keys: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["CM2", "GS", "MS", "PS"]);

        // present only in the prior year: curr counted as zero
        assert_eq!(result["CM2"].curr_enrollment, 0);
        assert_eq!(result["CM2"].weighted_enrollment, 40.0);
        // present only in the current year: prev counted as zero
        assert_eq!(result["GS"].prev_enrollment, 0);
        assert_abs_diff_eq!(result["GS"].weighted_enrollment, 16.7, epsilon = 1e-9);
    }

    #[test]
    fn test_proration_of_empty_maps() {
        let empty = BTreeMap::new();
        assert!(calculate_proration_by_grade(&empty, &empty, 2026).is_empty());
    }

    #[test]
    fn test_total_weighted_enrollment() {
        let prev = map(&[("CP", 100)]);
        let curr = map(&[("CP", 120), ("CE1", 110)]);
        let result = calculate_proration_by_grade(&prev, &curr, 2026);
        // (100*8 + 230*4) / 12 = 143.33..
        assert_abs_diff_eq!(total_weighted_enrollment(&result), 143.3, epsilon = 1e-9);
    }
}
