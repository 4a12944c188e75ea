//! Cohort state threaded from one projected school year to the next

use crate::calendar::SchoolYear;
use std::collections::BTreeMap;

/// Per-grade totals of one school year, used as the "prior year" input of the next
///
/// The engine never mutates a state in place: each projected year produces a new one
/// via `advance`, so any year can be recomputed from the state that preceded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortState {
    school_year: SchoolYear,
    totals: BTreeMap<String, u32>,
}

impl CohortState {
    /// Starting state from base-year enrollment
    pub fn seed(school_year: SchoolYear, totals: BTreeMap<String, u32>) -> Self {
        Self {
            school_year,
            totals,
        }
    }

    pub fn school_year(&self) -> SchoolYear {
        self.school_year
    }

    /// Total for a grade, zero when the grade had no students
    pub fn total(&self, grade: &str) -> u32 {
        self.totals.get(grade).copied().unwrap_or(0)
    }

    pub fn grand_total(&self) -> u32 {
        self.totals.values().sum()
    }

    /// State for the following school year
    pub fn advance(&self, totals: BTreeMap<String, u32>) -> Self {
        Self {
            school_year: self.school_year.next(),
            totals,
        }
    }
}
