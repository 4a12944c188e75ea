//! School structure (grades, class sizes) and enrollment snapshots

mod data;
mod snapshots;
pub mod loader;

pub use data::{ClassSizeConfig, EnrollmentSnapshot, Grade, SnapshotKind};
pub use snapshots::SnapshotBook;

use crate::error::{EngineError, LoadError};
use log::info;
use std::collections::HashSet;
use std::path::Path;

/// Default path to the bundled sample school
pub const DEFAULT_DATA_PATH: &str = "data/sample";

/// Validated grade sequence plus enrollment history for one school
#[derive(Debug, Clone)]
pub struct SchoolData {
    /// Grades in ascending academic order
    grades: Vec<Grade>,
    snapshots: SnapshotBook,
}

impl SchoolData {
    /// Sort grades by display order and validate the structure
    pub fn new(mut grades: Vec<Grade>, snapshots: SnapshotBook) -> Result<Self, EngineError> {
        if grades.is_empty() {
            return Err(EngineError::validation("school has no grades"));
        }

        grades.sort_by_key(|g| g.display_order);

        let mut codes = HashSet::new();
        for (idx, grade) in grades.iter().enumerate() {
            if !codes.insert(grade.code.as_str()) {
                return Err(EngineError::validation(format!(
                    "duplicate grade code {}",
                    grade.code
                )));
            }
            if idx > 0 && grades[idx - 1].display_order == grade.display_order {
                return Err(EngineError::validation(format!(
                    "grades {} and {} share display order {}",
                    grades[idx - 1].code,
                    grade.code,
                    grade.display_order
                )));
            }
            grade.class_size.validate(&grade.code)?;
        }

        Ok(Self { grades, snapshots })
    }

    /// Load from the default sample directory
    pub fn from_csv() -> Result<Self, LoadError> {
        Self::from_csv_path(Path::new(DEFAULT_DATA_PATH))
    }

    /// Load `grades.csv` and `enrollment.csv` from a directory
    pub fn from_csv_path(dir: &Path) -> Result<Self, LoadError> {
        let grades = loader::load_grades(dir)?;
        let snapshots = SnapshotBook::from_snapshots(loader::load_enrollment(dir)?)?;
        info!(
            "Loaded {} grades and {} enrollment snapshots from {}",
            grades.len(),
            snapshots.len(),
            dir.display()
        );
        Ok(Self::new(grades, snapshots)?)
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn grade(&self, code: &str) -> Option<&Grade> {
        self.grades.iter().find(|g| g.code == code)
    }

    pub fn has_grade(&self, code: &str) -> bool {
        self.grade(code).is_some()
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.grades.iter().any(|g| g.level == level)
    }

    /// The earliest grade of the school (nursery / "PS")
    pub fn earliest_grade(&self) -> &Grade {
        &self.grades[0]
    }

    /// Grade feeding into the grade at `index`, if any
    pub fn feeder(&self, index: usize) -> Option<&Grade> {
        index.checked_sub(1).map(|i| &self.grades[i])
    }

    pub fn snapshots(&self) -> &SnapshotBook {
        &self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(code: &str, order: u32) -> Grade {
        Grade::new(code, "primaire", order, false, ClassSizeConfig::new(25, 28, 3))
    }

    #[test]
    fn test_grades_sorted_by_display_order() {
        let school = SchoolData::new(
            vec![grade("CE1", 2), grade("CP", 1), grade("CE2", 3)],
            SnapshotBook::new(),
        )
        .unwrap();
        let codes: Vec<&str> = school.grades().iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["CP", "CE1", "CE2"]);
        assert_eq!(school.earliest_grade().code, "CP");
        assert_eq!(school.feeder(1).unwrap().code, "CP");
        assert!(school.feeder(0).is_none());
    }

    #[test]
    fn test_rejects_invalid_structures() {
        assert!(SchoolData::new(vec![], SnapshotBook::new()).is_err());
        let duplicate_code = vec![grade("CP", 1), grade("CP", 2)];
        assert!(SchoolData::new(duplicate_code, SnapshotBook::new()).is_err());
        let duplicate_order = vec![grade("CP", 1), grade("CE1", 1)];
        assert!(SchoolData::new(duplicate_order, SnapshotBook::new()).is_err());

        let mut bad = grade("CP", 1);
        bad.class_size = ClassSizeConfig::new(30, 25, 2);
        assert!(SchoolData::new(vec![bad], SnapshotBook::new()).is_err());
    }

    #[test]
    fn test_load_sample_school() {
        let school = SchoolData::from_csv().expect("Failed to load sample school");
        assert_eq!(school.earliest_grade().code, "PS");
        assert!(school.earliest_grade().is_entry_point);
        assert!(school.grades().len() >= 12);
        assert!(school.snapshots().latest_actual_year().is_some());
    }
}
