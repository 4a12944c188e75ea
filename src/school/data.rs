//! Grade, class-size and enrollment snapshot structures

use crate::calendar::SchoolYear;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Class-size and division limits for one grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSizeConfig {
    /// Comfortable class size the school plans for
    pub target_class_size: u32,

    /// Hard maximum students per division
    pub max_class_size: u32,

    /// Maximum number of divisions (sections) the grade may run
    pub max_divisions: u32,
}

impl ClassSizeConfig {
    pub fn new(target_class_size: u32, max_class_size: u32, max_divisions: u32) -> Self {
        Self {
            target_class_size,
            max_class_size,
            max_divisions,
        }
    }

    /// Check `1 <= target <= max`, `max_divisions >= 1` and that the grade's ceiling
    /// capacity fits in a `u32`
    pub fn validate(&self, grade: &str) -> Result<(), EngineError> {
        if self.target_class_size == 0 {
            return Err(EngineError::validation(format!(
                "grade {grade}: target_class_size must be at least 1"
            )));
        }
        if self.target_class_size > self.max_class_size {
            return Err(EngineError::validation(format!(
                "grade {grade}: target_class_size {} exceeds max_class_size {}",
                self.target_class_size, self.max_class_size
            )));
        }
        if self.max_divisions < 1 {
            return Err(EngineError::validation(format!(
                "grade {grade}: max_divisions must be at least 1"
            )));
        }
        if self.max_divisions.checked_mul(self.max_class_size).is_none() {
            return Err(EngineError::validation(format!(
                "grade {grade}: {} divisions of {} students overflows the capacity range",
                self.max_divisions, self.max_class_size
            )));
        }
        Ok(())
    }

    /// Largest number of students the grade can ever hold
    pub fn ceiling_capacity(&self) -> u32 {
        self.max_divisions.saturating_mul(self.max_class_size)
    }

    /// Divisions needed to seat `students` at max class size, at least 1 and at most
    /// `max_divisions`
    pub fn divisions_for(&self, students: u32) -> u32 {
        students
            .div_ceil(self.max_class_size.max(1))
            .clamp(1, self.max_divisions.max(1))
    }
}

/// An ordered, school-specific academic grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    /// Short code, e.g. "PS", "CP", "6EME"
    pub code: String,

    /// Display name
    pub name: String,

    /// Academic level code used for level-wide defaults, e.g. "maternelle"
    pub level: String,

    /// Position in the academic sequence (ascending)
    pub display_order: u32,

    /// First grade of a cycle: no retained population, all intake is lateral
    pub is_entry_point: bool,

    pub class_size: ClassSizeConfig,
}

impl Grade {
    pub fn new(
        code: &str,
        level: &str,
        display_order: u32,
        is_entry_point: bool,
        class_size: ClassSizeConfig,
    ) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            level: level.to_string(),
            display_order,
            is_entry_point,
            class_size,
        }
    }
}

/// Whether a snapshot is a recorded actual or a planned figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Actual,
    Planned,
}

/// Student count for one (grade, school year) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub grade: String,
    pub school_year: SchoolYear,
    pub kind: SnapshotKind,
    pub total: u32,

    /// Students continuing from the grade below, when the breakdown is known
    #[serde(default)]
    pub retained: Option<u32>,

    /// New entrants, when the breakdown is known
    #[serde(default)]
    pub lateral: Option<u32>,
}

impl EnrollmentSnapshot {
    pub fn actual(grade: &str, school_year: SchoolYear, total: u32) -> Self {
        Self {
            grade: grade.to_string(),
            school_year,
            kind: SnapshotKind::Actual,
            total,
            retained: None,
            lateral: None,
        }
    }

    pub fn planned(grade: &str, school_year: SchoolYear, total: u32) -> Self {
        Self {
            kind: SnapshotKind::Planned,
            ..Self::actual(grade, school_year, total)
        }
    }

    /// Attach a retained/lateral breakdown
    pub fn with_breakdown(mut self, retained: u32, lateral: u32) -> Self {
        self.retained = Some(retained);
        self.lateral = Some(lateral);
        self
    }

    pub fn is_actual(&self) -> bool {
        self.kind == SnapshotKind::Actual
    }

    /// Retained count, derived from `total - lateral` when only lateral is known
    pub fn retained_count(&self) -> Option<u32> {
        self.retained
            .or_else(|| self.lateral.map(|l| self.total.saturating_sub(l)))
    }

    /// Lateral count, derived from `total - retained` when only retained is known
    pub fn lateral_count(&self) -> Option<u32> {
        self.lateral
            .or_else(|| self.retained.map(|r| self.total.saturating_sub(r)))
    }

    /// A breakdown must not exceed the total
    pub fn validate(&self) -> Result<(), EngineError> {
        let retained = self.retained.unwrap_or(0);
        let lateral = self.lateral.unwrap_or(0);
        match retained.checked_add(lateral) {
            Some(sum) if sum <= self.total => Ok(()),
            _ => Err(EngineError::validation(format!(
                "snapshot {} {}: retained {} + lateral {} exceeds total {}",
                self.grade, self.school_year, retained, lateral, self.total
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_size_validation() {
        assert!(ClassSizeConfig::new(25, 28, 3).validate("CP").is_ok());
        assert!(ClassSizeConfig::new(28, 28, 1).validate("CP").is_ok());

        let err = ClassSizeConfig::new(30, 28, 3).validate("CP").unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("exceeds")));

        assert!(ClassSizeConfig::new(25, 28, 0).validate("CP").is_err());
        assert!(ClassSizeConfig::new(0, 28, 2).validate("CP").is_err());
    }

    #[test]
    fn test_capacity_overflow_is_a_validation_error() {
        let err = ClassSizeConfig::new(70_000, 70_000, 70_000)
            .validate("CP")
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("overflows")));
        assert!(ClassSizeConfig::new(30, 40_000, 100_000).validate("CP").is_ok());
        assert_eq!(ClassSizeConfig::new(1, u32::MAX, 2).ceiling_capacity(), u32::MAX);
    }

    #[test]
    fn test_oversized_breakdown_is_rejected_without_overflow() {
        let snapshot = EnrollmentSnapshot::actual("CP", SchoolYear::new(2025), u32::MAX)
            .with_breakdown(u32::MAX, 1);
        assert!(matches!(snapshot.validate(), Err(EngineError::Validation(_))));

        let snapshot = EnrollmentSnapshot::actual("CP", SchoolYear::new(2025), 100)
            .with_breakdown(70, 30);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_divisions_for() {
        let config = ClassSizeConfig::new(25, 28, 4);
        assert_eq!(config.divisions_for(0), 1);
        assert_eq!(config.divisions_for(28), 1);
        assert_eq!(config.divisions_for(29), 2);
        assert_eq!(config.divisions_for(84), 3);
        assert_eq!(config.divisions_for(500), 4);
        assert_eq!(config.ceiling_capacity(), 112);
    }

    #[test]
    fn test_snapshot_breakdown_derivation() {
        let year = SchoolYear::new(2024);
        let mut snap = EnrollmentSnapshot::actual("CE1", year, 100);
        assert_eq!(snap.retained_count(), None);
        assert_eq!(snap.lateral_count(), None);

        snap.lateral = Some(8);
        assert_eq!(snap.retained_count(), Some(92));
        assert_eq!(snap.lateral_count(), Some(8));

        let snap = EnrollmentSnapshot::planned("CE1", year, 100).with_breakdown(90, 10);
        assert!(!snap.is_actual());
        assert_eq!(snap.retained_count(), Some(90));
    }

    #[test]
    fn test_snapshot_breakdown_cannot_exceed_total() {
        let snap =
            EnrollmentSnapshot::actual("CE1", SchoolYear::new(2024), 50).with_breakdown(45, 10);
        assert!(snap.validate().is_err());
    }
}
