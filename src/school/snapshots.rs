//! In-memory book of enrollment snapshots keyed by (grade, school year)
//!
//! Actual snapshots are write-once. Planned snapshots may be overwritten and are
//! superseded by an actual for the same cell.

use super::data::{EnrollmentSnapshot, SnapshotKind};
use crate::calendar::SchoolYear;
use crate::error::EngineError;
use crate::projection::ProjectionResult;
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotBook {
    entries: BTreeMap<(String, SchoolYear), EnrollmentSnapshot>,
}

impl SnapshotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from a list of snapshots, applying the same rules as `record`
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = EnrollmentSnapshot>,
    ) -> Result<Self, EngineError> {
        let mut book = Self::new();
        for snapshot in snapshots {
            book.record(snapshot)?;
        }
        Ok(book)
    }

    /// Record a snapshot
    ///
    /// Fails if an actual already exists for the cell.
    pub fn record(&mut self, snapshot: EnrollmentSnapshot) -> Result<(), EngineError> {
        snapshot.validate()?;
        let key = (snapshot.grade.clone(), snapshot.school_year);
        if let Some(existing) = self.entries.get(&key) {
            if existing.is_actual() {
                return Err(EngineError::validation(format!(
                    "actual enrollment for {} {} is already recorded and cannot be changed",
                    key.0, key.1
                )));
            }
        }
        self.entries.insert(key, snapshot);
        Ok(())
    }

    pub fn get(&self, grade: &str, school_year: SchoolYear) -> Option<&EnrollmentSnapshot> {
        self.entries.get(&(grade.to_string(), school_year))
    }

    /// Snapshot for the cell only if it is an actual
    pub fn actual(&self, grade: &str, school_year: SchoolYear) -> Option<&EnrollmentSnapshot> {
        self.get(grade, school_year).filter(|s| s.is_actual())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnrollmentSnapshot> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All snapshots recorded for a school year, keyed by grade
    pub fn for_year(&self, school_year: SchoolYear) -> BTreeMap<String, &EnrollmentSnapshot> {
        self.entries
            .iter()
            .filter(|((_, year), _)| *year == school_year)
            .map(|((grade, _), snapshot)| (grade.clone(), snapshot))
            .collect()
    }

    /// Totals for a school year, keyed by grade
    pub fn totals_for_year(&self, school_year: SchoolYear) -> BTreeMap<String, u32> {
        self.for_year(school_year)
            .into_iter()
            .map(|(grade, snapshot)| (grade, snapshot.total))
            .collect()
    }

    /// Most recent school year with at least one actual snapshot
    pub fn latest_actual_year(&self) -> Option<SchoolYear> {
        self.entries
            .values()
            .filter(|s| s.is_actual())
            .map(|s| s.school_year)
            .max()
    }

    /// Store every projected cell as a planned snapshot
    ///
    /// Cells that already hold an actual are left untouched. Returns the number of
    /// planned snapshots written.
    pub fn record_projection(&mut self, result: &ProjectionResult) -> usize {
        let mut written = 0;
        for row in &result.rows {
            let key = (row.grade.clone(), row.school_year);
            if self
                .entries
                .get(&key)
                .is_some_and(|s| s.kind == SnapshotKind::Actual)
            {
                debug!("Keeping actual enrollment for {} {}", key.0, key.1);
                continue;
            }
            let snapshot =
                EnrollmentSnapshot::planned(&row.grade, row.school_year, row.projected_students)
                .with_breakdown(row.retained_students, row.lateral_students);
            self.entries.insert(key, snapshot);
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actual_is_immutable() {
        let year = SchoolYear::new(2024);
        let mut book = SnapshotBook::new();
        book.record(EnrollmentSnapshot::actual("CP", year, 100)).unwrap();

        let err = book
            .record(EnrollmentSnapshot::actual("CP", year, 105))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(book.record(EnrollmentSnapshot::planned("CP", year, 90)).is_err());
        assert_eq!(book.get("CP", year).unwrap().total, 100);
    }

    #[test]
    fn test_planned_can_be_overwritten_and_superseded() {
        let year = SchoolYear::new(2026);
        let mut book = SnapshotBook::new();
        book.record(EnrollmentSnapshot::planned("CP", year, 90)).unwrap();
        book.record(EnrollmentSnapshot::planned("CP", year, 95)).unwrap();
        assert_eq!(book.get("CP", year).unwrap().total, 95);
        assert!(book.actual("CP", year).is_none());

        book.record(EnrollmentSnapshot::actual("CP", year, 97)).unwrap();
        assert_eq!(book.actual("CP", year).unwrap().total, 97);
    }

    #[test]
    fn test_totals_and_latest_actual_year() {
        let book = SnapshotBook::from_snapshots(vec![
            EnrollmentSnapshot::actual("CP", SchoolYear::new(2023), 80),
            EnrollmentSnapshot::actual("CP", SchoolYear::new(2024), 85),
            EnrollmentSnapshot::actual("CE1", SchoolYear::new(2024), 78),
            EnrollmentSnapshot::planned("CP", SchoolYear::new(2025), 90),
        ])
        .unwrap();

        assert_eq!(book.len(), 4);
        assert_eq!(book.latest_actual_year(), Some(SchoolYear::new(2024)));

        let totals = book.totals_for_year(SchoolYear::new(2024));
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["CP"], 85);
        assert_eq!(totals["CE1"], 78);
    }
}
