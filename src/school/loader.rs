//! Load grades and enrollment snapshots from CSV
//!
//! `grades.csv`:
//! `code,name,level,display_order,entry_point,target_class_size,max_class_size,max_divisions`
//!
//! `enrollment.csv`:
//! `grade,school_year,kind,total,retained,lateral` (retained/lateral may be empty)

use super::data::{ClassSizeConfig, EnrollmentSnapshot, Grade, SnapshotKind};
use crate::calendar::SchoolYear;
use crate::error::LoadError;
use csv::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const GRADES_FILE: &str = "grades.csv";
pub const ENROLLMENT_FILE: &str = "enrollment.csv";

/// Raw CSV row matching grades.csv columns
#[derive(Debug, serde::Deserialize)]
struct GradeRow {
    code: String,
    #[serde(default)]
    name: String,
    level: String,
    display_order: u32,
    entry_point: String,
    target_class_size: u32,
    max_class_size: u32,
    max_divisions: u32,
}

impl GradeRow {
    fn into_grade(self, line: u64) -> Result<Grade, LoadError> {
        let is_entry_point = match self.entry_point.trim() {
            "Y" | "y" | "true" | "1" => true,
            "N" | "n" | "false" | "0" | "" => false,
            other => {
                return Err(LoadError::InvalidRecord {
                    file: GRADES_FILE,
                    line,
                    message: format!("unknown entry_point flag: {other}"),
                })
            }
        };

        let name = if self.name.trim().is_empty() {
            self.code.clone()
        } else {
            self.name
        };

        Ok(Grade {
            code: self.code,
            name,
            level: self.level,
            display_order: self.display_order,
            is_entry_point,
            class_size: ClassSizeConfig::new(
                self.target_class_size,
                self.max_class_size,
                self.max_divisions,
            ),
        })
    }
}

/// Raw CSV row matching enrollment.csv columns
#[derive(Debug, serde::Deserialize)]
struct EnrollmentRow {
    grade: String,
    school_year: String,
    kind: String,
    total: u32,
    retained: Option<u32>,
    lateral: Option<u32>,
}

impl EnrollmentRow {
    fn into_snapshot(self, line: u64) -> Result<EnrollmentSnapshot, LoadError> {
        let invalid = |message: String| LoadError::InvalidRecord {
            file: ENROLLMENT_FILE,
            line,
            message,
        };

        let school_year: SchoolYear = self
            .school_year
            .parse()
            .map_err(|e| invalid(format!("{e}")))?;

        let kind = match self.kind.trim().to_ascii_lowercase().as_str() {
            "actual" => SnapshotKind::Actual,
            "planned" => SnapshotKind::Planned,
            other => return Err(invalid(format!("unknown snapshot kind: {other}"))),
        };

        Ok(EnrollmentSnapshot {
            grade: self.grade,
            school_year,
            kind,
            total: self.total,
            retained: self.retained,
            lateral: self.lateral,
        })
    }
}

/// Load grades from any reader, in file order
pub fn load_grades_from_reader<R: Read>(reader: R) -> Result<Vec<Grade>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut grades = Vec::new();

    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: GradeRow = result?;
        grades.push(row.into_grade(idx as u64 + 2)?);
    }

    Ok(grades)
}

/// Load enrollment snapshots from any reader
pub fn load_enrollment_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<EnrollmentSnapshot>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut snapshots = Vec::new();

    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: EnrollmentRow = result?;
        snapshots.push(row.into_snapshot(idx as u64 + 2)?);
    }

    Ok(snapshots)
}

/// Load `grades.csv` from a data directory
pub fn load_grades(dir: &Path) -> Result<Vec<Grade>, LoadError> {
    let path = dir.join(GRADES_FILE);
    let file = File::open(&path).map_err(|e| LoadError::io(&path, e))?;
    load_grades_from_reader(file)
}

/// Load `enrollment.csv` from a data directory
pub fn load_enrollment(dir: &Path) -> Result<Vec<EnrollmentSnapshot>, LoadError> {
    let path = dir.join(ENROLLMENT_FILE);
    let file = File::open(&path).map_err(|e| LoadError::io(&path, e))?;
    load_enrollment_from_reader(file)
}
