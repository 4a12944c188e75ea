//! CSV-based override loader
//!
//! `retention_overrides.csv`: `layer,scope,school_year,rate`
//! `lateral_overrides.csv`: `layer,scope,school_year,students,rate`
//!
//! `layer` is one of `global`, `level`, `grade`, `manual`. `scope` names the level or
//! grade (empty for global). `school_year` is required for manual overrides only.
//! Both files are optional; a missing file means no overrides of that kind.

use super::overrides::{LateralDemand, LayeredParameter, OverrideSet};
use crate::calendar::SchoolYear;
use crate::error::LoadError;
use csv::Reader;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

pub const RETENTION_OVERRIDES_FILE: &str = "retention_overrides.csv";
pub const LATERAL_OVERRIDES_FILE: &str = "lateral_overrides.csv";

#[derive(Debug, serde::Deserialize)]
struct RetentionRow {
    layer: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    school_year: String,
    rate: f64,
}

#[derive(Debug, serde::Deserialize)]
struct LateralRow {
    layer: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    school_year: String,
    students: Option<f64>,
    rate: Option<f64>,
}

/// Insert a value into the layer named by a CSV row
fn insert_layer<T: Copy>(
    target: &mut LayeredParameter<T>,
    file: &'static str,
    line: u64,
    layer: &str,
    scope: &str,
    school_year: &str,
    value: T,
) -> Result<(), LoadError> {
    let invalid = |message: String| LoadError::InvalidRecord {
        file,
        line,
        message,
    };
    let scope = scope.trim();
    let require_scope = || {
        if scope.is_empty() {
            Err(invalid(format!("layer '{layer}' requires a scope")))
        } else {
            Ok(scope)
        }
    };

    match layer.trim().to_ascii_lowercase().as_str() {
        "global" => {
            target.set_global(value);
        }
        "level" => {
            target.set_level(require_scope()?, value);
        }
        "grade" => {
            target.set_grade(require_scope()?, value);
        }
        "manual" => {
            let grade = require_scope()?;
            let year: SchoolYear = school_year
                .parse()
                .map_err(|e| invalid(format!("manual override: {e}")))?;
            target.set_manual(grade, year, value);
        }
        other => return Err(invalid(format!("unknown override layer: {other}"))),
    }
    Ok(())
}

/// Load retention overrides from any reader into `target`
pub fn load_retention_from_reader<R: Read>(
    reader: R,
    target: &mut LayeredParameter<f64>,
) -> Result<(), LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: RetentionRow = result?;
        insert_layer(
            target,
            RETENTION_OVERRIDES_FILE,
            idx as u64 + 2,
            &row.layer,
            &row.scope,
            &row.school_year,
            row.rate,
        )?;
    }
    Ok(())
}

/// Load lateral-demand overrides from any reader into `target`
pub fn load_lateral_from_reader<R: Read>(
    reader: R,
    target: &mut LayeredParameter<LateralDemand>,
) -> Result<(), LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: LateralRow = result?;
        let line = idx as u64 + 2;
        let demand = match (row.students, row.rate) {
            (Some(students), None) => LateralDemand::Students(students),
            (None, Some(rate)) => LateralDemand::Rate(rate),
            _ => {
                return Err(LoadError::InvalidRecord {
                    file: LATERAL_OVERRIDES_FILE,
                    line,
                    message: "exactly one of students or rate must be set".to_string(),
                })
            }
        };
        insert_layer(
            target,
            LATERAL_OVERRIDES_FILE,
            line,
            &row.layer,
            &row.scope,
            &row.school_year,
            demand,
        )?;
    }
    Ok(())
}

/// Open an optional file; `Ok(None)` when it does not exist
fn open_optional(path: &Path) -> Result<Option<File>, LoadError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LoadError::io(path, e)),
    }
}

/// Load both override files from a data directory
pub fn load_overrides(dir: &Path) -> Result<OverrideSet, LoadError> {
    let mut overrides = OverrideSet::new();

    if let Some(file) = open_optional(&dir.join(RETENTION_OVERRIDES_FILE))? {
        load_retention_from_reader(file, &mut overrides.retention)?;
    }
    if let Some(file) = open_optional(&dir.join(LATERAL_OVERRIDES_FILE))? {
        load_lateral_from_reader(file, &mut overrides.lateral)?;
    }

    Ok(overrides)
}
