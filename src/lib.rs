//! Enrollment projection engine for multi-level schools
//!
//! This library provides:
//! - School-year calendar and fiscal-year proration of enrollment
//! - Retention and lateral-entry assumptions with layered overrides and historical defaults
//! - Capacity-aware lateral-entry optimization against class-size limits
//! - Year-by-year cohort projection under worst/base/best demand scenarios

pub mod assumptions;
pub mod calendar;
pub mod error;
pub mod projection;
pub mod proration;
pub mod scenario;
pub mod school;

// Re-export commonly used types
pub use assumptions::{LateralDemand, OverrideSet, ParameterSource, RoundingMode};
pub use calendar::SchoolYear;
pub use error::{EngineError, LoadError};
pub use projection::{
    OptimizationDecision, ProjectionConfig, ProjectionEngine, ProjectionRequest, ProjectionResult,
    ProjectionRow,
};
pub use proration::{
    calculate_fiscal_year_weighted_enrollment, calculate_proration_by_grade,
    get_school_years_for_fiscal_year, GradeProration,
};
pub use scenario::{Scenario, ScenarioRunner};
pub use school::{ClassSizeConfig, EnrollmentSnapshot, Grade, SchoolData};
