//! Projection engine: cohort accumulation, lateral-entry optimization, results

mod engine;
mod optimizer;
mod results;
mod state;

pub use engine::{
    ProjectionConfig, ProjectionEngine, ProjectionRequest, DEFAULT_HORIZON_YEARS,
    MAX_HORIZON_YEARS,
};
pub use optimizer::{
    LateralEntryOptimizer, OptimizationDecision, OptimizationOutcome, OptimizerInput,
};
pub use results::{ProjectionResult, ProjectionRow, YearSummary};
pub use state::CohortState;
