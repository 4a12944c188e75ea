//! Enrollment projection CLI
//!
//! Loads a school's data directory, runs the projection engine and prints or
//! writes the results.

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand};
use enrollment_projection::assumptions::loader::load_overrides;
use enrollment_projection::proration::total_weighted_enrollment;
use enrollment_projection::school::DEFAULT_DATA_PATH;
use enrollment_projection::{
    OverrideSet, ProjectionConfig, ProjectionResult, ProjectionRow, Scenario, ScenarioRunner,
    SchoolData,
};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "enrollment-projection")]
#[command(about = "Capacity-aware school enrollment projections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project enrollment over the configured horizon
    Project(ProjectArgs),
    /// Prorate the base school year and the first projected year into a fiscal year
    Prorate(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory holding grades.csv, enrollment.csv and optional override files
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Fiscal year to project from (defaults to the current calendar year)
    #[arg(short, long)]
    fiscal_year: Option<i32>,

    /// JSON projection config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ProjectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Demand scenario: worst, base or best
    #[arg(short, long, default_value = "base", conflicts_with = "all_scenarios")]
    scenario: Scenario,

    /// Run worst, base and best in parallel
    #[arg(long)]
    all_scenarios: bool,

    /// Write rows to this file (CSV unless --json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit full results as JSON
    #[arg(long)]
    json: bool,
}

/// Flat CSV record for one projected row
#[derive(Serialize)]
struct CsvRow<'a> {
    scenario: &'static str,
    grade: &'a str,
    school_year: String,
    retained_students: u32,
    lateral_students: u32,
    projected_students: u32,
    lateral_demand: u32,
    rejected_students: u32,
    decision: &'static str,
    divisions_used: u32,
    retention_rate: Option<f64>,
    retention_source: Option<&'static str>,
    lateral_parameter: String,
    lateral_source: &'static str,
}

impl<'a> CsvRow<'a> {
    fn new(scenario: Scenario, row: &'a ProjectionRow) -> Self {
        Self {
            scenario: scenario.as_str(),
            grade: &row.grade,
            school_year: row.school_year.to_string(),
            retained_students: row.retained_students,
            lateral_students: row.lateral_students,
            projected_students: row.projected_students,
            lateral_demand: row.lateral_demand,
            rejected_students: row.rejected_students,
            decision: row.decision.as_str(),
            divisions_used: row.divisions_used,
            retention_rate: row.retention_rate,
            retention_source: row.retention_source.map(|s| s.as_str()),
            lateral_parameter: row.lateral_parameter.to_string(),
            lateral_source: row.lateral_source.as_str(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Project(args) => run_project(args),
        Command::Prorate(args) => run_prorate(args),
    }
}

/// Load config, school data and overrides for a run
fn load(common: &CommonArgs) -> Result<(ScenarioRunner, OverrideSet, i32)> {
    let config = match &common.config {
        Some(path) => ProjectionConfig::from_json_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProjectionConfig::default(),
    };
    let school = SchoolData::from_csv_path(&common.data)
        .with_context(|| format!("Failed to load school data from {}", common.data.display()))?;
    let overrides = load_overrides(&common.data)
        .with_context(|| format!("Failed to load overrides from {}", common.data.display()))?;
    let fiscal_year = common.fiscal_year.unwrap_or_else(|| Local::now().year());

    Ok((ScenarioRunner::new(school, config), overrides, fiscal_year))
}

fn run_project(args: ProjectArgs) -> Result<()> {
    let (runner, overrides, fiscal_year) = load(&args.common)?;

    let results = if args.all_scenarios {
        runner.run_all(fiscal_year, &overrides)?
    } else {
        vec![runner.run(fiscal_year, args.scenario, &overrides)?]
    };

    if args.json {
        match &args.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(file, &results)?;
                println!("Wrote {} projections to {}", results.len(), path.display());
            }
            None => {
                serde_json::to_writer_pretty(io::stdout().lock(), &results)?;
                println!();
            }
        }
        return Ok(());
    }

    for result in &results {
        print_summary(result);
    }

    if let Some(path) = &args.output {
        let rows = write_csv(path, &results)?;
        println!("Wrote {} rows to {}", rows, path.display());
    }

    Ok(())
}

fn run_prorate(args: CommonArgs) -> Result<()> {
    let (runner, overrides, fiscal_year) = load(&args)?;
    let result = runner.run(fiscal_year, Scenario::Base, &overrides)?;

    let prorations = result
        .fiscal_year_proration(fiscal_year)
        .with_context(|| format!("No enrollment available to prorate FY{fiscal_year}"))?;

    let (prev, curr) = enrollment_projection::get_school_years_for_fiscal_year(fiscal_year);
    println!("FY{fiscal_year} proration (8/12 of {prev}, 4/12 of {curr})");
    println!("{:<8} {:>10} {:>10} {:>10}", "Grade", prev, curr, "Weighted");

    // keep the school's grade order rather than the map's alphabetical order
    for grade in runner.engine().school().grades() {
        if let Some(p) = prorations.get(&grade.code) {
            println!(
                "{:<8} {:>10} {:>10} {:>10.1}",
                grade.code, p.prev_enrollment, p.curr_enrollment, p.weighted_enrollment
            );
        }
    }
    println!("{:<8} {:>32.1}", "Total", total_weighted_enrollment(&prorations));

    Ok(())
}

fn print_summary(result: &ProjectionResult) {
    println!(
        "\nFY{} - {} scenario (base {})",
        result.fiscal_year, result.scenario, result.base_school_year
    );
    println!(
        "{:<10} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10}",
        "Year", "Retained", "Lateral", "Total", "Rejected", "Classes", "Restricted"
    );
    for year in result.summary() {
        println!(
            "{:<10} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10}",
            year.school_year.to_string(),
            year.retained_students,
            year.lateral_students,
            year.projected_students,
            year.rejected_students,
            year.divisions_used,
            year.restricted_grades
        );
    }

    let alerts = result.ceiling_alerts();
    if !alerts.is_empty() {
        println!("Grades at their division ceiling:");
        for row in alerts {
            println!(
                "  {} {}: {} of {} applicants turned away",
                row.grade, row.school_year, row.rejected_students, row.lateral_demand
            );
        }
    }
}

fn write_csv(path: &Path, results: &[ProjectionResult]) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    let mut count = 0;
    for result in results {
        for row in &result.rows {
            writer.serialize(CsvRow::new(result.scenario, row))?;
            count += 1;
        }
    }
    writer.flush()?;
    Ok(count)
}
