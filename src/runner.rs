//! End-to-end pipeline: load profile, build tariff, solve, write schedule.

use std::path::PathBuf;

use tracing::info;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::io::export::export_csv;
use crate::io::profile::{LoadProfile, read_profile};
use crate::model::cost::DispatchSummary;
use crate::model::optimizer::DispatchOptimizer;
use crate::model::tariff::build_price_signal;
use crate::model::types::DispatchSchedule;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Profile the schedule was computed for.
    pub profile: LoadProfile,
    /// Optimal schedule.
    pub schedule: DispatchSchedule,
    /// Cost and KPI summary.
    pub summary: DispatchSummary,
    /// File the schedule was written to.
    pub output: PathBuf,
}

/// Runs the full pipeline for a configuration.
///
/// The output file is only created after the solver returns an optimal
/// schedule; every failure before that leaves the filesystem untouched.
///
/// # Errors
///
/// Returns `DispatchError::Config` if validation fails, and otherwise the
/// first input, solver, or output error encountered.
pub fn run(config: &DispatchConfig) -> Result<RunReport, DispatchError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(DispatchError::Config(errors));
    }

    let profile = read_profile(&config.profile.input, &config.profile.time_format)?;
    let dt_hours = profile.time_step_hours(config.profile.time_step_hours)?;
    info!(
        input = %config.profile.input.display(),
        periods = profile.len(),
        dt_hours,
        "profile loaded"
    );

    let prices = build_price_signal(&config.tariff, &profile.timestamps)?;
    let battery = config.battery.to_params(dt_hours);
    let optimizer = DispatchOptimizer::new(battery, config.grid.to_limits());

    let schedule = optimizer.optimize(&profile.load_kw, &profile.pv_kw, &prices)?;
    let summary = DispatchSummary::from_schedule(
        &profile.load_kw,
        &profile.pv_kw,
        &prices,
        optimizer.battery(),
        &schedule,
    );

    let output = config.profile.output.clone();
    export_csv(&profile.timestamps, &schedule, &output)?;
    info!(output = %output.display(), rows = schedule.len(), "schedule written");

    Ok(RunReport {
        profile,
        schedule,
        summary,
        output,
    })
}
