//! CSV export of the optimized schedule.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::DispatchError;
use crate::model::types::DispatchSchedule;

/// Output column header.
pub const HEADER: [&str; 3] = ["Time", "AC Battery Power (kW)", "Meter (kW)"];

/// Timestamp format of the `Time` column.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exports the schedule to a CSV file at the given path.
///
/// Writes a header row followed by one data row per period. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `timestamps` - Period start times, one per schedule entry
/// * `schedule` - Optimal schedule
/// * `path` - Output file path
///
/// # Errors
///
/// Returns `DispatchError::Input` if the lengths disagree and
/// `DispatchError::Output` if file creation or writing fails.
pub fn export_csv(
    timestamps: &[NaiveDateTime],
    schedule: &DispatchSchedule,
    path: &Path,
) -> Result<(), DispatchError> {
    if timestamps.len() != schedule.len() {
        return Err(DispatchError::input(format!(
            "{} timestamps for a {}-period schedule",
            timestamps.len(),
            schedule.len()
        )));
    }
    let output_err = |source: csv::Error| DispatchError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| output_err(e.into()))?;
    write_csv(timestamps, schedule, io::BufWriter::new(file)).map_err(output_err)
}

/// Writes the schedule as CSV to any writer.
///
/// Powers are rounded to 3 decimals; negative zero is written as `0.000`.
///
/// # Errors
///
/// Returns a `csv::Error` if writing fails.
pub fn write_csv(
    timestamps: &[NaiveDateTime],
    schedule: &DispatchSchedule,
    writer: impl Write,
) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER)?;

    for ((ts, battery), meter) in timestamps
        .iter()
        .zip(&schedule.battery_kw)
        .zip(&schedule.meter_kw)
    {
        wtr.write_record(&[
            ts.format(TIME_FORMAT).to_string(),
            format_kw(*battery),
            format_kw(*meter),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn format_kw(kw: f64) -> String {
    let rounded = (kw * 1000.0).round() / 1000.0;
    // Avoid "-0.000" for solver noise around zero.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.3}")
}
