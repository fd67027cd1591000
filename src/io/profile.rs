//! CSV import of the load and PV profile.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::DispatchError;

/// Timestamp formats tried after the configured one.
const FALLBACK_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Load (kW)")]
    load_kw: f64,
    #[serde(rename = "PV (kW)")]
    pv_kw: f64,
}

/// Site load and PV generation over the horizon, one entry per period.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    /// Period start times, strictly increasing.
    pub timestamps: Vec<NaiveDateTime>,
    /// Site load (kW, >= 0).
    pub load_kw: Vec<f64>,
    /// PV generation (kW, >= 0).
    pub pv_kw: Vec<f64>,
}

impl LoadProfile {
    /// Number of periods.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` when the profile has no periods.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Resolves the period duration in hours.
    ///
    /// An explicit value wins; otherwise the spacing of the timestamps is
    /// used and must be uniform.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Input` when the spacing is irregular, or the
    /// profile has a single row and no explicit value is given.
    pub fn time_step_hours(&self, explicit: Option<f64>) -> Result<f64, DispatchError> {
        if let Some(dt) = explicit {
            return Ok(dt);
        }
        let mut steps = self
            .timestamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_seconds());
        let first = steps.next().ok_or_else(|| {
            DispatchError::input(
                "cannot infer the time step from a single-row profile; set profile.time_step_hours",
            )
        })?;
        if let Some(pos) = steps.position(|s| s != first) {
            return Err(DispatchError::input(format!(
                "irregular time step at row {}: expected {first} s spacing; set profile.time_step_hours",
                pos + 2
            )));
        }
        Ok(first as f64 / 3600.0)
    }
}

/// Reads a profile CSV from disk.
///
/// # Errors
///
/// Returns `DispatchError::Input` if the file cannot be opened or its
/// content is invalid (see [`read_profile_from`]).
pub fn read_profile(path: &Path, time_format: &str) -> Result<LoadProfile, DispatchError> {
    let file = File::open(path).map_err(|e| {
        DispatchError::input(format!("cannot open \"{}\": {e}", path.display()))
    })?;
    read_profile_from(file, time_format)
}

/// Reads a profile CSV from any reader.
///
/// Requires `Time`, `Load (kW)`, and `PV (kW)` columns; other columns are
/// ignored. Rows must be in time order.
///
/// # Errors
///
/// Returns `DispatchError::Input` for missing columns, unparseable values,
/// negative or non-finite powers, non-increasing timestamps, or an empty file.
pub fn read_profile_from(reader: impl Read, time_format: &str) -> Result<LoadProfile, DispatchError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut profile = LoadProfile {
        timestamps: Vec::new(),
        load_kw: Vec::new(),
        pv_kw: Vec::new(),
    };

    for (i, record) in rdr.deserialize::<ProfileRow>().enumerate() {
        // Row 1 is the header.
        let line = i + 2;
        let row = record.map_err(|e| DispatchError::input(format!("row {line}: {e}")))?;
        let ts = parse_timestamp(&row.time, time_format).ok_or_else(|| {
            DispatchError::input(format!(
                "row {line}: cannot parse time \"{}\" with format \"{time_format}\"",
                row.time
            ))
        })?;
        for (column, value) in [("Load (kW)", row.load_kw), ("PV (kW)", row.pv_kw)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DispatchError::input(format!(
                    "row {line}: {column} must be finite and >= 0, got {value}"
                )));
            }
        }
        if profile.timestamps.last().is_some_and(|prev| ts <= *prev) {
            return Err(DispatchError::input(format!(
                "row {line}: time {ts} is not after the previous row"
            )));
        }
        profile.timestamps.push(ts);
        profile.load_kw.push(row.load_kw);
        profile.pv_kw.push(row.pv_kw);
    }

    if profile.is_empty() {
        return Err(DispatchError::input("profile has no data rows"));
    }
    Ok(profile)
}

fn parse_timestamp(value: &str, time_format: &str) -> Option<NaiveDateTime> {
    std::iter::once(time_format)
        .chain(FALLBACK_TIME_FORMATS.iter().copied())
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
