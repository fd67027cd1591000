//! Meter power balance.

/// Computes net meter power from site load, PV, and battery power.
///
/// Sign convention at the meter:
/// - `load_kw` is positive consumption
/// - `pv_kw` is positive generation
/// - `battery_kw` is positive when discharging, negative when charging
///
/// # Returns
///
/// Net meter power in kW (positive = import, negative = export)
pub fn meter_kw(load_kw: f64, pv_kw: f64, battery_kw: f64) -> f64 {
    load_kw - pv_kw - battery_kw
}

/// Net load without the battery, one entry per period.
pub fn net_load_kw(load_kw: &[f64], pv_kw: &[f64]) -> Vec<f64> {
    load_kw
        .iter()
        .zip(pv_kw)
        .map(|(&load, &pv)| meter_kw(load, pv, 0.0))
        .collect()
}
