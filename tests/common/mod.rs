//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use btm_dispatch::model::{BatteryParams, DispatchSchedule, TerminalSoc};

/// Numerical tolerance for solver output.
pub const TOL: f64 = 1e-6;

/// Default test battery (10 kWh, 5 kW both ways, 95% per leg, empty, 1h steps).
pub fn default_battery() -> BatteryParams {
    BatteryParams::new(10.0, 5.0, 5.0, 0.95, 0.95, 0.0, 1.0)
}

/// Lossless battery with the given initial energy and 1h steps.
pub fn ideal_battery(initial_soc_kwh: f64) -> BatteryParams {
    BatteryParams::new(10.0, 5.0, 5.0, 1.0, 1.0, initial_soc_kwh, 1.0)
}

/// Writes a profile CSV with half-hourly timestamps starting at midnight.
///
/// Returns the path of the written file.
pub fn write_profile(dir: &Path, load_kw: &[f64], pv_kw: &[f64]) -> PathBuf {
    let mut csv = String::from("Time,Load (kW),PV (kW)\n");
    for (i, (load, pv)) in load_kw.iter().zip(pv_kw).enumerate() {
        let minutes = i * 30;
        let _ = writeln!(
            csv,
            "07/01/24 {:02}:{:02},{load},{pv}",
            minutes / 60,
            minutes % 60
        );
    }
    let path = dir.join("profiles.csv");
    fs::write(&path, csv).expect("write profile fixture");
    path
}

/// A day of half-hourly load with an evening peak, and a midday PV bell.
///
/// Returns `(load_kw, pv_kw)`, 48 entries each.
pub fn half_hourly_day() -> (Vec<f64>, Vec<f64>) {
    let load = (0..48)
        .map(|i| {
            let hour = i as f64 / 2.0;
            if (17.0..21.0).contains(&hour) { 18.0 } else { 8.0 }
        })
        .collect();
    let pv = (0..48)
        .map(|i| {
            let hour = i as f64 / 2.0;
            if (7.0..19.0).contains(&hour) {
                let x = (hour - 13.0) / 6.0;
                (20.0 * (1.0 - x * x)).max(0.0)
            } else {
                0.0
            }
        })
        .collect();
    (load, pv)
}

/// Asserts every physical invariant of a solved schedule.
pub fn assert_schedule_feasible(
    load_kw: &[f64],
    pv_kw: &[f64],
    battery: &BatteryParams,
    schedule: &DispatchSchedule,
) {
    let n = load_kw.len();
    assert_eq!(schedule.len(), n);
    assert_eq!(schedule.soc_kwh.len(), n + 1);
    assert!(
        (schedule.soc_kwh[0] - battery.initial_soc_kwh).abs() < TOL,
        "soc[0]={} expected {}",
        schedule.soc_kwh[0],
        battery.initial_soc_kwh
    );

    for t in 0..n {
        let expected_meter = load_kw[t] - pv_kw[t] - schedule.battery_kw[t];
        assert!(
            (schedule.meter_kw[t] - expected_meter).abs() < TOL,
            "balance violated at t={t}: meter={}, load-pv-battery={expected_meter}",
            schedule.meter_kw[t]
        );
        assert!(
            schedule.battery_kw[t] >= -battery.max_charge_kw - TOL
                && schedule.battery_kw[t] <= battery.max_discharge_kw + TOL,
            "battery power {} out of limits at t={t}",
            schedule.battery_kw[t]
        );
        let expected_soc = schedule.soc_kwh[t]
            + battery.eta_charge * schedule.charge_kw[t] * battery.dt_hours
            - schedule.discharge_kw[t] * battery.dt_hours / battery.eta_discharge;
        assert!(
            (schedule.soc_kwh[t + 1] - expected_soc).abs() < TOL,
            "soc recurrence violated at t={t}"
        );
        if battery.charge_from_pv_only {
            assert!(schedule.charge_kw[t] <= pv_kw[t] + TOL, "grid charging at t={t}");
        }
    }

    for (t, soc) in schedule.soc_kwh.iter().enumerate() {
        assert!(
            *soc >= -TOL && *soc <= battery.capacity_kwh + TOL,
            "soc {soc} out of [0, {}] at boundary {t}",
            battery.capacity_kwh
        );
    }

    let final_soc = schedule.soc_kwh[n];
    match battery.terminal_soc {
        TerminalSoc::AtLeastInitial => assert!(final_soc >= battery.initial_soc_kwh - TOL),
        TerminalSoc::Band { min_kwh, max_kwh } => {
            assert!(final_soc >= min_kwh - TOL && final_soc <= max_kwh + TOL)
        }
        TerminalSoc::Free => {}
    }
}
