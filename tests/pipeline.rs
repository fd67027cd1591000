//! End-to-end runs: profile CSV in, schedule CSV out.

mod common;

use std::fs;

use btm_dispatch::config::DispatchConfig;
use btm_dispatch::error::DispatchError;
use btm_dispatch::runner;
use tempfile::TempDir;

fn config_for(dir: &TempDir, load: &[f64], pv: &[f64]) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.profile.input = common::write_profile(dir.path(), load, pv);
    config.profile.output = dir.path().join("results.csv");
    config
}

#[test]
fn writes_one_row_per_period() {
    let dir = TempDir::new().expect("tempdir");
    let (load, pv) = common::half_hourly_day();
    let config = config_for(&dir, &load, &pv);

    let report = runner::run(&config).expect("default site is feasible");

    let csv = fs::read_to_string(&report.output).expect("output written");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), load.len() + 1);
    assert_eq!(lines[0], "Time,AC Battery Power (kW),Meter (kW)");
    assert!(lines[1].starts_with("2024-07-01 00:00:00,"));
    assert!(lines[48].starts_with("2024-07-01 23:30:00,"));

    assert_eq!(report.schedule.len(), 48);
    assert_eq!(report.summary.periods, 48);
    assert!(report.summary.savings() >= -1e-6);
}

#[test]
fn identical_inputs_produce_identical_files() {
    let dir = TempDir::new().expect("tempdir");
    let (load, pv) = common::half_hourly_day();
    let mut config = config_for(&dir, &load, &pv);

    runner::run(&config).expect("first run");
    let first = fs::read(&config.profile.output).expect("first output");

    config.profile.output = dir.path().join("results-2.csv");
    runner::run(&config).expect("second run");
    let second = fs::read(&config.profile.output).expect("second output");

    assert_eq!(first, second);
}

#[test]
fn config_file_drives_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let (load, pv) = common::half_hourly_day();
    let input = common::write_profile(dir.path(), &load, &pv);
    let output = dir.path().join("out.csv");
    let toml = format!(
        r#"
[profile]
input = "{}"
output = "{}"

[battery]
capacity_kwh = 10.0
max_charge_kw = 0.0
max_discharge_kw = 0.0

[tariff]
demand_charge = 0.0
"#,
        input.display(),
        output.display()
    );
    let config = DispatchConfig::from_toml_str(&toml).expect("valid toml");

    let report = runner::run(&config).expect("inert battery is feasible");
    for (t, meter) in report.schedule.meter_kw.iter().enumerate() {
        assert!((meter - (load[t] - pv[t])).abs() < common::TOL);
    }
    assert!(output.exists());
}

#[test]
fn infeasible_terminal_band_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    // No PV and PV-only charging: the battery can never gain energy.
    let load = vec![5.0; 8];
    let pv = vec![0.0; 8];
    let mut config = config_for(&dir, &load, &pv);
    config.battery.terminal_soc = "band".to_string();
    config.battery.final_soc_min = Some(0.5);
    config.battery.final_soc_max = Some(1.0);

    let result = runner::run(&config);

    assert!(
        matches!(result, Err(DispatchError::Infeasible)),
        "expected infeasible, got {result:?}"
    );
    assert!(!config.profile.output.exists());
}

#[test]
fn import_limit_below_load_is_infeasible() {
    let dir = TempDir::new().expect("tempdir");
    let load = vec![30.0; 4];
    let pv = vec![0.0; 4];
    let mut config = config_for(&dir, &load, &pv);
    config.grid.max_import_kw = Some(10.0);

    let result = runner::run(&config);

    assert!(matches!(result, Err(DispatchError::Infeasible)));
    assert!(!config.profile.output.exists());
}

#[test]
fn invalid_config_reports_every_field() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = config_for(&dir, &[1.0, 1.0], &[0.0, 0.0]);
    config.battery.eta_charge = 1.5;
    config.tariff.export_price = 1.0;

    let result = runner::run(&config);

    match result {
        Err(DispatchError::Config(errors)) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"battery.eta_charge"), "fields: {fields:?}");
            assert!(fields.iter().any(|f| f.starts_with("tariff.")), "fields: {fields:?}");
        }
        other => panic!("expected config errors, got {other:?}"),
    }
    assert!(!config.profile.output.exists());
}

#[test]
fn missing_profile_is_input_error() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = DispatchConfig::default();
    config.profile.input = dir.path().join("absent.csv");
    config.profile.output = dir.path().join("results.csv");

    assert!(matches!(runner::run(&config), Err(DispatchError::Input(_))));
    assert!(!config.profile.output.exists());
}
