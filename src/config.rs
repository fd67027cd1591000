//! TOML-based run configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::tariff::TimeWindow;
use crate::model::types::{BatteryParams, GridLimits, TerminalSoc};

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the reference site: a 53 kWh / 25 kW
/// battery, half-hourly data, and a flat tariff with an evening demand
/// charge. Load from TOML with [`DispatchConfig::from_toml_file`] or use
/// [`DispatchConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Input and output file locations and time handling.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Meter import/export limits.
    #[serde(default)]
    pub grid: GridConfig,
    /// Energy prices and demand charge.
    #[serde(default)]
    pub tariff: TariffConfig,
}

/// Input/output files and time-axis handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Input CSV with `Time`, `Load (kW)`, `PV (kW)` columns.
    pub input: PathBuf,
    /// Output CSV with `Time`, `AC Battery Power (kW)`, `Meter (kW)` columns.
    pub output: PathBuf,
    /// `chrono` format string for the `Time` column.
    pub time_format: String,
    /// Period duration in hours; inferred from the timestamps when unset.
    pub time_step_hours: Option<f64>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/profiles.csv"),
            output: PathBuf::from("data/results.csv"),
            time_format: "%m/%d/%y %H:%M".to_string(),
            time_step_hours: None,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0–1.0].
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
    /// Initial state of charge as a fraction of capacity (0.0–1.0).
    pub initial_soc: f64,
    /// End-of-horizon rule: `"at_least_initial"`, `"free"`, or `"band"`.
    pub terminal_soc: String,
    /// Lower final SoC bound as a fraction, used with `terminal_soc = "band"`.
    pub final_soc_min: Option<f64>,
    /// Upper final SoC bound as a fraction, used with `terminal_soc = "band"`.
    pub final_soc_max: Option<f64>,
    /// Only charge from on-site PV, never from the grid.
    pub charge_from_pv_only: bool,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 53.0,
            max_charge_kw: 25.0,
            max_discharge_kw: 25.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
            initial_soc: 0.0,
            terminal_soc: "at_least_initial".to_string(),
            final_soc_min: None,
            final_soc_max: None,
            charge_from_pv_only: true,
        }
    }
}

impl BatteryConfig {
    /// Terminal rule names accepted by `terminal_soc`.
    pub const TERMINAL_RULES: &[&str] = &["at_least_initial", "free", "band"];

    /// Converts to model parameters for a period of `dt_hours`.
    ///
    /// Fractions are scaled by capacity. Call after [`DispatchConfig::validate`].
    pub fn to_params(&self, dt_hours: f64) -> BatteryParams {
        let terminal_soc = match self.terminal_soc.as_str() {
            "free" => TerminalSoc::Free,
            "band" => TerminalSoc::Band {
                min_kwh: self.final_soc_min.unwrap_or(0.0) * self.capacity_kwh,
                max_kwh: self.final_soc_max.unwrap_or(1.0) * self.capacity_kwh,
            },
            _ => TerminalSoc::AtLeastInitial,
        };
        BatteryParams::new(
            self.capacity_kwh,
            self.max_charge_kw,
            self.max_discharge_kw,
            self.eta_charge,
            self.eta_discharge,
            self.initial_soc * self.capacity_kwh,
            dt_hours,
        )
        .with_terminal_soc(terminal_soc)
        .with_charge_from_pv_only(self.charge_from_pv_only)
    }
}

/// Meter import/export limits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Maximum import power (kW).
    pub max_import_kw: Option<f64>,
    /// Maximum export power (kW, positive magnitude).
    pub max_export_kw: Option<f64>,
}

impl GridConfig {
    pub fn to_limits(&self) -> GridLimits {
        GridLimits {
            max_import_kw: self.max_import_kw,
            max_export_kw: self.max_export_kw,
        }
    }
}

/// A daily `HH:MM` window.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    /// Window start (inclusive).
    pub start: String,
    /// Window end (exclusive).
    pub end: String,
}

/// An import price override for a daily window.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeOfUseConfig {
    /// Window start (inclusive).
    pub start: String,
    /// Window end (exclusive).
    pub end: String,
    /// Import price inside the window (currency/kWh).
    pub import_price: f64,
}

/// Energy prices and demand charge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Flat import price (currency/kWh).
    pub import_price: f64,
    /// Flat export credit (currency/kWh).
    pub export_price: f64,
    /// Demand charge on peak import (currency/kW).
    pub demand_charge: f64,
    /// Periods subject to the demand charge; whole horizon when absent.
    pub demand_window: Option<WindowConfig>,
    /// Import price overrides, first match wins.
    pub time_of_use: Vec<TimeOfUseConfig>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            import_price: 0.10,
            export_price: 0.03,
            demand_charge: 9.0,
            demand_window: Some(WindowConfig {
                start: "17:00".to_string(),
                end: "21:00".to_string(),
            }),
            time_of_use: Vec::new(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.capacity_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl DispatchConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. The initial state
    /// of charge is checked as a fraction here; a directly constructed
    /// [`BatteryParams`] with an impossible initial SoC is left to the solver.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigError {
                field: field.to_string(),
                message,
            });
        };

        let p = &self.profile;
        if p.time_format.trim().is_empty() {
            push("profile.time_format", "must not be empty".into());
        }
        if let Some(dt) = p.time_step_hours {
            if !(dt.is_finite() && dt > 0.0) {
                push("profile.time_step_hours", "must be > 0".into());
            }
        }

        let bat = &self.battery;
        if !(bat.capacity_kwh.is_finite() && bat.capacity_kwh > 0.0) {
            push("battery.capacity_kwh", "must be > 0".into());
        }
        for (field, kw) in [
            ("battery.max_charge_kw", bat.max_charge_kw),
            ("battery.max_discharge_kw", bat.max_discharge_kw),
        ] {
            if !(kw.is_finite() && kw >= 0.0) {
                push(field, "must be >= 0".into());
            }
        }
        for (field, eta) in [
            ("battery.eta_charge", bat.eta_charge),
            ("battery.eta_discharge", bat.eta_discharge),
        ] {
            if !(eta > 0.0 && eta <= 1.0) {
                push(field, "must be in (0.0, 1.0]".into());
            }
        }
        if !(0.0..=1.0).contains(&bat.initial_soc) {
            push("battery.initial_soc", "must be in [0.0, 1.0]".into());
        }
        if !BatteryConfig::TERMINAL_RULES.contains(&bat.terminal_soc.as_str()) {
            push(
                "battery.terminal_soc",
                format!(
                    "must be one of {}, got \"{}\"",
                    BatteryConfig::TERMINAL_RULES.join(", "),
                    bat.terminal_soc
                ),
            );
        }
        for (field, frac) in [
            ("battery.final_soc_min", bat.final_soc_min),
            ("battery.final_soc_max", bat.final_soc_max),
        ] {
            if frac.is_some_and(|f| !(0.0..=1.0).contains(&f)) {
                push(field, "must be in [0.0, 1.0]".into());
            }
        }
        if let (Some(lo), Some(hi)) = (bat.final_soc_min, bat.final_soc_max) {
            if lo > hi {
                push("battery.final_soc_min", "must be <= battery.final_soc_max".into());
            }
        }
        if bat.terminal_soc != "band" && (bat.final_soc_min.is_some() || bat.final_soc_max.is_some())
        {
            push(
                "battery.terminal_soc",
                "final_soc_min/final_soc_max require terminal_soc = \"band\"".into(),
            );
        }

        for (field, kw) in [
            ("grid.max_import_kw", self.grid.max_import_kw),
            ("grid.max_export_kw", self.grid.max_export_kw),
        ] {
            if kw.is_some_and(|kw| !(kw.is_finite() && kw >= 0.0)) {
                push(field, "must be >= 0".into());
            }
        }

        let t = &self.tariff;
        for (field, value) in [
            ("tariff.import_price", t.import_price),
            ("tariff.export_price", t.export_price),
        ] {
            if !value.is_finite() {
                push(field, "must be finite".into());
            }
        }
        if !(t.demand_charge.is_finite() && t.demand_charge >= 0.0) {
            push("tariff.demand_charge", "must be >= 0".into());
        }
        if t.export_price > t.import_price {
            push(
                "tariff.export_price",
                "must not exceed tariff.import_price".into(),
            );
        }
        if let Some(w) = &t.demand_window {
            if let Err(e) = TimeWindow::parse(&w.start, &w.end) {
                push("tariff.demand_window", e);
            }
        }
        for (i, tou) in t.time_of_use.iter().enumerate() {
            if let Err(e) = TimeWindow::parse(&tou.start, &tou.end) {
                push(&format!("tariff.time_of_use[{i}]"), e);
            }
            if !tou.import_price.is_finite() {
                push(
                    &format!("tariff.time_of_use[{i}].import_price"),
                    "must be finite".into(),
                );
            } else if t.export_price > tou.import_price {
                push(
                    &format!("tariff.time_of_use[{i}].import_price"),
                    "must not be below tariff.export_price".into(),
                );
            }
        }

        errors
    }
}
