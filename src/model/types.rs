//! Core model types: battery parameters, grid limits, price signal, and schedule.

use std::fmt;

use crate::error::DispatchError;

/// Constraint applied to the state of charge at the end of the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TerminalSoc {
    /// The battery must end with at least the energy it started with.
    #[default]
    AtLeastInitial,
    /// The final state of charge must fall within `[min_kwh, max_kwh]`.
    Band { min_kwh: f64, max_kwh: f64 },
    /// Only the `[0, capacity]` bound applies.
    Free,
}

/// Physical and operating parameters of the battery.
///
/// # Power Flow Convention (Meter)
/// - Positive battery power: discharging into the site (reduces import)
/// - Negative battery power: charging from the site (increases import)
///
/// Efficiency is applied per leg: energy stored is `eta_charge * charge * dt`
/// and energy removed is `discharge * dt / eta_discharge`, so the round-trip
/// efficiency is `eta_charge * eta_discharge`.
///
/// # Examples
///
/// ```
/// use btm_dispatch::model::types::BatteryParams;
///
/// let battery = BatteryParams::new(10.0, 5.0, 5.0, 0.95, 0.95, 0.0, 1.0);
/// assert!((battery.round_trip_efficiency() - 0.9025).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct BatteryParams {
    /// Usable energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Maximum charging power (kW, positive magnitude).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW, positive magnitude).
    pub max_discharge_kw: f64,
    /// Charging efficiency in `(0, 1]`.
    pub eta_charge: f64,
    /// Discharging efficiency in `(0, 1]`.
    pub eta_discharge: f64,
    /// Stored energy at the start of the horizon (kWh).
    pub initial_soc_kwh: f64,
    /// Duration of one period (hours).
    pub dt_hours: f64,
    /// End-of-horizon state of charge rule.
    pub terminal_soc: TerminalSoc,
    /// Restrict charging power to the PV generation of the same period.
    pub charge_from_pv_only: bool,
}

impl BatteryParams {
    /// Creates battery parameters with the default terminal rule and grid charging allowed.
    ///
    /// No validation happens here; [`BatteryParams::check`] runs at solve time.
    pub fn new(
        capacity_kwh: f64,
        max_charge_kw: f64,
        max_discharge_kw: f64,
        eta_charge: f64,
        eta_discharge: f64,
        initial_soc_kwh: f64,
        dt_hours: f64,
    ) -> Self {
        Self {
            capacity_kwh,
            max_charge_kw,
            max_discharge_kw,
            eta_charge,
            eta_discharge,
            initial_soc_kwh,
            dt_hours,
            terminal_soc: TerminalSoc::default(),
            charge_from_pv_only: false,
        }
    }

    /// Returns a copy with the given terminal rule.
    pub fn with_terminal_soc(mut self, terminal_soc: TerminalSoc) -> Self {
        self.terminal_soc = terminal_soc;
        self
    }

    /// Returns a copy with PV-only charging switched on or off.
    pub fn with_charge_from_pv_only(mut self, enabled: bool) -> Self {
        self.charge_from_pv_only = enabled;
        self
    }

    /// Fraction of charged energy recovered on discharge.
    pub fn round_trip_efficiency(&self) -> f64 {
        self.eta_charge * self.eta_discharge
    }

    /// Rejects parameters that cannot describe a physical battery.
    ///
    /// An initial state of charge outside `[0, capacity]` is
    /// not rejected here: the solver reports it as infeasible.
    pub(crate) fn check(&self) -> Result<(), DispatchError> {
        let finite = [
            ("capacity_kwh", self.capacity_kwh),
            ("max_charge_kw", self.max_charge_kw),
            ("max_discharge_kw", self.max_discharge_kw),
            ("eta_charge", self.eta_charge),
            ("eta_discharge", self.eta_discharge),
            ("initial_soc_kwh", self.initial_soc_kwh),
            ("dt_hours", self.dt_hours),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DispatchError::input(format!("battery {name} must be finite")));
        }
        if self.capacity_kwh < 0.0 {
            return Err(DispatchError::input("battery capacity_kwh must be >= 0"));
        }
        if self.max_charge_kw < 0.0 || self.max_discharge_kw < 0.0 {
            return Err(DispatchError::input("battery power limits must be >= 0"));
        }
        for (name, eta) in [
            ("eta_charge", self.eta_charge),
            ("eta_discharge", self.eta_discharge),
        ] {
            if eta <= 0.0 || eta > 1.0 {
                return Err(DispatchError::input(format!(
                    "battery {name} must be in (0, 1], got {eta}"
                )));
            }
        }
        if self.dt_hours <= 0.0 {
            return Err(DispatchError::input("time step must be > 0 hours"));
        }
        if let TerminalSoc::Band { min_kwh, max_kwh } = self.terminal_soc {
            if !min_kwh.is_finite() || !max_kwh.is_finite() || min_kwh > max_kwh {
                return Err(DispatchError::input(format!(
                    "terminal SoC band [{min_kwh}, {max_kwh}] is not a valid interval"
                )));
            }
        }
        Ok(())
    }
}

/// Optional power limits at the utility meter.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridLimits {
    /// Maximum import power (kW).
    pub max_import_kw: Option<f64>,
    /// Maximum export power (kW, positive magnitude).
    pub max_export_kw: Option<f64>,
}

impl GridLimits {
    /// No limit on either direction.
    pub fn unlimited() -> Self {
        Self::default()
    }
}

/// Per-period prices aligned with the load profile.
#[derive(Debug, Clone)]
pub struct PriceSignal {
    /// Import energy price per period (currency/kWh).
    pub import_price: Vec<f64>,
    /// Export energy credit per period (currency/kWh).
    pub export_price: Vec<f64>,
    /// Demand charge on peak import inside the window (currency/kW).
    pub demand_charge: f64,
    /// Periods whose import counts toward the demand peak.
    pub demand_window: Vec<bool>,
}

impl PriceSignal {
    /// Import-only pricing: no export credit and no demand charge.
    pub fn energy_only(import_price: Vec<f64>) -> Self {
        let n = import_price.len();
        Self {
            import_price,
            export_price: vec![0.0; n],
            demand_charge: 0.0,
            demand_window: vec![false; n],
        }
    }

    /// Flat import and export prices over `periods` steps, no demand charge.
    pub fn flat(periods: usize, import_price: f64, export_price: f64) -> Self {
        Self {
            import_price: vec![import_price; periods],
            export_price: vec![export_price; periods],
            demand_charge: 0.0,
            demand_window: vec![false; periods],
        }
    }

    /// Returns a copy with a demand charge applied over the whole horizon.
    pub fn with_demand_charge(mut self, rate: f64) -> Self {
        self.demand_charge = rate;
        self.demand_window = vec![true; self.import_price.len()];
        self
    }

    /// Number of periods covered.
    pub fn len(&self) -> usize {
        self.import_price.len()
    }

    /// Returns `true` when no periods are covered.
    pub fn is_empty(&self) -> bool {
        self.import_price.is_empty()
    }

    /// Whether a demand charge term enters the objective.
    pub fn has_demand_charge(&self) -> bool {
        self.demand_charge > 0.0 && self.demand_window.iter().any(|&w| w)
    }

    /// Checks lengths, finiteness, and that exporting never pays more than importing.
    ///
    /// The last rule keeps the model a pure LP: with `export > import` price
    /// the solver would import and export in the same period.
    pub(crate) fn check(&self, periods: usize) -> Result<(), DispatchError> {
        if self.import_price.len() != periods
            || self.export_price.len() != periods
            || self.demand_window.len() != periods
        {
            return Err(DispatchError::input(format!(
                "price signal covers {}/{}/{} periods (import/export/window), profile has {periods}",
                self.import_price.len(),
                self.export_price.len(),
                self.demand_window.len()
            )));
        }
        if !self.demand_charge.is_finite() || self.demand_charge < 0.0 {
            return Err(DispatchError::input("demand charge must be finite and >= 0"));
        }
        for (t, (&imp, &exp)) in self.import_price.iter().zip(&self.export_price).enumerate() {
            if !imp.is_finite() || !exp.is_finite() {
                return Err(DispatchError::input(format!("non-finite price at period {t}")));
            }
            if exp > imp {
                return Err(DispatchError::input(format!(
                    "export price {exp} exceeds import price {imp} at period {t}"
                )));
            }
        }
        Ok(())
    }
}

/// Optimal dispatch over the horizon.
///
/// All per-period vectors have one entry per profile row; `soc_kwh` has one
/// more, starting with the initial state of charge.
#[derive(Debug, Clone)]
pub struct DispatchSchedule {
    /// Battery AC power (kW, positive = discharge).
    pub battery_kw: Vec<f64>,
    /// Net meter power (kW, positive = import).
    pub meter_kw: Vec<f64>,
    /// Charging leg of battery power (kW, >= 0).
    pub charge_kw: Vec<f64>,
    /// Discharging leg of battery power (kW, >= 0).
    pub discharge_kw: Vec<f64>,
    /// Grid import (kW, >= 0).
    pub import_kw: Vec<f64>,
    /// Grid export (kW, >= 0).
    pub export_kw: Vec<f64>,
    /// State of charge at each period boundary (kWh).
    pub soc_kwh: Vec<f64>,
    /// Objective value of the optimal solution.
    pub objective: f64,
}

impl DispatchSchedule {
    /// Number of periods in the schedule.
    pub fn len(&self) -> usize {
        self.battery_kw.len()
    }

    /// Returns `true` for an empty schedule.
    pub fn is_empty(&self) -> bool {
        self.battery_kw.is_empty()
    }
}

impl fmt::Display for DispatchSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in 0..self.len() {
            writeln!(
                f,
                "t={t:>3} | battery={:>8.3} kW | meter={:>8.3} kW | soc={:>7.3} kWh",
                self.battery_kw[t],
                self.meter_kw[t],
                self.soc_kwh[t + 1]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery() -> BatteryParams {
        BatteryParams::new(10.0, 5.0, 5.0, 0.95, 0.95, 0.0, 1.0)
    }

    #[test]
    fn valid_battery_passes_check() {
        assert!(battery().check().is_ok());
    }

    #[test]
    fn efficiency_out_of_range_rejected() {
        let mut b = battery();
        b.eta_charge = 1.2;
        assert!(matches!(b.check(), Err(DispatchError::Input(_))));
        b.eta_charge = 0.0;
        assert!(matches!(b.check(), Err(DispatchError::Input(_))));
    }

    #[test]
    fn negative_power_limit_rejected() {
        let mut b = battery();
        b.max_discharge_kw = -1.0;
        assert!(b.check().is_err());
    }

    #[test]
    fn initial_soc_above_capacity_left_to_solver() {
        let mut b = battery();
        b.initial_soc_kwh = 12.0;
        assert!(b.check().is_ok());
    }

    #[test]
    fn inverted_terminal_band_rejected() {
        let b = battery().with_terminal_soc(TerminalSoc::Band {
            min_kwh: 5.0,
            max_kwh: 2.0,
        });
        assert!(b.check().is_err());
    }

    #[test]
    fn price_length_mismatch_rejected() {
        let prices = PriceSignal::flat(3, 0.1, 0.0);
        assert!(prices.check(4).is_err());
        assert!(prices.check(3).is_ok());
    }

    #[test]
    fn export_above_import_rejected() {
        let mut prices = PriceSignal::flat(2, 0.1, 0.05);
        prices.export_price[1] = 0.2;
        let err = prices.check(2);
        assert!(matches!(err, Err(DispatchError::Input(msg)) if msg.contains("period 1")));
    }

    #[test]
    fn demand_charge_flag_requires_window() {
        let mut prices = PriceSignal::flat(2, 0.1, 0.0);
        prices.demand_charge = 5.0;
        assert!(!prices.has_demand_charge());
        let prices = prices.with_demand_charge(5.0);
        assert!(prices.has_demand_charge());
    }
}
