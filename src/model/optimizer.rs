//! Linear-programming dispatch optimizer.
//!
//! Builds a single-horizon LP over `T` periods and solves it with the
//! `minilp` simplex backend of `good_lp`. The formulation considers:
//! - Energy balance at the meter (equality, every period)
//! - Charge/discharge power limits and optional PV-only charging
//! - State-of-charge recurrence with per-leg efficiency
//! - Terminal state-of-charge rule
//! - Optional grid import/export limits
//! - Import cost, export credit, and an optional demand charge on peak import

use good_lp::{Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, variable};
use tracing::{debug, info};

use super::cost::CostBreakdown;
use super::types::{BatteryParams, DispatchSchedule, GridLimits, PriceSignal, TerminalSoc};
use crate::error::DispatchError;

/// Battery dispatch optimizer.
///
/// Holds the immutable battery and grid parameters; each call to
/// [`DispatchOptimizer::optimize`] builds and solves a fresh model.
///
/// # Examples
///
/// ```
/// use btm_dispatch::model::optimizer::DispatchOptimizer;
/// use btm_dispatch::model::types::{BatteryParams, GridLimits, PriceSignal};
///
/// let battery = BatteryParams::new(10.0, 5.0, 5.0, 1.0, 1.0, 0.0, 1.0);
/// let optimizer = DispatchOptimizer::new(battery, GridLimits::unlimited());
/// let prices = PriceSignal::energy_only(vec![1.0, 1.0, 1.0]);
/// let schedule = optimizer
///     .optimize(&[10.0, 10.0, 10.0], &[0.0, 5.0, 0.0], &prices)
///     .expect("model is feasible");
/// assert!((schedule.objective - 25.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct DispatchOptimizer {
    battery: BatteryParams,
    grid: GridLimits,
}

impl DispatchOptimizer {
    pub fn new(battery: BatteryParams, grid: GridLimits) -> Self {
        Self { battery, grid }
    }

    pub fn battery(&self) -> &BatteryParams {
        &self.battery
    }

    pub fn grid(&self) -> &GridLimits {
        &self.grid
    }

    /// Solves for the cost-minimizing dispatch.
    ///
    /// # Arguments
    ///
    /// * `load_kw` - Site load per period (kW, >= 0)
    /// * `pv_kw` - PV generation per period (kW, >= 0)
    /// * `prices` - Price signal aligned with the load series
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Input` for malformed inputs, and
    /// `Infeasible`, `Unbounded`, or `Solver` when the solver does not
    /// reach an optimal solution.
    pub fn optimize(
        &self,
        load_kw: &[f64],
        pv_kw: &[f64],
        prices: &PriceSignal,
    ) -> Result<DispatchSchedule, DispatchError> {
        let n = load_kw.len();
        if n == 0 {
            return Err(DispatchError::input("empty horizon: no periods to dispatch"));
        }
        if pv_kw.len() != n {
            return Err(DispatchError::input(format!(
                "load has {n} periods but PV has {}",
                pv_kw.len()
            )));
        }
        check_series("load", load_kw)?;
        check_series("pv", pv_kw)?;
        self.battery.check()?;
        self.check_grid()?;
        prices.check(n)?;

        let b = &self.battery;
        let dt = b.dt_hours;

        let mut vars = ProblemVariables::new();

        // Charge and discharge legs (kW, non-negative)
        let charge: Vec<Variable> = pv_kw
            .iter()
            .map(|&pv| {
                let max_kw = if b.charge_from_pv_only {
                    b.max_charge_kw.min(pv)
                } else {
                    b.max_charge_kw
                };
                vars.add(variable().min(0.0).max(max_kw))
            })
            .collect();
        let discharge = vars.add_vector(variable().min(0.0).max(b.max_discharge_kw), n);

        // Grid import and export (kW, non-negative)
        let mut import_def = variable().min(0.0);
        if let Some(max_kw) = self.grid.max_import_kw {
            import_def = import_def.max(max_kw);
        }
        let mut export_def = variable().min(0.0);
        if let Some(max_kw) = self.grid.max_export_kw {
            export_def = export_def.max(max_kw);
        }
        let import = vars.add_vector(import_def, n);
        let export = vars.add_vector(export_def, n);

        // Stored energy at each period boundary (kWh)
        let soc = vars.add_vector(variable().min(0.0).max(b.capacity_kwh), n + 1);

        let peak = prices
            .has_demand_charge()
            .then(|| vars.add(variable().min(0.0)));

        let mut objective: Expression = (0..n)
            .map(|t| import[t] * (prices.import_price[t] * dt) - export[t] * (prices.export_price[t] * dt))
            .sum();
        if let Some(peak) = peak {
            objective += peak * prices.demand_charge;
        }

        let mut model = vars.minimise(objective).using(good_lp::minilp);
        let mut constraint_count = 1_usize;

        model = model.with(constraint!(soc[0] == b.initial_soc_kwh));

        for t in 0..n {
            let net_kw = load_kw[t] - pv_kw[t];

            // Meter balance: import - export = load - pv - (discharge - charge)
            model = model.with(constraint!(
                import[t] - export[t] == charge[t] - discharge[t] + net_kw
            ));

            model = model.with(constraint!(
                soc[t + 1] == soc[t] + charge[t] * (b.eta_charge * dt) - discharge[t] * (dt / b.eta_discharge)
            ));
            constraint_count += 2;

            if let Some(peak) = peak {
                if prices.demand_window[t] {
                    model = model.with(constraint!(peak >= import[t]));
                    constraint_count += 1;
                }
            }
        }

        match b.terminal_soc {
            TerminalSoc::AtLeastInitial => {
                model = model.with(constraint!(soc[n] >= soc[0]));
                constraint_count += 1;
            }
            TerminalSoc::Band { min_kwh, max_kwh } => {
                model = model.with(constraint!(soc[n] >= min_kwh));
                model = model.with(constraint!(soc[n] <= max_kwh));
                constraint_count += 2;
            }
            TerminalSoc::Free => {}
        }

        debug!(
            periods = n,
            constraints = constraint_count,
            demand_charge = peak.is_some(),
            "dispatch model built"
        );

        let solution = model.solve().map_err(|e| {
            let err = DispatchError::from(e);
            debug!(error = %err, "solve did not reach an optimal solution");
            err
        })?;

        let charge_kw: Vec<f64> = charge.iter().map(|&v| solution.value(v)).collect();
        let discharge_kw: Vec<f64> = discharge.iter().map(|&v| solution.value(v)).collect();
        let import_kw: Vec<f64> = import.iter().map(|&v| solution.value(v)).collect();
        let export_kw: Vec<f64> = export.iter().map(|&v| solution.value(v)).collect();
        let soc_kwh: Vec<f64> = soc.iter().map(|&v| solution.value(v)).collect();

        let battery_kw: Vec<f64> = discharge_kw
            .iter()
            .zip(&charge_kw)
            .map(|(d, c)| d - c)
            .collect();
        let meter_kw: Vec<f64> = import_kw
            .iter()
            .zip(&export_kw)
            .map(|(i, e)| i - e)
            .collect();

        let objective = CostBreakdown::evaluate(prices, &import_kw, &export_kw, dt).total;
        info!(periods = n, objective, "dispatch solved to optimality");

        Ok(DispatchSchedule {
            battery_kw,
            meter_kw,
            charge_kw,
            discharge_kw,
            import_kw,
            export_kw,
            soc_kwh,
            objective,
        })
    }

    fn check_grid(&self) -> Result<(), DispatchError> {
        for (name, limit) in [
            ("max_import_kw", self.grid.max_import_kw),
            ("max_export_kw", self.grid.max_export_kw),
        ] {
            if let Some(kw) = limit {
                if !kw.is_finite() || kw < 0.0 {
                    return Err(DispatchError::input(format!(
                        "grid {name} must be finite and >= 0, got {kw}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_series(name: &str, values: &[f64]) -> Result<(), DispatchError> {
    match values.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(t) => Err(DispatchError::input(format!(
            "{name} at period {t} must be finite and >= 0, got {}",
            values[t]
        ))),
        None => Ok(()),
    }
}
