//! Post-hoc cost and KPI computation from a dispatch schedule.

use std::fmt;

use super::balance::net_load_kw;
use super::types::{BatteryParams, DispatchSchedule, PriceSignal};

/// Electricity bill components for one horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    /// Import energy cost (currency).
    pub energy_cost: f64,
    /// Export credit (currency, positive = revenue).
    pub export_revenue: f64,
    /// Demand charge on the peak import inside the demand window (currency).
    pub demand_cost: f64,
    /// Peak import inside the demand window (kW).
    pub billed_peak_kw: f64,
    /// `energy_cost - export_revenue + demand_cost`.
    pub total: f64,
}

impl CostBreakdown {
    /// Prices the given import/export flows.
    ///
    /// # Arguments
    ///
    /// * `prices` - Price signal aligned with the flows
    /// * `import_kw` - Grid import per period (kW, >= 0)
    /// * `export_kw` - Grid export per period (kW, >= 0)
    /// * `dt_hours` - Period duration in hours
    pub fn evaluate(
        prices: &PriceSignal,
        import_kw: &[f64],
        export_kw: &[f64],
        dt_hours: f64,
    ) -> Self {
        let energy_cost: f64 = import_kw
            .iter()
            .zip(&prices.import_price)
            .map(|(kw, price)| kw * price * dt_hours)
            .sum();
        let export_revenue: f64 = export_kw
            .iter()
            .zip(&prices.export_price)
            .map(|(kw, price)| kw * price * dt_hours)
            .sum();

        let billed_peak_kw = if prices.has_demand_charge() {
            import_kw
                .iter()
                .zip(&prices.demand_window)
                .filter(|&(_, &in_window)| in_window)
                .map(|(&kw, _)| kw)
                .fold(0.0_f64, f64::max)
        } else {
            0.0
        };
        let demand_cost = prices.demand_charge * billed_peak_kw;

        Self {
            energy_cost,
            export_revenue,
            demand_cost,
            billed_peak_kw,
            total: energy_cost - export_revenue + demand_cost,
        }
    }

    /// Prices a signed meter series, splitting it into import and export.
    pub fn evaluate_meter(prices: &PriceSignal, meter_kw: &[f64], dt_hours: f64) -> Self {
        let import_kw: Vec<f64> = meter_kw.iter().map(|m| m.max(0.0)).collect();
        let export_kw: Vec<f64> = meter_kw.iter().map(|m| (-m).max(0.0)).collect();
        Self::evaluate(prices, &import_kw, &export_kw, dt_hours)
    }
}

/// Aggregate indicators for a solved horizon.
///
/// Computed post-hoc from the schedule so the report always agrees with
/// the exported data.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    /// Number of periods.
    pub periods: usize,
    /// Bill with the optimized battery schedule.
    pub with_battery: CostBreakdown,
    /// Bill for the same load and PV with the battery idle.
    pub without_battery: CostBreakdown,
    /// Peak meter import over the whole horizon (kW).
    pub peak_import_kw: f64,
    /// Peak meter export over the whole horizon (kW, positive magnitude).
    pub peak_export_kw: f64,
    /// Energy charged plus discharged at the AC terminals (kWh).
    pub battery_throughput_kwh: f64,
    /// Throughput divided by twice the capacity.
    pub equivalent_full_cycles: f64,
    /// State of charge at the end of the horizon (kWh).
    pub final_soc_kwh: f64,
}

impl DispatchSummary {
    /// Builds the summary for a schedule.
    ///
    /// # Arguments
    ///
    /// * `load_kw` - Site load per period (kW)
    /// * `pv_kw` - PV generation per period (kW)
    /// * `prices` - Price signal used for the solve
    /// * `battery` - Battery parameters used for the solve
    /// * `schedule` - Optimal schedule
    pub fn from_schedule(
        load_kw: &[f64],
        pv_kw: &[f64],
        prices: &PriceSignal,
        battery: &BatteryParams,
        schedule: &DispatchSchedule,
    ) -> Self {
        let dt = battery.dt_hours;
        let with_battery =
            CostBreakdown::evaluate(prices, &schedule.import_kw, &schedule.export_kw, dt);
        let without_battery =
            CostBreakdown::evaluate_meter(prices, &net_load_kw(load_kw, pv_kw), dt);

        let peak_import_kw = schedule.meter_kw.iter().fold(0.0_f64, |acc, &m| acc.max(m));
        let peak_export_kw = schedule
            .meter_kw
            .iter()
            .fold(0.0_f64, |acc, &m| acc.max(-m));

        let battery_throughput_kwh: f64 = schedule
            .charge_kw
            .iter()
            .zip(&schedule.discharge_kw)
            .map(|(c, d)| (c + d) * dt)
            .sum();
        let equivalent_full_cycles = if battery.capacity_kwh > 0.0 {
            battery_throughput_kwh / (2.0 * battery.capacity_kwh)
        } else {
            0.0
        };

        Self {
            periods: schedule.len(),
            with_battery,
            without_battery,
            peak_import_kw,
            peak_export_kw,
            battery_throughput_kwh,
            equivalent_full_cycles,
            final_soc_kwh: schedule.soc_kwh.last().copied().unwrap_or(0.0),
        }
    }

    /// Bill reduction achieved by the battery (currency).
    pub fn savings(&self) -> f64 {
        self.without_battery.total - self.with_battery.total
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Dispatch Summary ({} periods) ---", self.periods)?;
        writeln!(f, "Energy cost:           {:.2}", self.with_battery.energy_cost)?;
        writeln!(f, "Export revenue:        {:.2}", self.with_battery.export_revenue)?;
        writeln!(
            f,
            "Demand charge:         {:.2} ({:.2} kW billed peak)",
            self.with_battery.demand_cost, self.with_battery.billed_peak_kw
        )?;
        writeln!(f, "Total cost:            {:.2}", self.with_battery.total)?;
        writeln!(f, "Cost without battery:  {:.2}", self.without_battery.total)?;
        writeln!(f, "Savings:               {:.2}", self.savings())?;
        writeln!(f, "Peak import:           {:.2} kW", self.peak_import_kw)?;
        writeln!(f, "Peak export:           {:.2} kW", self.peak_export_kw)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh ({:.2} equiv. cycles)",
            self.battery_throughput_kwh, self.equivalent_full_cycles
        )?;
        write!(f, "Final SoC:             {:.2} kWh", self.final_soc_kwh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_fixture() -> DispatchSchedule {
        // load [2, 6], pv 0, battery charges 2 kW then discharges 2 kW
        DispatchSchedule {
            battery_kw: vec![-2.0, 2.0],
            meter_kw: vec![4.0, 4.0],
            charge_kw: vec![2.0, 0.0],
            discharge_kw: vec![0.0, 2.0],
            import_kw: vec![4.0, 4.0],
            export_kw: vec![0.0, 0.0],
            soc_kwh: vec![0.0, 2.0, 0.0],
            objective: 40.8,
        }
    }

    #[test]
    fn energy_and_export_priced_per_period() {
        let prices = PriceSignal {
            import_price: vec![0.1, 0.3],
            export_price: vec![0.05, 0.05],
            demand_charge: 0.0,
            demand_window: vec![false, false],
        };
        let cost = CostBreakdown::evaluate(&prices, &[2.0, 1.0], &[0.0, 4.0], 0.5);
        assert!((cost.energy_cost - (0.1 + 0.15)).abs() < 1e-12);
        assert!((cost.export_revenue - 0.1).abs() < 1e-12);
        assert_eq!(cost.demand_cost, 0.0);
        assert!((cost.total - 0.15).abs() < 1e-12);
    }

    #[test]
    fn demand_peak_only_counts_window() {
        let prices = PriceSignal {
            import_price: vec![0.0; 3],
            export_price: vec![0.0; 3],
            demand_charge: 9.0,
            demand_window: vec![false, true, true],
        };
        let cost = CostBreakdown::evaluate(&prices, &[10.0, 3.0, 4.0], &[0.0; 3], 1.0);
        assert_eq!(cost.billed_peak_kw, 4.0);
        assert_eq!(cost.demand_cost, 36.0);
    }

    #[test]
    fn meter_split_into_import_and_export() {
        let prices = PriceSignal::flat(2, 0.2, 0.1);
        let cost = CostBreakdown::evaluate_meter(&prices, &[3.0, -2.0], 1.0);
        assert!((cost.energy_cost - 0.6).abs() < 1e-12);
        assert!((cost.export_revenue - 0.2).abs() < 1e-12);
    }

    #[test]
    fn summary_reports_savings_and_cycles() {
        let prices = PriceSignal::flat(2, 0.1, 0.0).with_demand_charge(10.0);
        let battery = BatteryParams::new(10.0, 5.0, 5.0, 1.0, 1.0, 0.0, 1.0);
        let summary = DispatchSummary::from_schedule(
            &[2.0, 6.0],
            &[0.0, 0.0],
            &prices,
            &battery,
            &schedule_fixture(),
        );
        assert!((summary.with_battery.total - 40.8).abs() < 1e-9);
        assert!((summary.without_battery.total - 60.8).abs() < 1e-9);
        assert!((summary.savings() - 20.0).abs() < 1e-9);
        assert!((summary.battery_throughput_kwh - 4.0).abs() < 1e-12);
        assert!((summary.equivalent_full_cycles - 0.2).abs() < 1e-12);
        assert_eq!(summary.peak_import_kw, 4.0);
        assert_eq!(summary.peak_export_kw, 0.0);
    }

    #[test]
    fn summary_display_has_header() {
        let prices = PriceSignal::flat(2, 0.1, 0.0);
        let battery = BatteryParams::new(10.0, 5.0, 5.0, 1.0, 1.0, 0.0, 1.0);
        let summary = DispatchSummary::from_schedule(
            &[2.0, 6.0],
            &[0.0, 0.0],
            &prices,
            &battery,
            &schedule_fixture(),
        );
        let text = summary.to_string();
        assert!(text.starts_with("--- Dispatch Summary (2 periods) ---"));
        assert!(text.contains("Savings:"));
    }
}
