//! Time-of-day tariff windows and price signal construction.

use chrono::{NaiveDateTime, NaiveTime};

use super::types::PriceSignal;
use crate::config::TariffConfig;
use crate::error::DispatchError;

/// A daily time-of-day window `[start, end)`.
///
/// Windows with `start > end` wrap past midnight, e.g. `22:00`-`06:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start (inclusive).
    pub start: NaiveTime,
    /// Window end (exclusive).
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Creates a window spanning `[start, end)`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parses a window from two `HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending value if either bound does
    /// not parse or both bounds are equal.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start_t = parse_clock(start)?;
        let end_t = parse_clock(end)?;
        if start_t == end_t {
            return Err(format!("window \"{start}\"-\"{end}\" is empty"));
        }
        Ok(Self::new(start_t, end_t))
    }

    /// Returns `true` when `time` falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| format!("\"{value}\" is not an HH:MM time: {e}"))
}

/// Builds the per-period price signal for the given period start times.
///
/// The flat import price is overridden by the first matching time-of-use
/// window. The demand charge applies to periods inside the demand window,
/// or to every period when no window is configured.
///
/// # Errors
///
/// Returns `DispatchError::Input` if a configured window does not parse.
pub fn build_price_signal(
    tariff: &TariffConfig,
    timestamps: &[NaiveDateTime],
) -> Result<PriceSignal, DispatchError> {
    let tou = tariff
        .time_of_use
        .iter()
        .map(|p| {
            TimeWindow::parse(&p.start, &p.end)
                .map(|w| (w, p.import_price))
                .map_err(|e| DispatchError::input(format!("tariff.time_of_use: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let demand_window = tariff
        .demand_window
        .as_ref()
        .map(|w| TimeWindow::parse(&w.start, &w.end))
        .transpose()
        .map_err(|e| DispatchError::input(format!("tariff.demand_window: {e}")))?;

    let mut import_price = Vec::with_capacity(timestamps.len());
    let mut in_demand_window = Vec::with_capacity(timestamps.len());
    for ts in timestamps {
        let time = ts.time();
        let price = tou
            .iter()
            .find(|(w, _)| w.contains(time))
            .map_or(tariff.import_price, |&(_, p)| p);
        import_price.push(price);
        in_demand_window.push(demand_window.is_none_or(|w| w.contains(time)));
    }

    Ok(PriceSignal {
        export_price: vec![tariff.export_price; timestamps.len()],
        import_price,
        demand_charge: tariff.demand_charge,
        demand_window: in_demand_window,
    })
}
