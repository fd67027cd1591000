//! Behind-the-meter battery dispatch optimizer.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
/// Dispatch model: parameters, tariff, optimizer, and cost reporting.
pub mod model;
pub mod runner;
pub mod telemetry;
