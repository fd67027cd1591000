//! Error taxonomy for the load, solve, and write pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Every way a dispatch run can fail.
///
/// Input and configuration problems are detected before a model is built.
/// Solver outcomes other than an optimal solution map to `Infeasible`,
/// `Unbounded`, or `Solver`, and never produce a schedule.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// One or more configuration fields failed validation.
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    /// Missing, malformed, or inconsistent input data.
    #[error("input error: {0}")]
    Input(String),

    /// The constraint set admits no solution.
    #[error("dispatch model is infeasible: no schedule satisfies the battery and grid constraints")]
    Infeasible,

    /// The objective has no finite minimum.
    #[error("dispatch model is unbounded: the objective has no finite minimum")]
    Unbounded,

    /// The solver backend failed for a reason other than infeasibility.
    #[error("solver error: {0}")]
    Solver(String),

    /// The schedule could not be written.
    #[error("cannot write \"{}\": {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl DispatchError {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<good_lp::ResolutionError> for DispatchError {
    fn from(err: good_lp::ResolutionError) -> Self {
        match err {
            good_lp::ResolutionError::Infeasible => Self::Infeasible,
            good_lp::ResolutionError::Unbounded => Self::Unbounded,
            other => Self::Solver(other.to_string()),
        }
    }
}
