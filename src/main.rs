//! btm-dispatch entry point: load profile, solve, write schedule.

use std::path::Path;
use std::process::ExitCode;

use btm_dispatch::cli::{parse_args, print_usage};
use btm_dispatch::config::DispatchConfig;
use btm_dispatch::error::DispatchError;
use btm_dispatch::runner;
use btm_dispatch::telemetry::init_tracing;

fn main() -> ExitCode {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if cli.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    init_tracing();

    // --config first, then path overrides on top
    let mut config = match cli.config {
        Some(ref path) => match DispatchConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => DispatchConfig::default(),
    };
    if let Some(input) = cli.input {
        config.profile.input = input;
    }
    if let Some(output) = cli.output {
        config.profile.output = output;
    }

    match runner::run(&config) {
        Ok(report) => {
            println!("{}", report.schedule);
            println!("{}", report.summary);
            ExitCode::SUCCESS
        }
        Err(DispatchError::Config(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "dispatch run failed");
            ExitCode::FAILURE
        }
    }
}
