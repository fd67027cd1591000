use std::env;
use std::path::PathBuf;

/// Parsed command-line options. Every option is optional; with none given
/// the run uses the built-in configuration.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions::default();

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--input" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --input (expected a CSV file path)")?;
                if opts.input.replace(PathBuf::from(path)).is_some() {
                    return Err("--input provided more than once".to_string());
                }
            }
            "--output" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --output (expected a CSV file path)")?;
                if opts.output.replace(PathBuf::from(path)).is_some() {
                    return Err("--output provided more than once".to_string());
                }
            }
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("btm-dispatch — behind-the-meter battery dispatch optimizer");
    eprintln!();
    eprintln!("Usage: btm-dispatch [--config <path>] [--input <path>] [--output <path>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>   Load battery, grid, and tariff settings from TOML");
    eprintln!("  --input <path>    Profile CSV (default: data/profiles.csv)");
    eprintln!("  --output <path>   Schedule CSV (default: data/results.csv)");
    eprintln!("  --help            Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for solver details.");
}

#[cfg(test)]
mod tests {
    use super::parse_args_from;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_is_valid() {
        let opts = parse_args_from(&[]).expect("parse should succeed");
        assert!(opts.config.is_none());
        assert!(opts.input.is_none());
        assert!(opts.output.is_none());
        assert!(!opts.help);
    }

    #[test]
    fn supports_all_paths() {
        let opts = parse_args_from(&args(&[
            "--config", "site.toml", "--input", "in.csv", "--output", "out.csv",
        ]))
        .expect("parse should succeed");
        assert_eq!(
            opts.config.as_deref().and_then(|p| p.to_str()),
            Some("site.toml")
        );
        assert_eq!(opts.input.as_deref().and_then(|p| p.to_str()), Some("in.csv"));
        assert_eq!(opts.output.as_deref().and_then(|p| p.to_str()), Some("out.csv"));
    }

    #[test]
    fn help_flag_sets_help() {
        let opts = parse_args_from(&args(&["-h"])).expect("parse should succeed");
        assert!(opts.help);
    }

    #[test]
    fn missing_value_rejected() {
        let err = parse_args_from(&args(&["--input"]));
        assert!(err.is_err_and(|e| e.contains("--input")));
    }

    #[test]
    fn duplicate_option_rejected() {
        let err = parse_args_from(&args(&["--output", "a.csv", "--output", "b.csv"]));
        assert!(err.is_err_and(|e| e.contains("more than once")));
    }

    #[test]
    fn unknown_argument_rejected() {
        let err = parse_args_from(&args(&["--preset", "demo"]));
        assert!(err.is_err_and(|e| e.contains("unknown argument")));
    }
}
