//! # sens CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sens_cli::commands::{run_check, run_eval, CheckArgs, EvalArgs};

/// Sensitivity tracking for per-entity contribution bounds.
///
/// Evaluates declarative scenarios through the Bounded-Contribution Tensor
/// algebra and reports per-element bounds and sensitivity.
#[derive(Parser, Debug)]
#[command(name = "sens", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a scenario and report bounds and sensitivity as JSON.
    Eval(EvalArgs),

    /// Check that a scenario parses and all of its references resolve.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Eval(args) => run_eval(&args),
        Commands::Check(args) => run_check(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn cli_parse_eval() {
        let cli = Cli::try_parse_from(["sens", "eval", "scenario.yaml"]).unwrap();
        assert_eq!(cli.verbose, 0);
        if let Commands::Eval(args) = cli.command {
            assert_eq!(args.scenario, PathBuf::from("scenario.yaml"));
            assert!(args.out.is_none());
            assert!(!args.compact);
        } else {
            panic!("expected eval");
        }
    }

    #[test]
    fn cli_parse_eval_with_options() {
        let cli = Cli::try_parse_from([
            "sens", "-vv", "eval", "s.json", "--out", "r.json", "--compact",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        if let Commands::Eval(args) = cli.command {
            assert_eq!(args.out, Some(PathBuf::from("r.json")));
            assert!(args.compact);
        } else {
            panic!("expected eval");
        }
    }

    #[test]
    fn cli_parse_check() {
        let cli = Cli::try_parse_from(["sens", "check", "s.yml", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn cli_requires_scenario_path() {
        assert!(Cli::try_parse_from(["sens", "eval"]).is_err());
        assert!(Cli::try_parse_from(["sens"]).is_err());
    }
}
