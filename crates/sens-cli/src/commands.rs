//! # Eval and Check Subcommands
//!
//! ```bash
//! sens eval scenario.yaml               # pretty JSON report on stdout
//! sens eval scenario.yaml --out r.json  # report written to a file
//! sens check scenario.json              # validate references only
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::scenario::{Report, Scenario};

/// Arguments for `sens eval`.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Scenario file (.yaml, .yml or .json).
    pub scenario: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Emit single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for `sens check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scenario file (.yaml, .yml or .json).
    pub scenario: PathBuf,
}

/// Evaluate a scenario and emit its report.
pub fn run_eval(args: &EvalArgs) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    let report = scenario.evaluate()?;
    let rendered = render(&report, args.compact)?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, rendered + "\n")
                .with_context(|| format!("failed to write report {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote report");
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

/// Validate a scenario without evaluating it.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    scenario.check()?;
    println!(
        "OK: {} ({} inputs, {} steps, {} outputs)",
        args.scenario.display(),
        scenario.inputs.len(),
        scenario.steps.len(),
        scenario.outputs.len()
    );
    Ok(0)
}

fn render(report: &Report, compact: bool) -> Result<String> {
    let rendered = if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    };
    rendered.context("failed to serialize report")
}
