//! # sens-cli — Scenario Evaluation for Sensitivity Tracking
//!
//! Provides the `sens` command-line interface: declare single-entity
//! inputs and a chain of operations in a YAML or JSON scenario, and get
//! back the propagated bounds and sensitivity of every requested result.
//!
//! ## Subcommands
//!
//! - `sens eval`: evaluate a scenario and print a JSON report.
//! - `sens check`: validate a scenario's references without evaluating.

pub mod commands;
pub mod scenario;
