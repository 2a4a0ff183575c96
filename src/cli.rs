// src/cli.rs

use std::path::PathBuf;

use clap::Parser;

/// Runs a synthetic replenishment batch and writes CSV reports.
#[derive(Parser)]
#[command(name = "replenish", version, about = "Inventory replenishment batch demo")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the CSV reports.
    #[arg(short, long, default_value = "replenishment_output")]
    pub output: PathBuf,

    /// Number of synthetic items.
    #[arg(long, default_value_t = 12)]
    pub items: usize,

    /// Number of weekly periods to run.
    #[arg(long, default_value_t = 52)]
    pub periods: usize,

    /// RNG seed for the synthetic observations.
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// Company service-level goal (%), overriding the config file.
    #[arg(long)]
    pub service_level: Option<f64>,
}
