//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the simulation drivers. Shared concerns live in
//! `cli.rs`: settings resolution, rayon pool configuration, and table output.
//!
//! ## Subcommands
//!
//! - `single`: one publication of one theory, with a strategy name or a
//!   category (`active`, `semi-idle`, `idle`) raced over its candidates.
//! - `chain`: publications back-to-back until a target rho.
//! - `step`: one simulation per starting rho across a range.
//! - `all`: best active and idle rates for a set of theories.
//!
//! ## Global Options
//!
//! - `--config`: TOML settings file (`dt`, `ddt`, `purchase_window`).
//! - `--dt` / `--ddt` / `--purchase-window`: per-flag overrides.
//! - `--threads`: rayon thread pool size (defaults to all logical cores).
//! - `--json`: machine-readable output instead of a table.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pubsim::theory::TheoryId;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "pubsim", version, about = "Simulate theory publications and compare strategies")]
struct Cli {
    /// Path to a TOML settings file (or set PUBSIM_CONFIG)
    #[arg(long, env = "PUBSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Initial tick length in game-seconds (overrides the config file)
    #[arg(long)]
    dt: Option<f64>,

    /// Per-tick growth factor of the tick length (overrides the config file)
    #[arg(long)]
    ddt: Option<f64>,

    /// How far below the previous publication purchases are still recorded,
    /// in log10 units (overrides the config file)
    #[arg(long)]
    purchase_window: Option<f64>,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Emit results as JSON instead of a table
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one publication
    Single {
        /// Theory to simulate
        #[arg(value_enum)]
        theory: TheoryId,
        /// Strategy name, or a category (active, semi-idle, idle) to race
        strat: String,
        /// Starting rho: "e500", "500" or "1.5e300"
        rho: String,
        /// Total sigma of the student distribution
        #[arg(long, default_value_t = 0)]
        sigma: u32,
        /// Publish at this rho instead of the detected rate peak
        #[arg(long)]
        cap: Option<String>,
    },
    /// Simulate publications back-to-back until a target rho
    Chain {
        #[arg(value_enum)]
        theory: TheoryId,
        /// Strategy name, or a category re-evaluated at every publication
        strat: String,
        /// Starting rho
        rho: String,
        /// Chain until a publication reaches this rho
        cap: String,
        #[arg(long, default_value_t = 0)]
        sigma: u32,
        /// Forbid the final publication from overshooting the cap
        #[arg(long)]
        hard_cap: bool,
    },
    /// One independent simulation per starting rho across a range
    Step {
        #[arg(value_enum)]
        theory: TheoryId,
        strat: String,
        /// First starting rho
        rho: String,
        /// Last starting rho, inclusive
        cap: String,
        /// Increment between starting rhos, in log10 units
        step: String,
        #[arg(long, default_value_t = 0)]
        sigma: u32,
    },
    /// Best active and idle rates for a set of theories
    All {
        /// Current rho per theory, as THEORY=RHO pairs (e.g. "T1=e500")
        #[arg(required = true)]
        values: Vec<String>,
        #[arg(long, default_value_t = 0)]
        sigma: u32,
        /// Compare against semi-idle instead of idle strategies
        #[arg(long)]
        semi_idle: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli::configure_rayon(&cli)?;
    cli::run(&cli)
}
