//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains settings
//! resolution (config file plus flag overrides), rayon pool configuration,
//! the execution logic for each subcommand, and the table renderer.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use pubsim::format::{convert_time, format_number, log_to_exp, parse_value};
use pubsim::progress::{CancelFlag, Progress, RunContext};
use pubsim::result::SimResult;
use pubsim::runner::{
    chain_sim, sim_all, single_sim, step_sim, AllQuery, AllRow, ChainQuery, SingleQuery,
    StepQuery, StratSpec,
};
use pubsim::settings::Settings;
use pubsim::strategy::Category;
use pubsim::theory::TheoryId;

use super::{Cli, Commands};

/// Resolve engine settings: config file first, then flag overrides.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(dt) = cli.dt {
        settings.dt = dt;
    }
    if let Some(ddt) = cli.ddt {
        settings.ddt = ddt;
    }
    if let Some(window) = cli.purchase_window {
        settings.purchase_window = window;
    }
    settings.validate()?;
    Ok(settings)
}

/// Configure the global rayon pool. Must run before any parallel work.
pub fn configure_rayon(cli: &Cli) -> Result<()> {
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring rayon thread pool")?;
    }
    Ok(())
}

pub fn run(cli: &Cli) -> Result<()> {
    let settings = resolve_settings(cli)?;
    let cancel = CancelFlag::new();
    let progress = Progress::new();
    let ctx = RunContext::new(&cancel, &progress);

    match &cli.command {
        Commands::Single {
            theory,
            strat,
            rho,
            sigma,
            cap,
        } => {
            let query = SingleQuery {
                theory: *theory,
                strat: StratSpec::parse(strat),
                rho: parse_value(rho)?,
                sigma: *sigma,
                cap: cap.as_deref().map(parse_value).transpose()?,
                recovery: None,
                last_strat: String::new(),
                settings,
            };
            let res = single_sim(&query, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                print_table(&[res]);
            }
        }
        Commands::Chain {
            theory,
            strat,
            rho,
            cap,
            sigma,
            hard_cap,
        } => {
            let query = ChainQuery {
                theory: *theory,
                strat: StratSpec::parse(strat),
                rho: parse_value(rho)?,
                sigma: *sigma,
                cap: parse_value(cap)?,
                hard_cap: *hard_cap,
                settings,
            };
            let chain = chain_sim(&query, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&chain)?);
            } else {
                print_table(&chain.results);
                println!(
                    "delta tau {}   average {}/hr   total time {}",
                    log_to_exp(chain.delta_tau, 2),
                    format_number(chain.average_rate, 5),
                    convert_time(chain.total_time),
                );
            }
        }
        Commands::Step {
            theory,
            strat,
            rho,
            cap,
            step,
            sigma,
        } => {
            let query = StepQuery {
                theory: *theory,
                strat: StratSpec::parse(strat),
                rho: parse_value(rho)?,
                sigma: *sigma,
                cap: parse_value(cap)?,
                step: step
                    .parse()
                    .map_err(|_| anyhow!("invalid step {step:?}"))?,
                settings,
            };
            let results = step_sim(&query, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_table(&results);
            }
        }
        Commands::All {
            values,
            sigma,
            semi_idle,
        } => {
            let query = AllQuery {
                sigma: *sigma,
                values: parse_theory_values(values)?,
                active_category: Category::Active,
                idle_category: if *semi_idle {
                    Category::SemiIdle
                } else {
                    Category::Idle
                },
                settings,
            };
            let rows = sim_all(&query, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_all_table(&rows);
            }
        }
    }

    info!(
        ticks = progress.ticks.load(std::sync::atomic::Ordering::Relaxed),
        sims = progress.sims.load(std::sync::atomic::Ordering::Relaxed),
        "request complete"
    );
    Ok(())
}

/// Parse `THEORY=RHO` pairs such as `T1=e500`.
fn parse_theory_values(values: &[String]) -> Result<Vec<(TheoryId, f64)>> {
    values
        .iter()
        .map(|pair| {
            let (theory, rho) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected THEORY=RHO, got {pair:?}"))?;
            Ok((theory.parse()?, parse_value(rho)?))
        })
        .collect()
}

// ── Table Rendering ─────────────────────────────────────────────

fn result_row(res: &SimResult) -> Vec<String> {
    vec![
        res.theory.to_string(),
        res.sigma.to_string(),
        log_to_exp(res.last_pub, 2),
        log_to_exp(res.pub_rho, 2),
        log_to_exp(res.delta_tau, 2),
        // pub_multi is a linear multiplier, not a log10 magnitude.
        format_number(res.pub_multi, 6),
        res.strat.clone(),
        format_number(res.tau_h, 5),
        convert_time(res.time),
    ]
}

fn print_table(results: &[SimResult]) {
    let header = [
        "Theory", "Sigma", "Input", "Pub Rho", "Delta Tau", "Multi", "Strat", "Tau/hr", "Time",
    ];
    let rows: Vec<Vec<String>> = results.iter().map(result_row).collect();
    print_aligned(&header, &rows);
}

fn print_all_table(rows: &[AllRow]) {
    let header = [
        "Theory", "Input", "Active", "Tau/hr", "Idle", "Tau/hr", "Ratio",
    ];
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.theory.to_string(),
                log_to_exp(row.active.last_pub, 2),
                row.active.strat.clone(),
                format_number(row.active.tau_h, 5),
                row.idle.strat.clone(),
                format_number(row.idle.tau_h, 5),
                format_number(row.ratio, 4),
            ]
        })
        .collect();
    print_aligned(&header, &cells);
}

fn print_aligned(header: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };
    line(&header.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    for row in rows {
        line(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The Multi column is a linear multiplier; the log-space columns around
    /// it must not swallow it.
    #[test]
    fn result_row_formats_multiplier_linearly() {
        let res = SimResult {
            theory: TheoryId::T1,
            sigma: 20,
            last_pub: 300.0,
            pub_rho: 325.0,
            delta_tau: 2.5,
            pub_multi: 2.5,
            strat: "T1".to_string(),
            tau_h: 1.0,
            time: 60.0,
            bought_vars: Vec::new(),
        };
        let row = result_row(&res);
        assert_eq!(row[5], "2.50000");
        assert_eq!(row[4], log_to_exp(2.5, 2));
    }
}
