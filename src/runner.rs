//! # Runner — Request Drivers
//!
//! The four request shapes on top of the engine: `single` (one publication,
//! one strategy or a category's candidates), `chain` (publications
//! back-to-back until a tau goal), `step` (one simulation per starting rho
//! across a range), and `all` (best active and idle rates per theory).
//!
//! Candidate strategies of one request are independent, so `single` fans
//! them out on the rayon pool; the fold back to a winner is ordered, so
//! results (including tie-breaks) are identical to a sequential run.
//! Chained publications have a data dependency and stay sequential.

use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{Recovery, TheoryData};
use crate::format::log_to_exp;
use crate::progress::RunContext;
use crate::result::{best_result, SimResult};
use crate::settings::Settings;
use crate::strategy::{strategies_for, Category};
use crate::theory::{run_theory, TheoryId};

/// A strategy request: an explicit catalog name, or a category to expand.
#[derive(Debug, Clone)]
pub enum StratSpec {
    Named(String),
    Category(Category),
}

impl StratSpec {
    /// Categories parse first; anything else is treated as a strategy name
    /// and validated by the theory module.
    pub fn parse(s: &str) -> StratSpec {
        match s.parse::<Category>() {
            Ok(cat) => StratSpec::Category(cat),
            Err(_) => StratSpec::Named(s.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SingleQuery {
    pub theory: TheoryId,
    pub strat: StratSpec,
    /// Previous publication rho, as log10.
    pub rho: f64,
    pub sigma: u32,
    pub cap: Option<f64>,
    pub recovery: Option<Recovery>,
    /// Strategy of the previous publication, for chained filter decisions.
    pub last_strat: String,
    pub settings: Settings,
}

/// Simulate one publication; with a category, race every candidate and keep
/// the best rate.
pub fn single_sim(query: &SingleQuery, ctx: &RunContext) -> Result<SimResult> {
    let candidates: Vec<String> = match &query.strat {
        StratSpec::Named(name) => vec![name.clone()],
        StratSpec::Category(cat) => {
            strategies_for(query.theory, *cat, query.rho, &query.last_strat)
                .into_iter()
                .map(String::from)
                .collect()
        }
    };
    ensure!(
        !candidates.is_empty(),
        "no candidate strategies for {} at rho {}",
        query.theory,
        query.rho
    );
    debug!(theory = %query.theory, rho = query.rho, ?candidates, "single sim");

    let results: Vec<Result<SimResult>> = candidates
        .par_iter()
        .map(|strat| {
            run_theory(
                &TheoryData {
                    theory: query.theory,
                    sigma: query.sigma,
                    rho: query.rho,
                    strat: strat.clone(),
                    recovery: query.recovery,
                    cap: query.cap,
                    settings: query.settings,
                },
                ctx,
            )
        })
        .collect();

    let mut best: Option<SimResult> = None;
    for res in results {
        let res = res?;
        best = Some(match best {
            None => res,
            Some(b) => best_result(b, res),
        });
    }
    best.context("no strategy candidates produced a result")
}

#[derive(Debug, Clone)]
pub struct ChainQuery {
    pub theory: TheoryId,
    pub strat: StratSpec,
    /// Starting rho, as log10.
    pub rho: f64,
    pub sigma: u32,
    /// Chain until a publication reaches this rho.
    pub cap: f64,
    /// Forbid the final publication from overshooting `cap`.
    pub hard_cap: bool,
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainResult {
    pub results: Vec<SimResult>,
    /// Total tau gained across the chain.
    pub delta_tau: f64,
    /// Tau per hour averaged over the whole chain.
    pub average_rate: f64,
    /// Total sim time, in seconds.
    pub total_time: f64,
}

/// Simulate publications back-to-back, each seeded with the previous
/// publication point, until the cap is reached.
pub fn chain_sim(query: &ChainQuery, ctx: &RunContext) -> Result<ChainResult> {
    let mut rho = query.rho;
    let mut last_strat = String::new();
    let mut results = Vec::new();
    let mut total_time = 0.0;

    while rho < query.cap {
        if ctx.is_cancelled() {
            break;
        }
        ctx.progress
            .set_current(format!("{}/{}", log_to_exp(rho, 0), log_to_exp(query.cap, 0)));
        let res = single_sim(
            &SingleQuery {
                theory: query.theory,
                strat: query.strat.clone(),
                rho,
                sigma: query.sigma,
                cap: query.hard_cap.then_some(query.cap),
                recovery: None,
                last_strat: last_strat.clone(),
                settings: query.settings,
            },
            ctx,
        )?;
        if res.pub_rho <= rho {
            warn!(rho, pub_rho = res.pub_rho, "chain stalled; stopping");
            break;
        }
        last_strat = res.strat.split(' ').next().unwrap_or_default().to_string();
        total_time += res.time;
        rho = res.pub_rho;
        results.push(res);
    }

    let delta_tau = (rho - query.rho) * query.theory.tau_factor();
    let average_rate = if total_time > 0.0 {
        delta_tau / (total_time / 3600.0)
    } else {
        0.0
    };
    Ok(ChainResult {
        results,
        delta_tau,
        average_rate,
        total_time,
    })
}

#[derive(Debug, Clone)]
pub struct StepQuery {
    pub theory: TheoryId,
    pub strat: StratSpec,
    pub rho: f64,
    pub sigma: u32,
    /// Last starting rho, inclusive.
    pub cap: f64,
    pub step: f64,
    pub settings: Settings,
}

/// One independent simulation per starting rho from `rho` to `cap`.
pub fn step_sim(query: &StepQuery, ctx: &RunContext) -> Result<Vec<SimResult>> {
    ensure!(query.step > 0.0, "step must be positive, got {}", query.step);
    let mut results = Vec::new();
    let mut rho = query.rho;
    let mut last_strat = String::new();
    while rho <= query.cap + 1e-9 {
        if ctx.is_cancelled() {
            break;
        }
        ctx.progress
            .set_current(format!("{}/{}", log_to_exp(rho, 0), log_to_exp(query.cap, 0)));
        let res = single_sim(
            &SingleQuery {
                theory: query.theory,
                strat: query.strat.clone(),
                rho,
                sigma: query.sigma,
                cap: None,
                recovery: None,
                last_strat: last_strat.clone(),
                settings: query.settings,
            },
            ctx,
        )?;
        last_strat = res.strat.split(' ').next().unwrap_or_default().to_string();
        results.push(res);
        rho += query.step;
    }
    Ok(results)
}

#[derive(Debug, Clone)]
pub struct AllQuery {
    pub sigma: u32,
    /// Current rho per theory.
    pub values: Vec<(TheoryId, f64)>,
    /// Category used for the hands-on column.
    pub active_category: Category,
    /// Category used for the hands-off column.
    pub idle_category: Category,
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllRow {
    pub theory: TheoryId,
    pub active: SimResult,
    pub idle: SimResult,
    /// Rate advantage of playing actively.
    pub ratio: f64,
}

/// Best active and idle rates for each supplied theory.
pub fn sim_all(query: &AllQuery, ctx: &RunContext) -> Result<Vec<AllRow>> {
    let mut rows = Vec::new();
    for &(theory, rho) in &query.values {
        if ctx.is_cancelled() {
            break;
        }
        ctx.progress.set_current(format!("{theory}"));
        let base = SingleQuery {
            theory,
            strat: StratSpec::Category(query.active_category),
            rho,
            sigma: query.sigma,
            cap: None,
            recovery: None,
            last_strat: String::new(),
            settings: query.settings,
        };
        let active = single_sim(&base, ctx)?;
        let idle = single_sim(
            &SingleQuery {
                strat: StratSpec::Category(query.idle_category),
                ..base
            },
            ctx,
        )?;
        let ratio = if idle.tau_h > 0.0 {
            active.tau_h / idle.tau_h
        } else {
            0.0
        };
        rows.push(AllRow {
            theory,
            active,
            idle,
            ratio,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancelFlag, Progress};

    fn ctx_parts() -> (CancelFlag, Progress) {
        (CancelFlag::new(), Progress::new())
    }

    #[test]
    fn strat_spec_prefers_categories() {
        assert!(matches!(StratSpec::parse("idle"), StratSpec::Category(Category::Idle)));
        assert!(matches!(StratSpec::parse("T1Ratio"), StratSpec::Named(_)));
    }

    #[test]
    fn single_named_strategy() {
        let (cancel, progress) = ctx_parts();
        let ctx = RunContext::new(&cancel, &progress);
        let res = single_sim(
            &SingleQuery {
                theory: TheoryId::T1,
                strat: StratSpec::Named("T1".to_string()),
                rho: 0.0,
                sigma: 0,
                cap: Some(25.0),
                recovery: None,
                last_strat: String::new(),
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(res.strat, "T1");
        assert!(res.pub_rho >= 25.0);
    }

    #[test]
    fn single_unknown_strategy_errors() {
        let (cancel, progress) = ctx_parts();
        let ctx = RunContext::new(&cancel, &progress);
        let err = single_sim(
            &SingleQuery {
                theory: TheoryId::T1,
                strat: StratSpec::Named("T9Zoom".to_string()),
                rho: 0.0,
                sigma: 0,
                cap: Some(20.0),
                recovery: None,
                last_strat: String::new(),
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown T1 strategy"));
    }

    /// Each chained publication starts from the previous publication point.
    #[test]
    fn chain_publications_ascend() {
        let (cancel, progress) = ctx_parts();
        let ctx = RunContext::new(&cancel, &progress);
        let chain = chain_sim(
            &ChainQuery {
                theory: TheoryId::T1,
                strat: StratSpec::Named("T1".to_string()),
                rho: 0.0,
                sigma: 0,
                cap: 30.0,
                hard_cap: false,
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap();
        assert!(!chain.results.is_empty());
        for pair in chain.results.windows(2) {
            assert!(pair[1].last_pub >= pair[0].pub_rho - 1e-9);
            assert!(pair[1].pub_rho > pair[0].pub_rho);
        }
        assert!(chain.results.last().unwrap().pub_rho >= 30.0);
        assert!(chain.delta_tau > 0.0);
        assert!(chain.average_rate > 0.0);
    }

    #[test]
    fn chain_cancelled_returns_partial() {
        let (cancel, progress) = ctx_parts();
        cancel.cancel();
        let ctx = RunContext::new(&cancel, &progress);
        let chain = chain_sim(
            &ChainQuery {
                theory: TheoryId::T1,
                strat: StratSpec::Named("T1".to_string()),
                rho: 0.0,
                sigma: 0,
                cap: 30.0,
                hard_cap: false,
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap();
        assert!(chain.results.is_empty());
    }

    #[test]
    fn step_covers_range_inclusive() {
        let (cancel, progress) = ctx_parts();
        let ctx = RunContext::new(&cancel, &progress);
        let results = step_sim(
            &StepQuery {
                theory: TheoryId::T1,
                strat: StratSpec::Named("T1".to_string()),
                rho: 10.0,
                sigma: 0,
                cap: 20.0,
                step: 5.0,
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].last_pub, 10.0);
        assert_eq!(results[2].last_pub, 20.0);
    }

    #[test]
    fn all_compares_categories() {
        let (cancel, progress) = ctx_parts();
        let ctx = RunContext::new(&cancel, &progress);
        let rows = sim_all(
            &AllQuery {
                sigma: 0,
                values: vec![(TheoryId::T1, 12.0)],
                active_category: Category::Active,
                idle_category: Category::Idle,
                settings: Settings::default(),
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].active.tau_h > 0.0);
        assert!(rows[0].idle.tau_h > 0.0);
        assert!(rows[0].ratio > 0.0);
    }
}
