//! # T6 — Integral Currency
//!
//! Rho is not accumulated from a rate: each tick evaluates a closed-form
//! integral of the growth terms and takes the difference against the
//! previous evaluation. The `k` ratio between the highest term and the base
//! term drives both the Snax stopping rule (stop buying `c1`/`c2` once `k`
//! stays high) and the weighted purchase policy of the AI strategies.

use anyhow::{bail, Result};

use crate::engine::{BuyPolicy, Sim, SimCore, TheoryData, TheoryModel};
use crate::format::log_to_exp;
use crate::logspace::{add, add2, subtract};
use crate::progress::RunContext;
use crate::result::{last_level, SimResult};
use crate::theory::l10;
use crate::variable::{CostModel, ValueModel, Variable};

pub(crate) const STRAT_NAMES: &[&str] = &[
    "T6",
    "T6C3",
    "T6C4",
    "T6C125",
    "T6C12",
    "T6C5",
    "T6C5Coast",
    "T6Snax",
    "T6SnaxCoast",
    "T6C5d",
    "T6C5dCoast",
    "T6AI",
    "T6AICoast",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strat {
    Plain,
    C3,
    C4,
    C125,
    C12,
    C5,
    C5Coast,
    Snax,
    SnaxCoast,
    C5d,
    C5dCoast,
    Ai,
    AiCoast,
}

impl Strat {
    fn parse(name: &str) -> Result<Strat> {
        Ok(match name {
            "T6" => Strat::Plain,
            "T6C3" => Strat::C3,
            "T6C4" => Strat::C4,
            "T6C125" => Strat::C125,
            "T6C12" => Strat::C12,
            "T6C5" => Strat::C5,
            "T6C5Coast" => Strat::C5Coast,
            "T6Snax" => Strat::Snax,
            "T6SnaxCoast" => Strat::SnaxCoast,
            "T6C5d" => Strat::C5d,
            "T6C5dCoast" => Strat::C5dCoast,
            "T6AI" => Strat::Ai,
            "T6AICoast" => Strat::AiCoast,
            _ => bail!("unknown T6 strategy {name:?}"),
        })
    }

    fn name(self) -> &'static str {
        match self {
            Strat::Plain => "T6",
            Strat::C3 => "T6C3",
            Strat::C4 => "T6C4",
            Strat::C125 => "T6C125",
            Strat::C12 => "T6C12",
            Strat::C5 => "T6C5",
            Strat::C5Coast => "T6C5Coast",
            Strat::Snax => "T6Snax",
            Strat::SnaxCoast => "T6SnaxCoast",
            Strat::C5d => "T6C5d",
            Strat::C5dCoast => "T6C5dCoast",
            Strat::Ai => "T6AI",
            Strat::AiCoast => "T6AICoast",
        }
    }

    fn is_coast(self) -> bool {
        matches!(self, Strat::C5Coast | Strat::SnaxCoast | Strat::C5dCoast | Strat::AiCoast)
    }

    fn is_snax(self) -> bool {
        matches!(self, Strat::Snax | Strat::SnaxCoast)
    }

    fn is_ai(self) -> bool {
        matches!(self, Strat::Ai | Strat::AiCoast)
    }

    fn base(self) -> Strat {
        match self {
            Strat::C5Coast => Strat::C5,
            Strat::SnaxCoast => Strat::Snax,
            Strat::C5dCoast => Strat::C5d,
            Strat::AiCoast => Strat::Ai,
            other => other,
        }
    }
}

/// Snax stopping state: rho recorded at the stop point, consecutive
/// high-`k` ticks, and whether `c1`/`c2` buying is still active.
#[derive(Debug, Clone, Copy)]
struct StopC12 {
    recorded_rho: f64,
    high_k_ticks: u32,
    active: bool,
}

#[derive(Debug, Clone)]
struct T6 {
    strat: Strat,
    q: f64,
    r: f64,
    /// Gap between the `c5` term and the base term at the last integral
    /// evaluation, as log10.
    k: f64,
    stop_c12: StopC12,
}

impl T6 {
    /// Closed-form integral of the growth terms (log10), updating `k`.
    fn calculate_integral(&mut self, core: &SimCore, vc1: f64) -> f64 {
        let v = &core.variables;
        let ms = &core.milestones;
        let term1 = vc1 + v[5].value + self.q + self.r;
        let term2 = v[6].value + self.q * 2.0 + self.r - l10(2.0);
        let term3 = if ms[1] > 0 {
            v[7].value + self.q * 3.0 + self.r - l10(3.0)
        } else {
            f64::NEG_INFINITY
        };
        let term4 = if ms[2] > 0 {
            v[8].value + self.q + self.r * 2.0 - l10(2.0)
        } else {
            f64::NEG_INFINITY
        };
        self.k = term4 - term1;
        core.tot_mult + add(&[term1, term2, term3, term4])
    }

    /// Minimum of the competing costs the d-strategies ratio against.
    fn d_reference(&self, core: &SimCore) -> f64 {
        let v = &core.variables;
        let c5 = if core.milestones[2] > 0 { v[8].cost } else { f64::INFINITY };
        v[1].cost.min(v[3].cost).min(c5)
    }
}

impl TheoryModel for T6 {
    fn strat_label(&self) -> String {
        self.strat.name().to_string()
    }

    fn tick(&mut self, core: &mut SimCore) {
        let logdt = l10(core.dt);
        let vc1 = core.variables[4].value * (1.0 + 0.05 * core.milestones[3] as f64);

        let old = self.calculate_integral(core, vc1);
        let mut baseline = subtract(old, core.rho());

        self.q = add2(
            self.q,
            core.variables[0].value + core.variables[1].value + logdt,
        );
        self.r = if core.milestones[0] > 0 {
            add2(
                self.r,
                core.variables[2].value + core.variables[3].value + logdt - 3.0,
            )
        } else {
            0.0
        };

        let new = self.calculate_integral(core, vc1);
        if baseline > new {
            baseline = new;
        }
        core.currencies[0].value = subtract(new, baseline).max(0.0);

        if self.k > 0.3 {
            self.stop_c12.high_k_ticks += 1;
        } else {
            self.stop_c12.high_k_ticks = 0;
        }
        if self.stop_c12.high_k_ticks > 30 && self.stop_c12.active {
            self.stop_c12.recorded_rho = core.max_rho;
            self.stop_c12.active = false;
        }
    }

    fn buy_condition(&self, core: &SimCore, i: usize) -> bool {
        let v = &core.variables;
        match self.strat {
            Strat::Plain | Strat::Ai | Strat::AiCoast => true,
            Strat::C3 => match i {
                4 | 5 => v[6].level == 0,
                7 | 8 => false,
                _ => true,
            },
            Strat::C4 => matches!(i, 0..=3 | 7),
            Strat::C125 => !matches!(i, 6 | 7),
            Strat::C12 => !matches!(i, 6 | 7 | 8),
            Strat::C5 | Strat::C5Coast => matches!(i, 0..=3 | 8),
            Strat::Snax | Strat::SnaxCoast => match i {
                4 | 5 => self.stop_c12.active,
                6 | 7 => false,
                _ => true,
            },
            Strat::C5d | Strat::C5dCoast => match i {
                0 => {
                    v[0].cost + l10(7.0 + (v[0].level % 10) as f64) < self.d_reference(core)
                }
                2 => v[2].cost + l10(5.0) < self.d_reference(core),
                1 | 3 | 8 => true,
                _ => false,
            },
        }
    }

    fn is_available(&self, core: &SimCore, i: usize) -> bool {
        match i {
            2 | 3 => core.milestones[0] > 0,
            8 => core.milestones[2] > 0,
            _ => true,
        }
    }

    fn tot_mult(&self, core: &SimCore, rho: f64) -> f64 {
        (rho * 0.196 - l10(50.0)).max(0.0) + super::r9_multiplier(core.sigma)
    }

    fn milestone_priority(&self, core: &SimCore) -> &'static [usize] {
        match self.strat {
            Strat::Plain => {
                let count = (core.max_rho.max(core.last_pub) / 25.0).floor().min(6.0);
                if count >= 4.0 {
                    &[0, 3, 1, 2]
                } else {
                    &[1, 0, 3, 2]
                }
            }
            Strat::C3 => &[0],
            Strat::C4 => &[1, 0],
            Strat::C125 => &[0, 2, 3],
            Strat::C12 => &[0, 3],
            Strat::C5 | Strat::C5Coast | Strat::C5d | Strat::C5dCoast => &[0, 2],
            Strat::Snax | Strat::SnaxCoast | Strat::Ai | Strat::AiCoast => &[0, 3, 2],
        }
    }

    fn milestones_active(&self, core: &SimCore) -> bool {
        core.last_pub < 150.0
    }

    fn buy_policy(&self) -> BuyPolicy {
        if self.strat.is_ai() {
            BuyPolicy::Weighted
        } else {
            BuyPolicy::Priority
        }
    }

    fn variable_weights(&self, core: &SimCore) -> Option<Vec<f64>> {
        if !self.strat.is_ai() {
            return None;
        }
        let v = &core.variables;
        Some(vec![
            l10(7.0 + (v[0].level % 10) as f64),
            0.0,
            l10(5.0 + (v[2].level % 10) as f64),
            0.0,
            self.k.max(0.0) + l10(8.0 + (v[4].level % 10) as f64),
            self.k.max(0.0),
            f64::INFINITY,
            f64::INFINITY,
            -self.k.min(0.0),
        ])
    }

    fn on_purchase(&mut self, core: &mut SimCore, i: usize) {
        if (i == 0 || i == 2) && self.strat.is_coast() {
            let var = &core.variables[i];
            // Going above the baseline cap is counterproductive here.
            if var.should_buy() && var.coasting_cap_reached() && !var.above_original_cap() {
                core.variables[i].should_fork = true;
            }
        }
    }

    fn result_note(&self, core: &SimCore) -> String {
        let mut note = String::new();
        if self.strat.is_snax() {
            note.push_str(&format!(" {}", log_to_exp(self.stop_c12.recorded_rho, 1)));
        }
        if self.strat.is_coast() {
            note.push_str(&core.variables[0].cap_note(last_level("q1", &core.bought_vars)));
            note.push_str(&core.variables[2].cap_note(last_level("r1", &core.bought_vars)));
        }
        note
    }
}

fn build(data: &TheoryData) -> Result<Sim<T6>> {
    let strat = Strat::parse(&data.strat)?;
    let mut core = SimCore::new(data);
    core.pub_unlock = 12.0;
    core.milestone_unlock_steps = 25.0;
    // [r term, c4 term, c5 term, c1 exponent]
    core.milestones_max = vec![1, 1, 1, 3];
    core.variables = vec![
        Variable::new(
            "q1",
            CostModel::first_free(CostModel::exponential(15.0, 3.0)),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q2",
            CostModel::exponential(500.0, 100.0),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "r1",
            CostModel::exponential(1e25, 1e5),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "r2",
            CostModel::exponential(1e30, 1e10),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c1",
            CostModel::exponential(10.0, 2.0),
            ValueModel::stepwise(2.0, 10, 1.0),
        ),
        Variable::new(
            "c2",
            CostModel::exponential(100.0, 5.0),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c3",
            CostModel::exponential(1e7, 1.255),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "c4",
            CostModel::exponential(1e25, 5e5),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c5",
            CostModel::exponential(15.0, 3.9),
            ValueModel::exponential(2.0),
        ),
    ];
    Sim::assemble(
        core,
        T6 {
            strat,
            q: f64::NEG_INFINITY,
            r: 0.0,
            k: 0.0,
            stop_c12: StopC12 {
                recorded_rho: 0.0,
                high_k_ticks: 0,
                active: true,
            },
        },
    )
}

pub fn run(data: &TheoryData, ctx: &RunContext) -> Result<SimResult> {
    let strat = Strat::parse(&data.strat)?;
    if !strat.is_coast() {
        return build(data)?.run(ctx);
    }

    let mut base_data = data.clone();
    base_data.strat = strat.base().name().to_string();
    let baseline = build(&base_data)?.run(ctx)?;
    let last_q1 = last_level("q1", &baseline.bought_vars) as i64;
    let last_r1 = last_level("r1", &baseline.bought_vars) as i64;

    let mut sim = build(data)?;
    sim.core.variables[0].set_original_cap(last_q1);
    // The d/AI variants tolerate far less q1 slack than the idle ones.
    let q1_offset = if matches!(strat, Strat::C5dCoast | Strat::AiCoast) { 4 } else { 10 };
    sim.core.variables[0].configure_cap(q1_offset);
    sim.core.variables[2].set_original_cap(last_r1);
    sim.core.variables[2].configure_cap(1);
    sim.run(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancelFlag, Progress};
    use crate::settings::Settings;
    use crate::theory::TheoryId;

    fn data(strat: &str, rho: f64, cap: Option<f64>) -> TheoryData {
        TheoryData {
            theory: TheoryId::T6,
            sigma: 0,
            rho,
            strat: strat.to_string(),
            recovery: None,
            cap,
            settings: Settings::default(),
        }
    }

    fn ctx_run(strat: &str, cap: f64) -> SimResult {
        let cancel = CancelFlag::new();
        let progress = Progress::new();
        let ctx = RunContext::new(&cancel, &progress);
        run(&data(strat, 0.0, Some(cap)), &ctx).unwrap()
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Strat::parse("T6MS").is_err());
        for name in STRAT_NAMES {
            assert!(Strat::parse(name).is_ok());
        }
    }

    #[test]
    fn plain_run_reaches_cap() {
        let res = ctx_run("T6", 30.0);
        assert_eq!(res.strat, "T6");
        assert!(res.pub_rho >= 30.0);
        assert!(res.tau_h > 0.0);
    }

    /// The integral difference can only add currency, never remove it.
    #[test]
    fn rho_is_monotone() {
        let mut sim = build(&data("T6", 0.0, None)).unwrap();
        // Seed some levels so the growth terms are live.
        sim.core.variables[0].set_level(15);
        sim.core.variables[1].set_level(2);
        sim.core.variables[4].set_level(10);
        sim.core.variables[5].set_level(3);
        let mut prev = 0.0;
        for _ in 0..2000 {
            sim.model.tick(&mut sim.core);
            let now = sim.core.rho();
            assert!(now >= prev - 1e-9, "rho regressed: {prev} -> {now}");
            prev = now;
            sim.core.dt *= sim.core.ddt;
        }
        assert!(prev > 0.0);
    }

    /// Weighted AI policy runs end to end and buys across tiers.
    #[test]
    fn ai_run_buys_weighted() {
        let res = ctx_run("T6AI", 30.0);
        assert!(res.strat.starts_with("T6AI"));
        assert!(res.pub_rho >= 30.0);
        assert!(res.bought_vars.iter().any(|b| b.variable == "q1"));
        assert!(res.bought_vars.iter().any(|b| b.variable == "c1"));
    }

    #[test]
    fn milestone_priority_shifts_with_progress() {
        let mut sim = build(&data("T6", 0.0, None)).unwrap();
        assert_eq!(sim.model.milestone_priority(&sim.core), &[1, 0, 3, 2]);
        sim.core.max_rho = 120.0;
        assert_eq!(sim.model.milestone_priority(&sim.core), &[0, 3, 1, 2]);
    }
}
