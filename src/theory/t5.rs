//! # T5 — Logistic Growth
//!
//! The driver `q` follows a logistic differential equation capped by
//! `c2 * c3`; it is advanced with the closed-form solution rather than an
//! Euler step, so the tick length never overshoots the cap. The idle
//! strategies only buy `c2` while the solved `q` says the raised cap is
//! worth the level (`c2worth`), re-evaluated after every `c2` purchase.

use anyhow::{bail, Result};

use crate::engine::{Sim, SimCore, TheoryData, TheoryModel};
use crate::format::log_to_exp;
use crate::logspace::subtract;
use crate::progress::RunContext;
use crate::result::{last_level, SimResult};
use crate::theory::l10;
use crate::variable::{CostModel, ValueModel, Variable};

pub(crate) const STRAT_NAMES: &[&str] = &["T5", "T5Idle", "T5IdleCoast", "T5AI2", "T5AI2Coast"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strat {
    Plain,
    Idle,
    IdleCoast,
    Ai2,
    Ai2Coast,
}

impl Strat {
    fn parse(name: &str) -> Result<Strat> {
        Ok(match name {
            "T5" => Strat::Plain,
            "T5Idle" => Strat::Idle,
            "T5IdleCoast" => Strat::IdleCoast,
            "T5AI2" => Strat::Ai2,
            "T5AI2Coast" => Strat::Ai2Coast,
            _ => bail!("unknown T5 strategy {name:?}"),
        })
    }

    fn name(self) -> &'static str {
        match self {
            Strat::Plain => "T5",
            Strat::Idle => "T5Idle",
            Strat::IdleCoast => "T5IdleCoast",
            Strat::Ai2 => "T5AI2",
            Strat::Ai2Coast => "T5AI2Coast",
        }
    }

    fn is_coast(self) -> bool {
        matches!(self, Strat::IdleCoast | Strat::Ai2Coast)
    }

    fn is_idle(self) -> bool {
        matches!(self, Strat::Idle | Strat::IdleCoast)
    }

    fn base(self) -> Strat {
        match self {
            Strat::IdleCoast => Strat::Idle,
            Strat::Ai2Coast => Strat::Ai2,
            other => other,
        }
    }
}

const L10_2_3: f64 = -0.17609125905568124; // log10(2/3)
const L10_2: f64 = 0.3010299956639812;
const L10_1_5: f64 = 0.17609125905568124;

#[derive(Debug, Clone)]
struct T5 {
    strat: Strat,
    /// Solved logistic driver, as log10.
    q: f64,
    /// Whether the next c2 level raises q fast enough to pay for itself.
    c2worth: bool,
    /// c2 purchases within the current tick; shifts the re-evaluation.
    c2_counter: u32,
    /// Effective c3 term cached by the last tick.
    nc3: f64,
}

impl T5 {
    /// Advance `q` by one tick of the logistic closed form with coefficients
    /// `ic1` (growth), `ic2` (c2 value) and `ic3` (effective c3 term).
    fn calculate_q(&self, core: &SimCore, ic1: f64, ic2: f64, ic3: f64) -> f64 {
        let qcap = ic2 + ic3;
        let gamma = 10f64.powf(ic1 + ic3 - ic2);
        let adjust = self.q - subtract(qcap, self.q);
        let sigma = 10f64.powf(adjust + gamma * core.dt * std::f64::consts::LOG10_E);
        let newq = if sigma < 1e-30 {
            // q far below the cap: exponential regime.
            qcap + adjust + gamma * core.dt * std::f64::consts::LOG10_E
        } else {
            qcap - l10(1.0 + 1.0 / sigma)
        };
        newq.min(qcap)
    }

    fn effective_c3(&self, core: &SimCore) -> f64 {
        if core.milestones[1] > 0 {
            core.variables[4].value * (1.0 + 0.05 * core.milestones[2] as f64)
        } else {
            0.0
        }
    }
}

impl TheoryModel for T5 {
    fn strat_label(&self) -> String {
        self.strat.name().to_string()
    }

    fn tick(&mut self, core: &mut SimCore) {
        let vq1 = core.variables[0].value * (1.0 + 0.05 * core.milestones[0] as f64);
        let vc3 = self.effective_c3(core);
        let (c1, c2) = (core.variables[2].value, core.variables[3].value);

        self.q = self.calculate_q(core, c1, c2, vc3);
        let rhodot = vq1 + core.variables[1].value + self.q;
        core.currencies[0].add(rhodot + core.tot_mult + l10(core.dt));

        self.nc3 = vc3;
        let iq = self.calculate_q(core, c1, c2, vc3);
        self.c2worth = iq >= c2 + self.nc3 + L10_2_3;
    }

    fn buy_condition(&self, core: &SimCore, i: usize) -> bool {
        let v = &core.variables;
        match self.strat {
            Strat::Plain => true,
            Strat::Idle | Strat::IdleCoast => match i {
                2 => core.max_rho + (core.last_pub - 200.0) / 165.0 < core.last_pub,
                3 => self.c2worth,
                _ => true,
            },
            Strat::Ai2 | Strat::Ai2Coast => match i {
                0 => {
                    let c3_cost = if core.milestones[2] > 0 { v[4].cost } else { 1000.0 };
                    v[0].cost + l10(3.0 + (v[0].level % 10) as f64)
                        <= v[1].cost.min(v[3].cost).min(c3_cost)
                }
                2 => {
                    let c3_term =
                        v[4].value * (1.0 + 0.05 * core.milestones[2] as f64);
                    self.q + L10_1_5 < v[3].value + c3_term || !self.c2worth
                }
                3 => self.c2worth,
                _ => true,
            },
        }
    }

    fn is_available(&self, core: &SimCore, i: usize) -> bool {
        i != 4 || core.milestones[1] > 0
    }

    fn tot_mult(&self, core: &SimCore, rho: f64) -> f64 {
        (rho * 0.159).max(0.0) + super::r9_multiplier(core.sigma)
    }

    fn milestone_priority(&self, _core: &SimCore) -> &'static [usize] {
        &[1, 0, 2]
    }

    fn milestones_active(&self, core: &SimCore) -> bool {
        core.last_pub < 150.0
    }

    fn before_purchases(&mut self, _core: &mut SimCore) {
        self.c2_counter = 0;
    }

    fn on_purchase(&mut self, core: &mut SimCore, i: usize) {
        if i == 3 {
            self.c2_counter += 1;
            let extra = L10_2 * self.c2_counter as f64;
            let (c1, c2) = (core.variables[2].value, core.variables[3].value);
            let iq = self.calculate_q(core, c1, c2 + extra, self.nc3);
            let c3_term =
                core.variables[4].value * (1.0 + 0.05 * core.milestones[2] as f64);
            self.c2worth = iq >= c2 + extra + c3_term + L10_2_3;
        }
        if i == 0 && self.strat.is_coast() {
            let var = &core.variables[0];
            if var.should_buy() && var.coasting_cap_reached() {
                core.variables[0].should_fork = true;
            }
        }
    }

    fn result_note(&self, core: &SimCore) -> String {
        let mut note = String::new();
        if self.strat.is_idle() {
            note.push_str(&format!(" {}", log_to_exp(core.variables[2].cost, 1)));
        }
        if self.strat.is_coast() {
            note.push_str(&core.variables[0].cap_note(last_level("q1", &core.bought_vars)));
        }
        note
    }
}

fn build(data: &TheoryData) -> Result<Sim<T5>> {
    let strat = Strat::parse(&data.strat)?;
    let mut core = SimCore::new(data);
    core.pub_unlock = 7.0;
    core.milestone_unlock_steps = 25.0;
    // [q1 exponent, c3 term, c3 exponent]
    core.milestones_max = vec![3, 1, 2];
    core.variables = vec![
        Variable::new(
            "q1",
            CostModel::first_free(CostModel::exponential(10.0, 1.61328)),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q2",
            CostModel::exponential(15.0, 64.0),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c1",
            CostModel::exponential(1e6, 1.18099),
            ValueModel::stepwise(2.0, 10, 1.0),
        ),
        Variable::new(
            "c2",
            CostModel::exponential(75.0, 4.53725),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c3",
            CostModel::exponential(1e3, 8.85507e7),
            ValueModel::exponential(2.0),
        ),
    ];
    Sim::assemble(
        core,
        T5 {
            strat,
            q: 0.0,
            c2worth: true,
            c2_counter: 0,
            nc3: 0.0,
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

    let mut sim = build(data)?;
    sim.core.variables[0].set_original_cap(last_q1);
    sim.core.variables[0].configure_cap(13);
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
            theory: TheoryId::T5,
            sigma: 0,
            rho,
            strat: strat.to_string(),
            recovery: None,
            cap,
            settings: Settings::default(),
        }
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Strat::parse("T5Coast").is_err());
        for name in STRAT_NAMES {
            assert!(Strat::parse(name).is_ok());
        }
    }

    #[test]
    fn plain_run_reaches_cap() {
        let cancel = CancelFlag::new();
        let progress = Progress::new();
        let ctx = RunContext::new(&cancel, &progress);
        let res = run(&data("T5", 0.0, Some(25.0)), &ctx).unwrap();
        assert_eq!(res.strat, "T5");
        assert!(res.pub_rho >= 25.0);
        assert!(res.tau_h > 0.0);
    }

    /// The logistic solution never exceeds its cap, regardless of tick
    /// length.
    #[test]
    fn solved_q_respects_cap() {
        let sim = build(&data("T5", 0.0, None)).unwrap();
        let mut model = sim.model.clone();
        let mut core = sim.core.clone();
        core.dt = 1e6;
        model.q = -10.0;
        for _ in 0..50 {
            model.q = model.calculate_q(&core, 2.0, 5.0, 3.0);
            assert!(model.q <= 5.0 + 3.0 + 1e-12);
        }
    }

    #[test]
    fn idle_label_carries_c1_cost() {
        let cancel = CancelFlag::new();
        let progress = Progress::new();
        let ctx = RunContext::new(&cancel, &progress);
        let res = run(&data("T5Idle", 0.0, Some(25.0)), &ctx).unwrap();
        assert!(res.strat.starts_with("T5Idle "));
    }
}
