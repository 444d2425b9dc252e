//! # T1 — Recurrence Relations
//!
//! Four-term additive recurrence. The later strategies ratio-gate the cheap
//! variables against the dominant `c3`/`c4` terms, and the SolarXLII routine
//! chases the `c4` cost table: it publishes inside a fixed window past the
//! next `c4` threshold and stops buying entirely near the end of the cycle.

use anyhow::{bail, Result};

use crate::engine::{Sim, SimCore, TheoryData, TheoryModel};
use crate::format::log_to_exp;
use crate::logspace::add2;
use crate::progress::RunContext;
use crate::result::{last_level, SimResult};
use crate::theory::l10;
use crate::variable::{CostModel, ValueModel, Variable};

pub(crate) const STRAT_NAMES: &[&str] = &[
    "T1",
    "T1Coast",
    "T1C34",
    "T1C34Coast",
    "T1C4",
    "T1C4Coast",
    "T1Ratio",
    "T1RatioCoast",
    "T1SolarXLII",
    "T1SolarXLIICoast",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strat {
    Plain,
    Coast,
    C34,
    C34Coast,
    C4,
    C4Coast,
    Ratio,
    RatioCoast,
    Solar,
    SolarCoast,
}

impl Strat {
    fn parse(name: &str) -> Result<Strat> {
        Ok(match name {
            "T1" => Strat::Plain,
            "T1Coast" => Strat::Coast,
            "T1C34" => Strat::C34,
            "T1C34Coast" => Strat::C34Coast,
            "T1C4" => Strat::C4,
            "T1C4Coast" => Strat::C4Coast,
            "T1Ratio" => Strat::Ratio,
            "T1RatioCoast" => Strat::RatioCoast,
            "T1SolarXLII" => Strat::Solar,
            "T1SolarXLIICoast" => Strat::SolarCoast,
            _ => bail!("unknown T1 strategy {name:?}"),
        })
    }

    fn name(self) -> &'static str {
        match self {
            Strat::Plain => "T1",
            Strat::Coast => "T1Coast",
            Strat::C34 => "T1C34",
            Strat::C34Coast => "T1C34Coast",
            Strat::C4 => "T1C4",
            Strat::C4Coast => "T1C4Coast",
            Strat::Ratio => "T1Ratio",
            Strat::RatioCoast => "T1RatioCoast",
            Strat::Solar => "T1SolarXLII",
            Strat::SolarCoast => "T1SolarXLIICoast",
        }
    }

    fn is_coast(self) -> bool {
        matches!(
            self,
            Strat::Coast | Strat::C34Coast | Strat::C4Coast | Strat::RatioCoast | Strat::SolarCoast
        )
    }

    fn is_solar(self) -> bool {
        matches!(self, Strat::Solar | Strat::SolarCoast)
    }

    /// The same strategy without the coasting pass.
    fn base(self) -> Strat {
        match self {
            Strat::Coast => Strat::Plain,
            Strat::C34Coast => Strat::C34,
            Strat::C4Coast => Strat::C4,
            Strat::RatioCoast => Strat::Ratio,
            Strat::SolarCoast => Strat::Solar,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
struct T1 {
    strat: Strat,
    term1: f64,
    term2: f64,
    term3: f64,
    /// Ratio gate between the power terms and the additive terms; refreshed
    /// after every purchase.
    term_ratio: f64,
    c3_ratio: f64,
    /// Solar: rho at which buying stops for the rest of the cycle.
    coast: f64,
}

impl TheoryModel for T1 {
    fn strat_label(&self) -> String {
        self.strat.name().to_string()
    }

    fn tick(&mut self, core: &mut SimCore) {
        let rho = core.rho();
        let v = &core.variables;
        let ms = &core.milestones;
        self.term1 = v[2].value * (1.0 + 0.05 * ms[1] as f64)
            + v[3].value
            + if ms[0] > 0 {
                l10(1.0 + rho.max(0.0) / std::f64::consts::LOG10_E / 100.0)
            } else {
                0.0
            };
        self.term2 = add2(v[4].value + rho * 0.2, v[5].value + rho * 0.3);
        self.term3 = v[0].value + v[1].value;

        let rhodot = add2(self.term1, self.term2) + self.term3 + core.tot_mult + l10(core.dt);
        core.currencies[0].add(rhodot);
    }

    fn buy_condition(&self, core: &SimCore, i: usize) -> bool {
        let v = &core.variables;
        let rho = core.rho();
        match self.strat {
            Strat::Plain | Strat::Coast => true,
            Strat::C34 | Strat::C34Coast => !matches!(i, 2 | 3),
            Strat::C4 | Strat::C4Coast => !matches!(i, 2 | 3 | 4),
            Strat::Ratio | Strat::RatioCoast => match i {
                0 => v[0].cost + 1.0 < rho,
                1 => v[1].cost + l10(1.11) < rho,
                2 => v[2].cost + self.term_ratio + 1.0 <= rho,
                3 => v[3].cost + self.term_ratio <= rho,
                4 => v[4].cost + l10(self.c3_ratio) < rho,
                _ => true,
            },
            Strat::Solar | Strat::SolarCoast => match i {
                0 => {
                    let step = (v[0].level % 10) as f64;
                    v[0].cost + l10(5.0) <= rho
                        && v[0].cost + l10(6.0 + step) <= v[1].cost
                        && v[0].cost + l10(15.0 + step)
                            < if core.milestones[3] > 0 { v[5].cost } else { 1000.0 }
                }
                1 => v[1].cost + l10(1.11) < rho,
                2 => v[2].cost + self.term_ratio + 1.0 <= rho,
                3 => v[3].cost + self.term_ratio <= rho,
                4 => v[4].cost + l10(self.c3_ratio) < rho,
                _ => true,
            },
        }
    }

    fn is_available(&self, core: &SimCore, i: usize) -> bool {
        match i {
            4 => core.milestones[2] > 0,
            5 => core.milestones[3] > 0,
            _ => true,
        }
    }

    fn tot_mult(&self, core: &SimCore, rho: f64) -> f64 {
        (rho * 0.164 - l10(3.0)).max(0.0) + super::r9_multiplier(core.sigma)
    }

    fn milestone_priority(&self, _core: &SimCore) -> &'static [usize] {
        &[2, 3, 0, 1]
    }

    fn milestones_active(&self, core: &SimCore) -> bool {
        core.last_pub < 176.0
    }

    fn buying_enabled(&self, core: &SimCore) -> bool {
        !self.strat.is_solar() || core.rho() < self.coast
    }

    fn on_purchase(&mut self, core: &mut SimCore, i: usize) {
        if (i == 0 || i == 4) && self.strat.is_coast() {
            let var = &core.variables[i];
            // One more level past the baseline cap is counterproductive here.
            if var.should_buy() && var.coasting_cap_reached() && !var.above_original_cap() {
                core.variables[i].should_fork = true;
            }
        }
    }

    fn after_purchases(&mut self, core: &mut SimCore) {
        self.term_ratio = if core.last_pub < 350.0 {
            let gated = if core.milestones[3] > 0 { 1.0 } else { 0.0 };
            l10(5.0).max((self.term2 - self.term1) * gated)
        } else {
            f64::INFINITY
        };
    }

    fn check_sim_end(&self, _core: &SimCore) -> bool {
        !self.strat.is_solar()
    }

    fn result_note(&self, core: &SimCore) -> String {
        let mut note = String::new();
        if self.strat.is_solar() {
            if core.last_pub < 50.0 {
                note.push(' ');
            } else {
                note.push_str(&format!(
                    " {}",
                    log_to_exp(core.pub_rho.min(self.coast), 2)
                ));
            }
        }
        if self.strat.is_coast() {
            note.push_str(&core.variables[0].cap_note(last_level("q1", &core.bought_vars)));
            if core.variables[4].level != 0 {
                note.push_str(&core.variables[4].cap_note(last_level("c3", &core.bought_vars)));
            }
        }
        note
    }
}

fn build(data: &TheoryData) -> Result<Sim<T1>> {
    let strat = Strat::parse(&data.strat)?;
    let mut core = SimCore::new(data);
    core.pub_unlock = 10.0;
    core.milestone_unlock_steps = 25.0;
    // [log term, c1 exponent, c3 term, c4 term]
    core.milestones_max = vec![1, 3, 1, 1];
    core.variables = vec![
        Variable::new(
            "q1",
            CostModel::first_free(CostModel::exponential(5.0, 2.0)),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q2",
            CostModel::exponential(100.0, 10.0),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c1",
            CostModel::exponential(15.0, 2.0),
            ValueModel::stepwise(2.0, 10, 1.0),
        ),
        Variable::new(
            "c2",
            CostModel::exponential(3000.0, 10.0),
            ValueModel::exponential(2.0),
        ),
        Variable::new(
            "c3",
            CostModel::exponential_log2(1e4, 4.5 * std::f64::consts::LOG2_10),
            ValueModel::exponential(10.0),
        ),
        Variable::new(
            "c4",
            CostModel::exponential_log2(1e10, 8.0 * std::f64::consts::LOG2_10),
            ValueModel::exponential(10.0),
        ),
    ];

    // Solar window: the next c4 purchase sits every 8 orders of magnitude;
    // the publication target and buy-stop point derive from the distance to
    // that threshold.
    let last_pub = core.last_pub;
    let c4_next = ((last_pub - 10.0) / 8.0).ceil() * 8.0 + 10.0;
    let pub_target = if c4_next - last_pub < 3.0 {
        c4_next + 2.0
    } else if c4_next - last_pub < 5.0 {
        c4_next - 2.0 + l10(1.5)
    } else {
        c4_next - 4.0 + l10(1.4)
    };
    let mut coast = if c4_next - last_pub < 3.0 {
        c4_next
    } else {
        last_pub.floor()
    } + l10(30.0);
    coast = (8.0 + l10(30.0)).max(coast + (pub_target - coast).floor());
    if strat.is_solar() {
        core.target_rho = Some(pub_target);
    }

    let c3_ratio = if last_pub < 300.0 {
        1.0
    } else if last_pub < 450.0 {
        1.1
    } else if last_pub < 550.0 {
        2.0
    } else if last_pub < 655.0 {
        5.0
    } else {
        10.0
    };

    Sim::assemble(
        core,
        T1 {
            strat,
            term1: 0.0,
            term2: 0.0,
            term3: 0.0,
            term_ratio: 0.0,
            c3_ratio,
            coast,
        },
    )
}

pub fn run(data: &TheoryData, ctx: &RunContext) -> Result<SimResult> {
    let strat = Strat::parse(&data.strat)?;
    if !strat.is_coast() {
        return build(data)?.run(ctx);
    }

    // Coasting pass: baseline run without caps, then replay with q1/c3
    // capped at their observed final levels so the fork search can probe
    // stopping early.
    let mut base_data = data.clone();
    base_data.strat = strat.base().name().to_string();
    let baseline = build(&base_data)?.run(ctx)?;
    let last_q1 = last_level("q1", &baseline.bought_vars) as i64;
    let last_c3 = last_level("c3", &baseline.bought_vars) as i64;

    let mut sim = build(data)?;
    let q1_cap = if matches!(strat, Strat::Coast | Strat::C34Coast | Strat::C4Coast) {
        // Skipping the last two q1 levels gives a better next cycle.
        last_q1 - 2
    } else {
        last_q1
    };
    sim.core.variables[0].set_original_cap(q1_cap);
    sim.core.variables[0].configure_cap(18);
    sim.core.variables[4].set_original_cap(last_c3);
    sim.core.variables[4].configure_cap(3);
    sim.run(ctx)
}
