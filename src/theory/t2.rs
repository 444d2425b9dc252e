//! # T2 — Variational Mechanics
//!
//! Two chained derivative towers (`q1..q4`, `r1..r4`) feeding the rho rate.
//! The multiplier-chasing strategies stop buying tiers as the pending
//! publication multiplier grows; the Alt2/Alt3 variants first run a plain
//! multiplier-chasing pass to find the publication point, then re-run
//! chasing that exact target with different stop thresholds.

use anyhow::{bail, Result};

use crate::engine::{Sim, SimCore, TheoryData, TheoryModel};
use crate::logspace::add2;
use crate::progress::RunContext;
use crate::result::SimResult;
use crate::theory::l10;
use crate::variable::{CostModel, ValueModel, Variable};

pub(crate) const STRAT_NAMES: &[&str] =
    &["T2", "T2MC", "T2MCAlt", "T2MCAlt2", "T2MCAlt3", "T2MS", "T2QS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strat {
    Plain,
    Mc,
    McAlt,
    McAlt2,
    McAlt3,
    Ms,
    Qs,
}

impl Strat {
    fn parse(name: &str) -> Result<Strat> {
        Ok(match name {
            "T2" => Strat::Plain,
            "T2MC" => Strat::Mc,
            "T2MCAlt" => Strat::McAlt,
            "T2MCAlt2" => Strat::McAlt2,
            "T2MCAlt3" => Strat::McAlt3,
            "T2MS" => Strat::Ms,
            "T2QS" => Strat::Qs,
            _ => bail!("unknown T2 strategy {name:?}"),
        })
    }

    fn name(self) -> &'static str {
        match self {
            Strat::Plain => "T2",
            Strat::Mc => "T2MC",
            Strat::McAlt => "T2MCAlt",
            Strat::McAlt2 => "T2MCAlt2",
            Strat::McAlt3 => "T2MCAlt3",
            Strat::Ms => "T2MS",
            Strat::Qs => "T2QS",
        }
    }
}

/// Stop thresholds for the multiplier-chasing tiers, outermost (`q1`/`r1`)
/// to innermost (`q4`/`r4`).
#[derive(Debug, Clone, Copy)]
struct Stops {
    stop1: f64,
    stop2: f64,
    stop3: f64,
    stop4: f64,
}

#[derive(Debug, Clone)]
struct T2 {
    strat: Strat,
    q1: f64,
    q2: f64,
    q3: f64,
    q4: f64,
    r1: f64,
    r2: f64,
    r3: f64,
    r4: f64,
    stops: Stops,
}

impl T2 {
    fn tier_stop(&self, i: usize) -> f64 {
        match i % 4 {
            0 => self.stops.stop1,
            1 => self.stops.stop2,
            2 => self.stops.stop3,
            _ => self.stops.stop4,
        }
    }
}

impl TheoryModel for T2 {
    fn strat_label(&self) -> String {
        self.strat.name().to_string()
    }

    fn tick(&mut self, core: &mut SimCore) {
        let logdt = l10(core.dt);
        let v = &core.variables;
        let ms = &core.milestones;

        self.q1 = add2(self.q1, v[0].value + self.q2 + logdt);
        self.q2 = add2(self.q2, v[1].value + self.q3 + logdt);
        if ms[0] > 0 {
            self.q3 = add2(self.q3, v[2].value + self.q4 + logdt);
        }
        if ms[0] > 1 {
            self.q4 = add2(self.q4, v[3].value + logdt);
        }

        self.r1 = add2(self.r1, v[4].value + self.r2 + logdt);
        self.r2 = add2(self.r2, v[5].value + self.r3 + logdt);
        if ms[1] > 0 {
            self.r3 = add2(self.r3, v[6].value + self.r4 + logdt);
        }
        if ms[1] > 1 {
            self.r4 = add2(self.r4, v[7].value + logdt);
        }

        let rhodot = self.q1 * (1.0 + 0.05 * ms[2] as f64)
            + self.r1 * (1.0 + 0.05 * ms[3] as f64)
            + core.tot_mult
            + logdt;
        core.currencies[0].add(rhodot);
    }

    fn buy_condition(&self, core: &SimCore, i: usize) -> bool {
        match self.strat {
            Strat::Plain | Strat::Ms | Strat::Qs => true,
            Strat::Mc => {
                let stop = match i % 4 {
                    0 => 4650.0,
                    1 => 2900.0,
                    2 => 2250.0,
                    _ => 1150.0,
                };
                core.cur_mult < stop
            }
            Strat::McAlt | Strat::McAlt2 | Strat::McAlt3 => core.cur_mult < self.tier_stop(i),
        }
    }

    fn is_available(&self, core: &SimCore, i: usize) -> bool {
        match i {
            2 => core.milestones[0] > 0,
            3 => core.milestones[0] > 1,
            6 => core.milestones[1] > 0,
            7 => core.milestones[1] > 1,
            _ => true,
        }
    }

    fn tot_mult(&self, core: &SimCore, rho: f64) -> f64 {
        (rho * 0.198 - l10(100.0)).max(0.0) + super::r9_multiplier(core.sigma)
    }

    fn milestone_priority(&self, core: &SimCore) -> &'static [usize] {
        const TOWERS_FIRST: &[usize] = &[0, 1, 2, 3];
        const EXPONENTS_FIRST: &[usize] = &[2, 3, 0, 1];
        const R_FIRST: &[usize] = &[1, 0, 2, 3];
        match self.strat {
            // Milestone swapping on a 100-second cycle.
            Strat::Ms => {
                let tm100 = core.t % 100.0;
                if tm100 < 10.0 {
                    EXPONENTS_FIRST
                } else if tm100 < 50.0 {
                    TOWERS_FIRST
                } else if tm100 < 60.0 {
                    EXPONENTS_FIRST
                } else {
                    R_FIRST
                }
            }
            // Exponent swap once the pending multiplier passes the coast
            // threshold for this publication range.
            Strat::Qs => {
                let last_pub = core.last_pub;
                let coast_multi = if last_pub > 225.0 {
                    25.0
                } else if last_pub > 200.0 {
                    100.0
                } else if last_pub > 150.0 {
                    600.0
                } else if last_pub > 75.0 {
                    200.0
                } else if last_pub > 0.0 {
                    10.0
                } else {
                    f64::INFINITY
                };
                if core.cur_mult < coast_multi {
                    TOWERS_FIRST
                } else {
                    EXPONENTS_FIRST
                }
            }
            _ => TOWERS_FIRST,
        }
    }

    fn milestones_active(&self, core: &SimCore) -> bool {
        core.last_pub < 250.0
    }

    fn check_sim_end(&self, core: &SimCore) -> bool {
        core.target_rho.is_none()
    }

    fn result_note(&self, _core: &SimCore) -> String {
        if self.strat == Strat::McAlt3 {
            format!(
                " 4:{} 3:{} 2:{} 1:{}",
                self.stops.stop4, self.stops.stop3, self.stops.stop2, self.stops.stop1
            )
        } else {
            String::new()
        }
    }
}

fn build(data: &TheoryData, stops: Stops, target_rho: Option<f64>) -> Result<Sim<T2>> {
    let strat = Strat::parse(&data.strat)?;
    let mut core = SimCore::new(data);
    core.pub_unlock = 15.0;
    core.milestone_unlock_steps = 25.0;
    // [q tower depth, r tower depth, q1 exponent, r1 exponent]
    core.milestones_max = vec![2, 2, 3, 3];
    core.target_rho = target_rho;
    core.variables = vec![
        Variable::new(
            "q1",
            CostModel::first_free(CostModel::exponential(10.0, 2.0)),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q2",
            CostModel::exponential(5000.0, 2.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q3",
            CostModel::exponential(3e25, 3.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "q4",
            CostModel::exponential(8e50, 4.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "r1",
            CostModel::exponential(2e6, 2.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "r2",
            CostModel::exponential(3e9, 2.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "r3",
            CostModel::exponential(4e25, 3.0),
            ValueModel::stepwise_default(),
        ),
        Variable::new(
            "r4",
            CostModel::exponential(5e50, 4.0),
            ValueModel::stepwise_default(),
        ),
    ];
    Sim::assemble(
        core,
        T2 {
            strat,
            q1: f64::NEG_INFINITY,
            q2: 0.0,
            q3: 0.0,
            q4: 0.0,
            r1: 0.0,
            r2: 0.0,
            r3: 0.0,
            r4: 0.0,
            stops,
        },
    )
}

const DEFAULT_STOPS: Stops = Stops {
    stop1: 3500.0,
    stop2: 2700.0,
    stop3: 2050.0,
    stop4: 550.0,
};

pub fn run(data: &TheoryData, ctx: &RunContext) -> Result<SimResult> {
    let strat = Strat::parse(&data.strat)?;
    match strat {
        // Two-pass variants: find the T2MC publication point, then re-run
        // chasing it as an explicit target.
        Strat::McAlt2 | Strat::McAlt3 => {
            let mut probe = data.clone();
            probe.strat = Strat::Mc.name().to_string();
            let probe_res = build(&probe, DEFAULT_STOPS, None)?.run(ctx)?;

            let stops = if strat == Strat::McAlt3 {
                Stops {
                    stop1: 3700.0,
                    stop2: 2650.0,
                    stop3: 1700.0,
                    stop4: 750.0,
                }
            } else {
                DEFAULT_STOPS
            };
            build(data, stops, Some(probe_res.pub_rho))?.run(ctx)
        }
        _ => build(data, DEFAULT_STOPS, None)?.run(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancelFlag, Progress};
    use crate::settings::Settings;
    use crate::theory::TheoryId;

    fn data(strat: &str, rho: f64, cap: Option<f64>) -> TheoryData {
        TheoryData {
            theory: TheoryId::T2,
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
        assert!(Strat::parse("T2Coast").is_err());
        for name in STRAT_NAMES {
            assert!(Strat::parse(name).is_ok());
        }
    }

    #[test]
    fn plain_run_reaches_cap() {
        let cancel = CancelFlag::new();
        let progress = Progress::new();
        let ctx = RunContext::new(&cancel, &progress);
        let res = run(&data("T2", 0.0, Some(30.0)), &ctx).unwrap();
        assert_eq!(res.strat, "T2");
        assert!(res.pub_rho >= 30.0);
        assert!(res.tau_h > 0.0);
    }

    /// The deeper tower tiers unlock with the first milestone levels.
    #[test]
    fn tower_tiers_gate_on_milestones() {
        let mut sim = build(&data("T2", 0.0, None), DEFAULT_STOPS, None).unwrap();
        assert!(!sim.model.is_available(&sim.core, 2));
        assert!(!sim.model.is_available(&sim.core, 6));
        sim.core.max_rho = 100.0;
        sim.update_milestones();
        assert!(sim.model.is_available(&sim.core, 2));
        assert!(sim.model.is_available(&sim.core, 3));
    }

    /// Milestone swapping follows the 100-second cycle.
    #[test]
    fn swap_priority_follows_clock() {
        let mut sim = build(&data("T2MS", 0.0, None), DEFAULT_STOPS, None).unwrap();
        sim.core.t = 5.0;
        assert_eq!(sim.model.milestone_priority(&sim.core), &[2, 3, 0, 1]);
        sim.core.t = 30.0;
        assert_eq!(sim.model.milestone_priority(&sim.core), &[0, 1, 2, 3]);
        sim.core.t = 170.0;
        assert_eq!(sim.model.milestone_priority(&sim.core), &[1, 0, 2, 3]);
    }

    #[test]
    fn alt3_labels_stops() {
        let cancel = CancelFlag::new();
        let progress = Progress::new();
        let ctx = RunContext::new(&cancel, &progress);
        let res = run(&data("T2MCAlt3", 0.0, Some(30.0)), &ctx).unwrap();
        assert!(res.strat.starts_with("T2MCAlt3"));
        assert!(res.strat.contains("4:750"));
    }
}
