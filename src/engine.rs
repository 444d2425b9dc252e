//! # Engine — Generic Publication-Cycle Simulation
//!
//! The engine advances one publication cycle tick by tick: theory math adds
//! to the currencies, peak tau/hour tracking finds the recommended
//! publication point, milestones re-allocate as progress grows, and the
//! purchase loop buys variable levels. Everything theory-specific lives
//! behind the [`TheoryModel`] trait; the engine owns only the shared
//! bookkeeping in [`SimCore`].
//!
//! ## Forking
//!
//! Coasting strategies explore "stop buying variable X at level L" branches.
//! When a purchase hook raises a variable's `should_fork` flag, the engine
//! clones the whole simulation, permanently stops that variable in the
//! clone, and runs the clone to completion; the best result seen across all
//! forks folds into the final answer. A depth counter bounds the recursion —
//! exceeding it is a hard error, not a truncated search.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::currency::Currency;
use crate::logspace::binary_insertion_search;
use crate::progress::RunContext;
use crate::result::{best_result, SimResult, VarBuy};
use crate::settings::Settings;
use crate::theory::TheoryId;
use crate::variable::Variable;

/// Hard bound on nested coasting forks. A well-formed strategy forks a
/// handful of times per cap; hitting this means a runaway search.
pub const MAX_FORK_DEPTH: u32 = 100;

/// Strict affordability, with one carve-out: a free level (`-inf` cost) is
/// always affordable, even against an empty balance. Theories whose rho
/// rate is gated on their first variable would otherwise never start.
#[inline]
fn affordable(cost: f64, balance: f64) -> bool {
    cost == f64::NEG_INFINITY || cost < balance
}

// ── Inputs ─────────────────────────────────────────────────────────

/// Starting state the driver hands a theory constructor.
#[derive(Debug, Clone)]
pub struct TheoryData {
    pub theory: TheoryId,
    pub sigma: u32,
    /// Previous publication rho, as log10.
    pub rho: f64,
    /// Strategy name; parsed and validated by the theory module.
    pub strat: String,
    pub recovery: Option<Recovery>,
    /// Hard rho cap; the sim publishes no later than this.
    pub cap: Option<f64>,
    pub settings: Settings,
}

/// Recovery bookkeeping for chained simulations: time spent re-reaching a
/// previously held rho does not count toward the publication time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Recovery {
    /// Rho (log10) below which progress counts as recovery.
    pub value: f64,
    /// Sim time at which recovery completed; updated while below `value`.
    pub time: f64,
    pub recovery_time: bool,
}

/// How the purchase loop picks what to buy each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyPolicy {
    /// Scan variables last-to-first, buying each as long as it is
    /// affordable and its gates pass.
    Priority,
    /// Repeatedly buy the variable minimizing cost + weight; requires the
    /// model to supply one weight per variable.
    Weighted,
}

// ── Theory plug-in surface ─────────────────────────────────────────

/// Theory-specific behavior plugged into the engine. `Clone` is required so
/// the fork search can branch a running simulation.
///
/// Only four methods are mandatory; the rest default to the behavior most
/// theories share.
pub trait TheoryModel: Clone {
    /// Strategy label shown in result rows.
    fn strat_label(&self) -> String;

    /// One tick of theory math: read `core.variables` and milestones, add
    /// rates into `core.currencies`.
    fn tick(&mut self, core: &mut SimCore);

    /// Strategy-specific purchase gate for variable `i`.
    fn buy_condition(&self, core: &SimCore, i: usize) -> bool;

    /// Publication multiplier (log10) the theory grants at `rho`.
    fn tot_mult(&self, core: &SimCore, rho: f64) -> f64;

    /// Milestone fill order, highest priority first.
    fn milestone_priority(&self, core: &SimCore) -> &'static [usize];

    /// Whether variable `i` is unlocked (usually a milestone gate).
    fn is_available(&self, _core: &SimCore, _i: usize) -> bool {
        true
    }

    /// Milestones stop changing once maxed; theories gate the per-tick
    /// re-allocation on their final unlock threshold.
    fn milestones_active(&self, _core: &SimCore) -> bool {
        true
    }

    fn buy_policy(&self) -> BuyPolicy {
        BuyPolicy::Priority
    }

    /// Per-variable weights for [`BuyPolicy::Weighted`].
    fn variable_weights(&self, _core: &SimCore) -> Option<Vec<f64>> {
        None
    }

    /// Hook run before the purchase loop each tick.
    fn before_purchases(&mut self, _core: &mut SimCore) {}

    /// Hook run after each single purchase of variable `i`; coasting
    /// strategies raise `should_fork` here.
    fn on_purchase(&mut self, core: &mut SimCore, i: usize) {
        let _ = core;
        let _ = i;
    }

    /// Hook run once per tick after at least one purchase happened.
    fn after_purchases(&mut self, _core: &mut SimCore) {}

    /// Extra conjunct of the forced-publication gate (beyond the recorded
    /// peak having passed `pub_unlock`).
    fn forced_pub(&self, _core: &SimCore) -> bool {
        true
    }

    /// Theory-specific publication condition, OR-ed with the universal cap
    /// and target checks.
    fn pub_condition(&self, _core: &SimCore) -> bool {
        false
    }

    /// Theory-specific end condition, OR-ed with the universal
    /// past-the-peak timeout.
    fn sim_end(&self, _core: &SimCore) -> bool {
        false
    }

    /// Whether end conditions may terminate the run at all; target-chasing
    /// strategies disable them and rely on `pub_condition`.
    fn check_sim_end(&self, _core: &SimCore) -> bool {
        true
    }

    /// Coasting gate: once false, the purchase loop is skipped entirely.
    fn buying_enabled(&self, _core: &SimCore) -> bool {
        true
    }

    /// Extra text appended to the strategy label in the result (coast
    /// levels, target thresholds).
    fn result_note(&self, _core: &SimCore) -> String {
        String::new()
    }
}

// ── Shared simulation state ────────────────────────────────────────

/// Theory-agnostic simulation state. Plain owned data: forking is a
/// `Clone`.
#[derive(Debug, Clone)]
pub struct SimCore {
    pub theory: TheoryId,
    pub sigma: u32,
    pub settings: Settings,
    pub tau_factor: f64,

    /// Peak rate has to pass this rho (log10) before end conditions engage.
    pub pub_unlock: f64,
    /// Hard rho cap (log10); `f64::INFINITY` when uncapped.
    pub cap: f64,
    /// Optional strategy-set target; reaching it is a publication condition.
    pub target_rho: Option<f64>,
    pub recovery: Recovery,

    /// Previous publication rho, as log10.
    pub last_pub: f64,
    /// Student count; feeds the R9 multiplier.
    pub cur_mult: f64,
    /// Publication multiplier (log10) locked in at the previous pub.
    pub tot_mult: f64,

    pub t: f64,
    pub dt: f64,
    pub ddt: f64,
    pub ticks: u64,

    /// `currencies[0]` is the main rho driving publication.
    pub currencies: Vec<Currency>,
    pub variables: Vec<Variable>,
    pub max_rho: f64,

    /// Current rate and its recorded peak.
    pub tau_h: f64,
    pub max_tau_h: f64,
    /// Sim time and rho at the recorded peak.
    pub pub_t: f64,
    pub pub_rho: f64,

    pub milestones: Vec<u32>,
    pub milestones_max: Vec<u32>,
    /// Progress per milestone point; `<= 0` means thresholds come from
    /// `milestone_unlocks` instead.
    pub milestone_unlock_steps: f64,
    pub milestone_unlocks: Vec<f64>,
    prev_milestone_count: Option<usize>,

    pub bought_vars: Vec<VarBuy>,
    /// Best result among completed forks; seeded with a neutral sentinel.
    best_fork: SimResult,
    depth: u32,
}

impl SimCore {
    pub fn new(data: &TheoryData) -> SimCore {
        let cap = match data.cap {
            Some(c) if c > 0.0 => c,
            _ => f64::INFINITY,
        };
        SimCore {
            theory: data.theory,
            sigma: data.sigma,
            settings: data.settings,
            tau_factor: data.theory.tau_factor(),
            pub_unlock: 0.0,
            cap,
            target_rho: None,
            recovery: data.recovery.unwrap_or_default(),
            last_pub: data.rho,
            cur_mult: 1.0,
            tot_mult: 0.0,
            t: 0.0,
            dt: data.settings.dt,
            ddt: data.settings.ddt,
            ticks: 0,
            currencies: vec![Currency::rho()],
            variables: Vec::new(),
            max_rho: 0.0,
            tau_h: 0.0,
            max_tau_h: 0.0,
            pub_t: 0.0,
            pub_rho: 0.0,
            milestones: Vec::new(),
            milestones_max: Vec::new(),
            milestone_unlock_steps: 0.0,
            milestone_unlocks: Vec::new(),
            prev_milestone_count: None,
            bought_vars: Vec::new(),
            best_fork: SimResult::placeholder(data.theory),
            depth: 0,
        }
    }

    /// Main rho balance (log10).
    pub fn rho(&self) -> f64 {
        self.currencies[0].value
    }

    /// Milestone points earned at current progress: either linear in rho
    /// (every `milestone_unlock_steps`) or counted against an explicit
    /// threshold table.
    pub fn milestone_count(&self) -> usize {
        let progress = self.max_rho.max(self.last_pub);
        if self.milestone_unlock_steps > 0.0 {
            (progress / self.milestone_unlock_steps).floor().max(0.0) as usize
        } else {
            binary_insertion_search(&self.milestone_unlocks, progress)
        }
    }
}

/// Distribute `count` milestone points across slots in priority order,
/// filling each slot to its max before moving on.
pub fn allocate_milestones(mut count: usize, max: &[u32], priority: &[usize]) -> Vec<u32> {
    let mut out = vec![0u32; max.len()];
    for &slot in priority {
        while out[slot] < max[slot] && count > 0 {
            out[slot] += 1;
            count -= 1;
        }
    }
    out
}

// ── The simulation proper ──────────────────────────────────────────

/// One publication-cycle simulation: shared core plus a theory model.
#[derive(Debug, Clone)]
pub struct Sim<M: TheoryModel> {
    pub core: SimCore,
    pub model: M,
}

impl<M: TheoryModel> Sim<M> {
    /// Assemble a simulation from a populated core and model. Locks in the
    /// starting publication multiplier, validates the purchase policy, and
    /// applies the initial milestone allocation.
    pub fn assemble(mut core: SimCore, model: M) -> Result<Sim<M>> {
        core.tot_mult = model.tot_mult(&core, core.last_pub);
        core.milestones = vec![0; core.milestones_max.len()];
        if model.buy_policy() == BuyPolicy::Weighted {
            match model.variable_weights(&core) {
                Some(w) if w.len() == core.variables.len() => {}
                Some(w) => bail!(
                    "weighted purchase policy: {} weights for {} variables",
                    w.len(),
                    core.variables.len()
                ),
                None => bail!("weighted purchase policy requires variable weights"),
            }
        }
        let mut sim = Sim { core, model };
        sim.update_milestones();
        Ok(sim)
    }

    /// Run to completion (or cancellation) and return the best result seen
    /// across this run and all of its forks.
    pub fn run(&mut self, ctx: &RunContext) -> Result<SimResult> {
        ctx.progress.start_sim();
        while !self.end_simulation() {
            if ctx.is_cancelled() {
                break;
            }
            self.model.tick(&mut self.core);
            self.update_status();
            if self.model.milestones_active(&self.core) {
                // Unconditional: swap strategies change priority over time
                // without the count changing.
                self.update_milestones();
            }
            self.model.before_purchases(&mut self.core);
            if self.model.buying_enabled(&self.core) {
                self.buy_variables()?;
            }
            self.run_pending_forks(ctx)?;
            ctx.progress.tick();
        }
        self.trim_bought_vars();
        let note = self.model.result_note(&self.core);
        let direct = self.create_result(&note);
        let best_fork = std::mem::replace(
            &mut self.core.best_fork,
            SimResult::placeholder(self.core.theory),
        );
        Ok(best_result(direct, best_fork))
    }

    // ── Status & end conditions ────────────────────────────────────

    /// Peak-rate bookkeeping, run once per tick after the theory math.
    ///
    /// The recorded publication point follows the current tick whenever the
    /// rate makes a new peak, the forced gate has not yet engaged, or a
    /// publication condition already holds; otherwise it stays pinned at
    /// the best peak seen.
    fn update_status(&mut self) {
        let rho = self.core.rho();
        if rho > self.core.max_rho {
            self.core.max_rho = rho;
        }
        self.core.t += self.core.dt / 1.5;
        self.core.dt *= self.core.ddt;
        if self.core.max_rho < self.core.recovery.value {
            self.core.recovery.time = self.core.t;
        }
        self.core.tau_h = self.core.tau_factor * (self.core.max_rho - self.core.last_pub)
            / (self.core.t / 3600.0);
        if self.core.max_tau_h < self.core.tau_h || !self.forced_pub() || self.pub_conditions() {
            self.core.max_tau_h = self.core.tau_h;
            self.core.pub_t = self.core.t;
            self.core.pub_rho = self.core.max_rho;
        }
        self.core.cur_mult =
            10f64.powf(self.model.tot_mult(&self.core, self.core.max_rho) - self.core.tot_mult);
        self.core.ticks += 1;
    }

    /// The recorded peak has passed the unlock threshold and the model's
    /// own forced gate holds.
    fn forced_pub(&self) -> bool {
        self.core.pub_rho >= self.core.pub_unlock && self.model.forced_pub(&self.core)
    }

    fn pub_conditions(&self) -> bool {
        self.core.max_rho >= self.core.cap
            || self
                .core
                .target_rho
                .is_some_and(|t| self.core.max_rho >= t)
            || self.model.pub_condition(&self.core)
    }

    fn sim_end_conditions(&self) -> bool {
        self.core.t > self.core.pub_t * 2.0 || self.model.sim_end(&self.core)
    }

    pub fn end_simulation(&self) -> bool {
        self.forced_pub()
            && (self.pub_conditions()
                || (self.model.check_sim_end(&self.core) && self.sim_end_conditions()))
    }

    // ── Milestones ─────────────────────────────────────────────────

    /// Unconditional re-allocation from the current milestone count.
    pub fn update_milestones(&mut self) {
        let count = self.core.milestone_count();
        let priority = self.model.milestone_priority(&self.core);
        self.core.prev_milestone_count = Some(count);
        self.core.milestones = allocate_milestones(count, &self.core.milestones_max, priority);
    }

    /// Re-allocate only when the count changed since the last allocation.
    /// Must be observationally identical to calling [`update_milestones`]
    /// every tick for count-driven priorities; time-driven priorities
    /// (milestone swapping) call `update_milestones` directly.
    pub fn update_milestones_if_changed(&mut self) {
        let count = self.core.milestone_count();
        if self.core.prev_milestone_count != Some(count) {
            self.update_milestones();
        }
    }

    // ── Purchases ──────────────────────────────────────────────────

    fn buy_variables(&mut self) -> Result<()> {
        match self.model.buy_policy() {
            BuyPolicy::Priority => {
                self.buy_priority();
                Ok(())
            }
            BuyPolicy::Weighted => self.buy_weighted(),
        }
    }

    /// Last-to-first scan; each variable is bought repeatedly while
    /// affordable and every gate passes.
    fn buy_priority(&mut self) {
        let mut bought = false;
        for i in (0..self.core.variables.len()).rev() {
            loop {
                let var = &self.core.variables[i];
                let cost = var.cost;
                let currency = var.currency;
                let purchasable = affordable(cost, self.core.currencies[currency].value)
                    && var.should_buy()
                    && self.model.is_available(&self.core, i)
                    && self.model.buy_condition(&self.core, i);
                if !purchasable {
                    break;
                }
                self.record_purchase(i);
                self.core.currencies[currency].subtract(cost);
                self.core.variables[i].buy();
                bought = true;
                self.model.on_purchase(&mut self.core, i);
            }
        }
        if bought {
            self.model.after_purchases(&mut self.core);
        }
    }

    /// Repeatedly buy the variable minimizing cost + weight. Ties go to the
    /// highest index; strategy buy conditions are not consulted — the
    /// weights are the policy. Spends the main rho only.
    fn buy_weighted(&mut self) -> Result<()> {
        let mut bought = false;
        loop {
            let weights = match self.model.variable_weights(&self.core) {
                Some(w) => w,
                None => bail!("weighted purchase policy requires variable weights"),
            };
            ensure!(
                weights.len() == self.core.variables.len(),
                "weighted purchase policy: {} weights for {} variables",
                weights.len(),
                self.core.variables.len()
            );
            let mut best: Option<(f64, usize)> = None;
            for i in (0..self.core.variables.len()).rev() {
                if !self.core.variables[i].should_buy()
                    || !self.model.is_available(&self.core, i)
                {
                    continue;
                }
                // An infinite weight forbids the variable outright; the
                // guard also keeps the -inf cost + inf weight NaN out.
                let metric = self.core.variables[i].cost + weights[i];
                if metric < f64::INFINITY && best.is_none_or(|(m, _)| metric < m) {
                    best = Some((metric, i));
                }
            }
            let Some((_, i)) = best else { break };
            let cost = self.core.variables[i].cost;
            if !affordable(cost, self.core.currencies[0].value) {
                break;
            }
            self.record_purchase(i);
            self.core.currencies[0].subtract(cost);
            self.core.variables[i].buy();
            bought = true;
            self.model.on_purchase(&mut self.core, i);
        }
        if bought {
            self.model.after_purchases(&mut self.core);
        }
        Ok(())
    }

    /// Record the purchase about to happen for the result's variable table,
    /// if it falls within the recording window below the previous pub.
    fn record_purchase(&mut self, i: usize) {
        if self.core.max_rho + self.core.settings.purchase_window > self.core.last_pub {
            let var = &self.core.variables[i];
            self.core.bought_vars.push(VarBuy {
                variable: var.name,
                level: var.level + 1,
                cost: var.cost,
                symbol: self.core.currencies[var.currency].symbol,
                timestamp: self.core.t,
            });
        }
    }

    // ── Forking ────────────────────────────────────────────────────

    /// Clone this simulation one level deeper.
    fn fork(&self) -> Result<Sim<M>> {
        if self.core.depth >= MAX_FORK_DEPTH {
            bail!(
                "coasting fork depth exceeded {MAX_FORK_DEPTH}; \
                 runaway fork search in strategy {}",
                self.model.strat_label()
            );
        }
        let mut fork = self.clone();
        fork.core.depth += 1;
        debug!(depth = fork.core.depth, "forked simulation");
        Ok(fork)
    }

    /// Consume `should_fork` flags raised during this tick's purchases:
    /// each flagged variable spawns a fork that permanently stops buying it
    /// and runs to completion. Later forks win rate ties over earlier ones.
    fn run_pending_forks(&mut self, ctx: &RunContext) -> Result<()> {
        for i in 0..self.core.variables.len() {
            if !self.core.variables[i].should_fork {
                continue;
            }
            self.core.variables[i].should_fork = false;
            if ctx.is_cancelled() {
                continue;
            }
            let mut forked = self.fork()?;
            forked.core.variables[i].stop_buying();
            let res = forked.run(ctx)?;
            let prev = std::mem::replace(
                &mut self.core.best_fork,
                SimResult::placeholder(self.core.theory),
            );
            self.core.best_fork = best_result(res, prev);
        }
        Ok(())
    }

    // ── Results ────────────────────────────────────────────────────

    /// Drop purchases recorded after the recommended publication point.
    fn trim_bought_vars(&mut self) {
        while self
            .core
            .bought_vars
            .last()
            .is_some_and(|b| b.timestamp > self.core.pub_t)
        {
            self.core.bought_vars.pop();
        }
    }

    fn create_result(&self, note: &str) -> SimResult {
        let core = &self.core;
        SimResult {
            theory: core.theory,
            sigma: core.sigma,
            last_pub: core.last_pub,
            pub_rho: core.pub_rho,
            delta_tau: (core.pub_rho - core.last_pub) * core.tau_factor,
            pub_multi: 10f64.powf(self.model.tot_mult(core, core.pub_rho) - core.tot_mult),
            strat: format!("{}{}", self.model.strat_label(), note),
            tau_h: core.max_tau_h,
            time: (core.pub_t - core.recovery.time).max(0.0),
            bought_vars: core.bought_vars.clone(),
        }
    }
}
