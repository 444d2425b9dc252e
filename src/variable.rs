//! # Variable — Purchasable Upgrades with Cost and Value Curves
//!
//! A `Variable` is one purchasable upgrade: a strictly increasing cost curve
//! over its level, a value-contribution curve, and the mutable level. Cost
//! and value are cached in log space and updated incrementally on purchase,
//! so the hot purchase loop never re-derives a curve from scratch.
//!
//! ## Soft caps
//!
//! The coasting search (see `engine`) replays a publication while capping a
//! variable at the best level observed in a baseline run. A capped variable
//! reports `should_buy() == false` once the cap is reached; the level at
//! which the cap was hit is observable through `coasting_cap_reached`, which
//! theory hooks use to raise the `should_fork` flag and spawn a fork that
//! coasts from exactly that level.
//!
//! Cost and value curves are closed enums rather than trait objects: every
//! variable is plain owned data, so forking a simulation is a `Clone`.

use crate::logspace::{add2, subtract};

/// Cost of owning the next level, as a `log10` magnitude.
#[derive(Debug, Clone)]
pub enum CostModel {
    /// `base * ratio^level`. Stored in log space.
    Exponential { base: f64, step: f64 },
    /// Level 0 is free; every later level follows the inner curve shifted
    /// down by one.
    FirstFree(Box<CostModel>),
    /// Inner curve advanced once per `step` levels.
    Stepwise { inner: Box<CostModel>, step: u32 },
    /// Explicit per-level log costs; the last entry repeats past the end.
    Table(Vec<f64>),
}

impl CostModel {
    /// Exponential curve from linear-scale base and ratio, e.g. `(5.0, 2.0)`
    /// for 5, 10, 20, 40, ...
    pub fn exponential(base: f64, ratio: f64) -> Self {
        CostModel::Exponential {
            base: base.log10(),
            step: ratio.log10(),
        }
    }

    /// Exponential curve whose ratio is given as a power of two, e.g.
    /// `(1e4, 4.5 * log2(10))` for a ratio of `2^(4.5*log2(10))`.
    pub fn exponential_log2(base: f64, log2_ratio: f64) -> Self {
        CostModel::Exponential {
            base: base.log10(),
            step: log2_ratio * 2f64.log10(),
        }
    }

    pub fn first_free(inner: CostModel) -> Self {
        CostModel::FirstFree(Box::new(inner))
    }

    pub fn stepwise(inner: CostModel, step: u32) -> Self {
        CostModel::Stepwise {
            inner: Box::new(inner),
            step,
        }
    }

    /// Cost of purchasing `level` (0-based), as log10.
    pub fn cost(&self, level: u32) -> f64 {
        match self {
            CostModel::Exponential { base, step } => base + step * level as f64,
            CostModel::FirstFree(inner) => {
                if level == 0 {
                    f64::NEG_INFINITY
                } else {
                    inner.cost(level - 1)
                }
            }
            CostModel::Stepwise { inner, step } => inner.cost(level / step),
            CostModel::Table(costs) => match costs.get(level as usize) {
                Some(&c) => c,
                None => *costs.last().unwrap_or(&f64::INFINITY),
            },
        }
    }

    /// Total cost of the half-open level range `[from, to)`, as log10.
    /// Cap-search callers use this to ask "how many levels fit under X".
    pub fn cumulative(&self, from: u32, to: u32) -> f64 {
        (from..to).fold(f64::NEG_INFINITY, |acc, l| add2(acc, self.cost(l)))
    }
}

/// Value contributed by owning `level` levels, as a `log10` magnitude.
#[derive(Debug, Clone, Copy)]
pub enum ValueModel {
    /// `base^level`.
    Exponential { base: f64 },
    /// Partial sums of `base^(k/length)` plus a constant offset: every
    /// `length` levels the per-level contribution steps up by `base`.
    StepwisePowerSum { base: f64, length: u32, offset: f64 },
    /// `offset + slope * level` in linear scale.
    Linear { slope: f64, offset: f64 },
}

impl ValueModel {
    pub fn exponential(base: f64) -> Self {
        ValueModel::Exponential { base: base.log10() }
    }

    /// The default stepwise sum (base 2, length 10, no offset) used by most
    /// `q1`-style variables.
    pub fn stepwise_default() -> Self {
        ValueModel::StepwisePowerSum {
            base: 2.0,
            length: 10,
            offset: 0.0,
        }
    }

    pub fn stepwise(base: f64, length: u32, offset: f64) -> Self {
        ValueModel::StepwisePowerSum { base, length, offset }
    }

    pub fn linear(slope: f64, offset: f64) -> Self {
        ValueModel::Linear { slope, offset }
    }

    /// Value at `level`, computed from scratch.
    pub fn value_at(&self, level: u32) -> f64 {
        match *self {
            ValueModel::Exponential { base } => base * level as f64,
            ValueModel::StepwisePowerSum { base, length, offset } => {
                // Closed form of sum_{k<level} base^(k/length):
                // (d + mod) * base^int - d, with d = length/(base-1).
                let int = (level / length) as f64;
                let rem = (level % length) as f64;
                let d = length as f64 / (base - 1.0);
                let big = (d + rem).log10() + int * base.log10();
                let rest = d - offset;
                if rest > 0.0 {
                    subtract(big, rest.log10())
                } else if rest < 0.0 {
                    add2(big, (-rest).log10())
                } else {
                    big
                }
            }
            ValueModel::Linear { slope, offset } => (offset + slope * level as f64).log10(),
        }
    }

    /// Value after buying one level on top of `current_level`, given the
    /// cached value for `current_level`. Must agree with `value_at`.
    pub fn next(&self, old_value: f64, current_level: u32) -> f64 {
        match *self {
            ValueModel::Exponential { base } => old_value + base,
            ValueModel::StepwisePowerSum { base, length, .. } => {
                add2(old_value, (current_level / length) as f64 * base.log10())
            }
            ValueModel::Linear { slope, .. } => add2(old_value, slope.log10()),
        }
    }
}

/// One purchasable upgrade owned by a simulation.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: &'static str,
    pub level: u32,
    /// Cached cost of the next level (log10).
    pub cost: f64,
    /// Cached value contribution at the current level (log10).
    pub value: f64,
    /// Index into the simulation's currency list; 0 is the main rho.
    pub currency: usize,
    /// Set by theory purchase hooks when this variable should trigger a
    /// coasting fork; consumed by the engine once per tick.
    pub should_fork: bool,
    cost_model: CostModel,
    value_model: ValueModel,
    original_cap: Option<i64>,
    cap_offset: i64,
    stopped: bool,
}

impl Variable {
    pub fn new(name: &'static str, cost_model: CostModel, value_model: ValueModel) -> Self {
        let mut var = Variable {
            name,
            level: 0,
            cost: 0.0,
            value: 0.0,
            currency: 0,
            should_fork: false,
            cost_model,
            value_model,
            original_cap: None,
            cap_offset: 0,
            stopped: false,
        };
        var.recompute();
        var
    }

    /// Bind this variable to an auxiliary currency instead of the main rho.
    pub fn with_currency(mut self, currency: usize) -> Self {
        self.currency = currency;
        self
    }

    /// Refresh cached cost and value from the current level.
    pub fn recompute(&mut self) {
        self.cost = self.cost_model.cost(self.level);
        self.value = self.value_model.value_at(self.level);
    }

    /// Purchase exactly one level. The caller has already checked
    /// affordability and gating and deducted the cost.
    pub fn buy(&mut self) {
        self.value = self.value_model.next(self.value, self.level);
        self.level += 1;
        self.cost = self.cost_model.cost(self.level);
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level;
        self.recompute();
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    // ── Soft-cap state ─────────────────────────────────────────────

    /// Record the best level this variable reached in a baseline run.
    pub fn set_original_cap(&mut self, cap: i64) {
        self.original_cap = Some(cap);
    }

    /// Allow `offset` extra levels beyond the original cap before the
    /// variable stops being purchasable.
    pub fn configure_cap(&mut self, offset: i64) {
        self.cap_offset = offset;
    }

    /// Permanently stop purchases; applied to the flagged variable of a
    /// freshly forked simulation so the fork coasts from the fork point.
    pub fn stop_buying(&mut self) {
        self.stopped = true;
    }

    /// Whether the purchase loop may still buy this variable. False once
    /// buying was stopped or the soft cap (original cap + offset) is hit.
    pub fn should_buy(&self) -> bool {
        if self.stopped {
            return false;
        }
        match self.original_cap {
            Some(cap) => (self.level as i64) < cap + self.cap_offset,
            None => true,
        }
    }

    /// The level has reached the baseline cap; theory hooks use this to
    /// decide that one more level is worth testing in a fork.
    pub fn coasting_cap_reached(&self) -> bool {
        matches!(self.original_cap, Some(cap) if self.level as i64 >= cap)
    }

    pub fn above_original_cap(&self) -> bool {
        matches!(self.original_cap, Some(cap) if self.level as i64 > cap)
    }

    /// Label fragment appended to the strategy column when a coast cap was
    /// in play, e.g. `" q1=42"`.
    pub fn cap_note(&self, last_level: u32) -> String {
        format!(" {}={}", self.name, last_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    // ── Cost curves ────────────────────────────────────────────────

    #[test]
    fn exponential_cost_is_geometric() {
        let c = CostModel::exponential(5.0, 2.0);
        assert!((c.cost(0) - 5f64.log10()).abs() < EPS);
        assert!((c.cost(3) - 40f64.log10()).abs() < EPS);
    }

    #[test]
    fn first_free_shifts_curve() {
        let c = CostModel::first_free(CostModel::exponential(10.0, 2.0));
        assert_eq!(c.cost(0), f64::NEG_INFINITY);
        assert!((c.cost(1) - 1.0).abs() < EPS); // 10
        assert!((c.cost(2) - 20f64.log10()).abs() < EPS);
    }

    #[test]
    fn stepwise_cost_repeats_within_step() {
        let c = CostModel::stepwise(CostModel::exponential(10.0, 10.0), 3);
        assert_eq!(c.cost(0), c.cost(2));
        assert!((c.cost(3) - c.cost(0) - 1.0).abs() < EPS);
    }

    #[test]
    fn table_cost_saturates() {
        let c = CostModel::Table(vec![15.0, 45.0, 360.0]);
        assert_eq!(c.cost(1), 45.0);
        assert_eq!(c.cost(99), 360.0);
    }

    /// Cumulative cost over a range equals the log-space sum of the levels.
    #[test]
    fn cumulative_matches_fold() {
        let c = CostModel::exponential(2.0, 2.0);
        // 2 + 4 + 8 = 14
        assert!((c.cumulative(0, 3) - 14f64.log10()).abs() < EPS);
        assert_eq!(c.cumulative(5, 5), f64::NEG_INFINITY);
    }

    // ── Value curves ───────────────────────────────────────────────

    /// Incremental `next` must track the closed-form `value_at` over a long
    /// run of purchases, for each curve family.
    #[test]
    fn incremental_value_matches_closed_form() {
        for model in [
            ValueModel::exponential(2.0),
            ValueModel::stepwise_default(),
            ValueModel::stepwise(2.0, 10, 1.0),
            ValueModel::linear(3.0, 1.0),
        ] {
            let mut value = model.value_at(0);
            for level in 0..60 {
                value = model.next(value, level);
                let from_zero = model.value_at(level + 1);
                assert!(
                    (value - from_zero).abs() < 1e-6,
                    "{model:?} diverged at level {level}: {value} vs {from_zero}"
                );
            }
        }
    }

    /// Stepwise sum with default parameters: first ten levels contribute 1
    /// each, the next ten contribute 2 each.
    #[test]
    fn stepwise_default_plateau() {
        let m = ValueModel::stepwise_default();
        assert!((m.value_at(10) - 1.0).abs() < EPS); // 10 * 1 = 10
        assert!((m.value_at(15) - 20f64.log10()).abs() < EPS); // 10 + 5*2
    }

    // ── Variable ───────────────────────────────────────────────────

    #[test]
    fn buy_advances_level_cost_and_value() {
        let mut v = Variable::new(
            "q1",
            CostModel::exponential(10.0, 2.0),
            ValueModel::exponential(2.0),
        );
        assert_eq!(v.level, 0);
        v.buy();
        v.buy();
        assert_eq!(v.level, 2);
        assert!((v.cost - 40f64.log10()).abs() < EPS);
        assert!((v.value - 4f64.log10()).abs() < EPS);
    }

    #[test]
    fn soft_cap_blocks_purchases_past_offset() {
        let mut v = Variable::new(
            "q1",
            CostModel::exponential(10.0, 2.0),
            ValueModel::exponential(2.0),
        );
        v.set_original_cap(2);
        v.configure_cap(1);
        assert!(v.should_buy());
        v.buy();
        v.buy();
        assert!(v.coasting_cap_reached());
        assert!(!v.above_original_cap());
        assert!(v.should_buy()); // one extra level allowed
        v.buy();
        assert!(v.above_original_cap());
        assert!(!v.should_buy());
    }

    #[test]
    fn stop_buying_is_permanent() {
        let mut v = Variable::new(
            "c3",
            CostModel::exponential(10.0, 2.0),
            ValueModel::exponential(10.0),
        );
        v.stop_buying();
        assert!(!v.should_buy());
    }
}
