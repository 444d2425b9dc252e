//! Simulation outcomes: the per-run `SimResult` row, the purchase records
//! that back the variable table, and the tie-aware best-result fold used by
//! both the fork search and the strategy comparison.

use serde::Serialize;

use crate::theory::TheoryId;

/// One recorded variable purchase near the publication point.
#[derive(Debug, Clone, Serialize)]
pub struct VarBuy {
    pub variable: &'static str,
    /// Level reached by this purchase.
    pub level: u32,
    /// Cost paid, as log10.
    pub cost: f64,
    pub symbol: &'static str,
    /// Sim time of the purchase, in seconds.
    pub timestamp: f64,
}

/// Outcome of one simulated publication cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SimResult {
    pub theory: TheoryId,
    pub sigma: u32,
    /// Starting rho, as log10.
    pub last_pub: f64,
    /// Recommended publication rho, as log10.
    pub pub_rho: f64,
    /// Tau gained by publishing at `pub_rho`.
    pub delta_tau: f64,
    /// Publication multiplier ratio (linear, not log).
    pub pub_multi: f64,
    pub strat: String,
    /// Peak tau/hour, the quantity every comparison maximizes.
    pub tau_h: f64,
    /// Time to the publication point net of recovery, in seconds.
    pub time: f64,
    pub bought_vars: Vec<VarBuy>,
}

impl SimResult {
    /// Neutral sentinel that loses to any real result with positive rate.
    /// Used to seed best-result folds.
    pub fn placeholder(theory: TheoryId) -> Self {
        SimResult {
            theory,
            sigma: 0,
            last_pub: 0.0,
            pub_rho: 0.0,
            delta_tau: 0.0,
            pub_multi: 0.0,
            strat: "none".to_string(),
            tau_h: 0.0,
            time: 0.0,
            bought_vars: Vec::new(),
        }
    }
}

/// Pick the result with the higher peak rate; `a` wins ties. Callers order
/// the arguments so that earlier (or more direct) candidates take
/// precedence, keeping folds deterministic.
pub fn best_result(a: SimResult, b: SimResult) -> SimResult {
    if a.tau_h >= b.tau_h {
        a
    } else {
        b
    }
}

/// Final level reached by the named variable in a purchase record, or 0 if
/// it was never bought.
pub fn last_level(name: &str, bought: &[VarBuy]) -> u32 {
    bought
        .iter()
        .filter(|b| b.variable == name)
        .map(|b| b.level)
        .max()
        .unwrap_or(0)
}
