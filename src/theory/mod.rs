//! # Theory — Publication Models
//!
//! One module per theory. Each implements [`TheoryModel`] for its growth
//! math, exposes its strategy catalog, and wraps construction behind a
//! `run` function that handles multi-pass strategies (coasting baselines,
//! target-seeded re-runs).
//!
//! [`TheoryModel`]: crate::engine::TheoryModel

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::engine::TheoryData;
use crate::progress::RunContext;
use crate::result::SimResult;

pub mod t1;
pub mod t2;
pub mod t5;
pub mod t6;

/// Shorthand used throughout the theory formulas.
#[inline]
pub(crate) fn l10(x: f64) -> f64 {
    x.log10()
}

/// Supported theories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum TheoryId {
    T1,
    T2,
    T5,
    T6,
}

impl TheoryId {
    pub const ALL: [TheoryId; 4] = [TheoryId::T1, TheoryId::T2, TheoryId::T5, TheoryId::T6];

    /// Tau gained per unit of log10 rho above the previous publication.
    pub fn tau_factor(self) -> f64 {
        0.1
    }
}

impl fmt::Display for TheoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TheoryId::T1 => "T1",
            TheoryId::T2 => "T2",
            TheoryId::T5 => "T5",
            TheoryId::T6 => "T6",
        };
        f.write_str(name)
    }
}

impl FromStr for TheoryId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "T1" => Ok(TheoryId::T1),
            "T2" => Ok(TheoryId::T2),
            "T5" => Ok(TheoryId::T5),
            "T6" => Ok(TheoryId::T6),
            _ => bail!("unknown theory {s:?}; supported: T1, T2, T5, T6"),
        }
    }
}

/// Students-per-sigma multiplier (log10). Each research level past the
/// unlock thresholds raises the exponent by one.
pub fn r9_multiplier(sigma: u32) -> f64 {
    let exp = match sigma {
        0..=64 => 0,
        65..=74 => 1,
        75..=84 => 2,
        _ => 3,
    };
    (sigma as f64 / 20.0).powi(exp).log10()
}

/// Run one simulation of the named theory with the given strategy.
pub fn run_theory(data: &TheoryData, ctx: &RunContext) -> Result<SimResult> {
    match data.theory {
        TheoryId::T1 => t1::run(data, ctx),
        TheoryId::T2 => t2::run(data, ctx),
        TheoryId::T5 => t5::run(data, ctx),
        TheoryId::T6 => t6::run(data, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theory_ids_round_trip() {
        for id in TheoryId::ALL {
            assert_eq!(id.to_string().parse::<TheoryId>().unwrap(), id);
        }
        assert!("T9".parse::<TheoryId>().is_err());
    }

    #[test]
    fn r9_thresholds() {
        assert_eq!(r9_multiplier(0), 0.0);
        assert_eq!(r9_multiplier(64), 0.0);
        let m65 = r9_multiplier(65);
        assert!((m65 - (65.0f64 / 20.0).log10()).abs() < 1e-12);
        let m80 = r9_multiplier(80);
        assert!((m80 - 2.0 * (80.0f64 / 20.0).log10()).abs() < 1e-12);
        let m90 = r9_multiplier(90);
        assert!((m90 - 3.0 * (90.0f64 / 20.0).log10()).abs() < 1e-12);
    }
}
